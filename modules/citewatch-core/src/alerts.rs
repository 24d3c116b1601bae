//! Alert Engine (C7): per-citation diff rules. `diff_citations` is invoked
//! with the most recent prior citation for a `(project, keyword, platform)`
//! triple (possibly absent) and the citation just persisted; it returns
//! every applicable alert rather than collapsing to one, since `new_citation`
//! and `lost_citation` are mutually exclusive with the "both mentioned"
//! rules but `position_change` and `sentiment_shift` can transition in the
//! same step and each is its own transition class per §8.
//!
//! The three batch-derived alert types (`competitor_gain`, `new_platform`,
//! `volume_spike`) are not diff rules and live in `scoring` instead, since
//! they compare across citations rather than a single prior/current pair.

use chrono::Utc;
use citewatch_common::{Alert, AlertSeverity, AlertType, Citation, Provider};
use uuid::Uuid;

pub fn diff_citations(
    project_id: Uuid,
    keyword_id: Uuid,
    platform: Provider,
    previous: Option<&Citation>,
    current: &Citation,
) -> Vec<Alert> {
    let now = Utc::now();

    let base = |alert_type: AlertType, severity: AlertSeverity, title: String, description: String| Alert {
        id: Uuid::new_v4(),
        project_id,
        alert_type,
        severity,
        title,
        description,
        keyword_id: Some(keyword_id),
        platform: Some(platform),
        previous_value: None,
        current_value: None,
        change_percent: None,
        is_read: false,
        created_at: now,
    };

    let Some(prev) = previous else {
        return if current.domain_mentioned {
            vec![Alert {
                current_value: current.citation_position.map(|p| p.to_string()),
                ..base(
                    AlertType::NewCitation,
                    AlertSeverity::Info,
                    format!("New citation on {platform}"),
                    "Your domain now appears in this provider's answer for this keyword.".to_string(),
                )
            }]
        } else {
            Vec::new()
        };
    };

    if prev.domain_mentioned && !current.domain_mentioned {
        return vec![Alert {
            previous_value: prev.citation_position.map(|p| p.to_string()),
            ..base(
                AlertType::LostCitation,
                AlertSeverity::Warning,
                format!("Citation lost on {platform}"),
                "Your domain no longer appears in this provider's answer for this keyword.".to_string(),
            )
        }];
    }

    let mut alerts = Vec::new();

    if prev.domain_mentioned && current.domain_mentioned {
        if let (Some(prev_pos), Some(curr_pos)) = (prev.citation_position, current.citation_position) {
            let delta = (prev_pos as i64 - curr_pos as i64).abs();
            if delta >= 2 {
                let improved = curr_pos < prev_pos;
                let change_percent = (prev_pos as f64 - curr_pos as f64) / prev_pos as f64 * 100.0;
                alerts.push(Alert {
                    previous_value: Some(prev_pos.to_string()),
                    current_value: Some(curr_pos.to_string()),
                    change_percent: Some(round_2(change_percent)),
                    ..base(
                        AlertType::PositionChange,
                        if improved { AlertSeverity::Info } else { AlertSeverity::Warning },
                        format!("Position {} on {platform}", if improved { "improved" } else { "worsened" }),
                        format!("Position moved from {prev_pos} to {curr_pos}."),
                    )
                });
            }
        }
    }

    if prev.sentiment != current.sentiment && current.domain_mentioned {
        let severity = if matches!(current.sentiment, citewatch_common::Sentiment::Negative) {
            AlertSeverity::Warning
        } else {
            AlertSeverity::Info
        };
        alerts.push(Alert {
            previous_value: Some(format!("{:?}", prev.sentiment)),
            current_value: Some(format!("{:?}", current.sentiment)),
            ..base(
                AlertType::SentimentShift,
                severity,
                format!("Sentiment shift on {platform}"),
                format!("Sentiment changed from {:?} to {:?}.", prev.sentiment, current.sentiment),
            )
        });
    }

    alerts
}

fn round_2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use citewatch_common::Sentiment;
    use uuid::Uuid;

    fn citation(domain_mentioned: bool, position: Option<u32>, sentiment: Sentiment) -> Citation {
        Citation {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            keyword_id: Uuid::new_v4(),
            platform: Provider::Gemini,
            tracked_at: Utc::now(),
            domain_mentioned,
            citation_position: position,
            citation_context: None,
            full_response_text: String::new(),
            response_summary: String::new(),
            sentiment,
            confidence_score: 0.5,
            word_count: 0,
            competitor_citations: Vec::new(),
            total_sources_cited: 0,
            raw_citations_json: serde_json::Value::Null,
        }
    }

    #[test]
    fn new_citation_alert_fires_on_first_mention() {
        let current = citation(true, Some(2), Sentiment::Positive);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, None, &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::NewCitation);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
    }

    #[test]
    fn lost_citation_alert_carries_previous_position() {
        let prev = citation(true, Some(1), Sentiment::Neutral);
        let current = citation(false, None, Sentiment::Neutral);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, Some(&prev), &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LostCitation);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].previous_value, Some("1".to_string()));
    }

    #[test]
    fn position_jump_of_three_is_info_with_exact_change_percent() {
        let prev = citation(true, Some(5), Sentiment::Neutral);
        let current = citation(true, Some(2), Sentiment::Neutral);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, Some(&prev), &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::PositionChange);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
        assert_eq!(alerts[0].change_percent, Some(60.0));
    }

    #[test]
    fn sub_threshold_position_drift_is_silent() {
        let prev = citation(true, Some(2), Sentiment::Neutral);
        let current = citation(true, Some(3), Sentiment::Neutral);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, Some(&prev), &current);
        assert!(alerts.is_empty());
    }

    #[test]
    fn sentiment_shift_to_negative_is_warning() {
        let prev = citation(true, Some(1), Sentiment::Neutral);
        let current = citation(true, Some(1), Sentiment::Negative);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, Some(&prev), &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::SentimentShift);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn position_change_and_sentiment_shift_both_fire_in_the_same_step() {
        let prev = citation(true, Some(5), Sentiment::Neutral);
        let current = citation(true, Some(1), Sentiment::Positive);
        let alerts = diff_citations(Uuid::new_v4(), Uuid::new_v4(), Provider::Gemini, Some(&prev), &current);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().any(|a| a.alert_type == AlertType::PositionChange));
        assert!(alerts.iter().any(|a| a.alert_type == AlertType::SentimentShift));
    }
}
