use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// One reusable sliding-window rate limiter, shared by every adapter and by
/// the worker's per-provider cap. Adapters compose an instance; they never
/// subclass a limiter type, per the "ad-hoc rate limiters per adapter class"
/// redesign flag.
///
/// Holds the timestamp set of starts in the last `window`; entries age out
/// implicitly on the next check. A waiting caller sleeps until the oldest
/// relevant timestamp expires, then retries. A semaphore of size 1 around
/// the wait loop gives FIFO progression to waiters instead of a thundering
/// herd all recomputing the same wakeup.
pub struct SlidingWindowLimiter {
    capacity: u32,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
    turnstile: Semaphore,
}

impl SlidingWindowLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            starts: Mutex::new(VecDeque::with_capacity(capacity as usize)),
            turnstile: Semaphore::new(1),
        }
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// Block until a start is permitted under the window cap, then record it.
    pub async fn acquire(&self) {
        let _turn = self.turnstile.acquire().await.expect("semaphore not closed");
        loop {
            let wait = {
                let mut starts = self.starts.lock().expect("lock poisoned");
                self.evict_expired(&mut starts);
                if starts.len() < self.capacity as usize {
                    starts.push_back(Instant::now());
                    None
                } else {
                    let oldest = *starts.front().expect("capacity > 0 implies non-empty");
                    Some((oldest + self.window).saturating_duration_since(Instant::now()))
                }
            };
            match wait {
                None => return,
                Some(d) if d.is_zero() => continue,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }

    pub fn status(&self) -> (u32, u32) {
        let mut starts = self.starts.lock().expect("lock poisoned");
        self.evict_expired(&mut starts);
        (self.capacity, starts.len() as u32)
    }

    fn evict_expired(&self, starts: &mut VecDeque<Instant>) {
        let now = Instant::now();
        while let Some(front) = starts.front() {
            if now.duration_since(*front) >= self.window {
                starts.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn allows_up_to_capacity_without_waiting() {
        let limiter = SlidingWindowLimiter::new(3, StdDuration::from_millis(200));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < StdDuration::from_millis(50));
        let (cap, used) = limiter.status();
        assert_eq!(cap, 3);
        assert_eq!(used, 3);
    }

    #[tokio::test]
    async fn fourth_call_waits_for_window_to_clear() {
        let limiter = Arc::new(SlidingWindowLimiter::new(1, StdDuration::from_millis(100)));
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= StdDuration::from_millis(90));
    }
}
