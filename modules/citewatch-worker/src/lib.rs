pub mod backoff;
pub mod cooldown;
pub mod planner;
pub mod queue;
pub mod worker;

pub use cooldown::ProviderCooldown;
pub use planner::PlannerConfig;
pub use queue::{JobQueue, PgJobQueue, QueueMessage};
pub use worker::{Worker, WorkerConfig};
