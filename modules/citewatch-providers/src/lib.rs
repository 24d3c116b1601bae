pub mod extract;
pub mod providers;
pub mod rate_limit;
pub mod registry;
pub mod traits;
pub mod transport;
pub mod types;

pub use rate_limit::SlidingWindowLimiter;
pub use registry::AdapterRegistry;
pub use traits::ProviderAdapter;
pub use types::{Locale, ProviderAnswer, QueryOptions, RateLimitStatus, RawCitation, RecencyFilter};
