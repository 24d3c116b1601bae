pub mod config;
pub mod domain;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult, ProviderError, ProviderErrorKind};
pub use types::*;
