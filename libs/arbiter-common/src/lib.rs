pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::LanguageCatalog;
pub use config::EngineConfig;
pub use error::{ClientError, ConfigError, ValidationError};
