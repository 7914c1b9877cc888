use crate::config::ConfigError;
use crate::rules::RuleError;
use thiserror::Error;

/// Top-level error type for the bundle-compose library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("rule error: {0}")]
    Rule(#[from] RuleError),
}
