//! Configuration composition: sources, deep merge and reference resolution.

mod builder;
mod env;
mod error;
mod file;
mod json;
mod merge;
mod resolve;
mod source;

pub use builder::Composer;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use json::to_json;
pub use merge::{merge, merge_all, merge_at_path, merge_tables};
pub use resolve::resolve_references;
pub use source::{ConfigEntry, ConfigSource, TableSource};

pub(crate) use env::coerce_value;
