pub mod config;
mod error;
pub mod plugin;
pub mod profile;
pub mod rules;

pub use config::{merge, merge_all, merge_at_path, merge_tables, Composer, ConfigError};
pub use error::Error;
pub use plugin::{DefinePlugin, HotModuleReplacementPlugin, Plugin};
pub use profile::{DevProfile, Mode, Target};
pub use rules::{FileClass, Rule, RuleError, RuleUse, UseEntry};
