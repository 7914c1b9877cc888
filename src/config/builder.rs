use std::path::Path;

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use super::env::EnvSource;
use super::file::FileSource;
use super::merge::merge_at_path;
use super::resolve::resolve_references;
use super::source::{ConfigSource, TableSource};
use super::ConfigError;
use crate::profile::DevProfile;

/// Builder that composes a bundler configuration from layered sources.
///
/// Sources are merged in registration order, later ones on top. Tables merge
/// key by key, arrays such as `plugins` and `module.rules` are concatenated,
/// and any other value is replaced by the later source.
///
/// ## Variable References
///
/// After merging, string values can reference other values with
/// `${path.to.field}`; see [`resolve_references`]. Resolution can be turned
/// off with [`resolve_references(false)`](Self::resolve_references).
///
/// ## Example
///
/// ```no_run
/// use bundle_compose::{Composer, DevProfile};
///
/// let config = Composer::builder()
///     .with_file("webpack.common.toml", true)
///     .with_profile(DevProfile::new("/app/src"))
///     .with_env("BUNDLE", "__")
///     .build()?;
///
/// assert_eq!(config["mode"].as_str(), Some("development"));
/// # Ok::<(), bundle_compose::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Composer {
    sources: Vec<Box<dyn ConfigSource>>,
    resolve: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            resolve: true,
        }
    }
}

impl Composer {
    /// Creates a new composer with no sources.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds an in-memory base configuration.
    pub fn with_base(self, table: Table) -> Self {
        self.with_source(TableSource::new("base", table))
    }

    /// Adds an in-memory override layer.
    pub fn with_layer(self, table: Table) -> Self {
        self.with_source(TableSource::new("layer", table))
    }

    /// Adds a TOML file.
    ///
    /// If `required` is `true`, the build fails when the file doesn't exist.
    /// Optional files that are missing are skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds overrides from environment variables.
    ///
    /// `BUNDLE__DEVSERVER__PORT=9000` with prefix `BUNDLE` and separator `__`
    /// sets `devServer.port` to the integer `9000`. Values are coerced to
    /// boolean, integer or float where they spell one, else kept as strings.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds the development overrides.
    pub fn with_profile(self, profile: DevProfile) -> Self {
        self.with_source(profile)
    }

    /// Adds any other source.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Enables or disables `${...}` resolution after merging. On by default.
    pub fn resolve_references(mut self, enabled: bool) -> Self {
        self.resolve = enabled;
        self
    }

    /// Loads and merges every source, then resolves references.
    pub fn build(self) -> Result<Table, ConfigError> {
        let mut merged = Table::new();

        for source in &self.sources {
            let entries = source.entries()?;
            tracing::debug!(?source, entries = entries.len(), "applying configuration source");
            for entry in entries {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }

        if self.resolve {
            resolve_references(&mut merged)?;
        }

        Ok(merged)
    }

    /// Builds and deserializes the merged tree into `T`.
    pub fn build_as<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        let merged = self.build()?;
        Value::Table(merged)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }
}
