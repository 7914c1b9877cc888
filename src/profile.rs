//! The development profile: the fixed overrides applied on top of a shared
//! base configuration when bundling for local development.

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::config::{merge_tables, ConfigEntry, ConfigError, ConfigSource};
use crate::plugin::{DefinePlugin, Plugin};
use crate::rules::{development_rules, validate_rules, Rule};
use crate::Error;

pub const DEV_DEVTOOL: &str = "eval-cheap-source-map";
pub const DEV_CHUNK_FILENAME: &str = "js/[name].chunk.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    None,
    Development,
    Production,
}

/// Environment the bundle is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Web,
    Webworker,
    Node,
    ElectronMain,
    ElectronRenderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServer {
    pub inline: bool,
    pub hot: bool,
}

/// Development overrides: watch mode, cheap eval source maps, hot reload,
/// a `NODE_ENV` define and the script/typed-script/stylesheet rules.
///
/// Plugins and rules added here land after the base configuration's own.
///
/// ```
/// use bundle_compose::DevProfile;
///
/// let base: toml::Table = toml::from_str(r#"
///     entry = "./src/index.js"
///     mode = "none"
/// "#)?;
///
/// let config = DevProfile::new("/app/src").compose(base)?;
/// assert_eq!(config["mode"].as_str(), Some("development"));
/// assert_eq!(config["entry"].as_str(), Some("./src/index.js"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct DevProfile {
    target: Target,
    watch: bool,
    mode: Mode,
    devtool: String,
    chunk_filename: String,
    dev_server: DevServer,
    node_env: String,
    plugins: Vec<Box<dyn Plugin>>,
    rules: Vec<Rule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Overrides<'a> {
    target: Target,
    watch: bool,
    mode: Mode,
    devtool: &'a str,
    output: OutputNames<'a>,
    dev_server: DevServer,
    plugins: Vec<Value>,
    module: ModuleRules,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputNames<'a> {
    chunk_filename: &'a str,
}

#[derive(Serialize)]
struct ModuleRules {
    rules: Vec<Value>,
}

impl DevProfile {
    /// Creates the profile; scripts are transpiled only under `src_dir`.
    ///
    /// A relative `src_dir` is made absolute against the current directory,
    /// since the bundler only accepts absolute `include` paths. A value
    /// holding a `${...}` reference is kept as written and resolved later.
    pub fn new(src_dir: impl Into<String>) -> Self {
        Self {
            target: Target::Web,
            watch: true,
            mode: Mode::Development,
            devtool: DEV_DEVTOOL.to_string(),
            chunk_filename: DEV_CHUNK_FILENAME.to_string(),
            dev_server: DevServer {
                inline: true,
                hot: true,
            },
            node_env: "development".to_string(),
            plugins: Vec::new(),
            rules: development_rules(absolute_dir(src_dir.into())),
        }
    }

    /// Overrides the value injected as `process.env.NODE_ENV`.
    pub fn with_node_env(mut self, value: impl Into<String>) -> Self {
        self.node_env = value.into();
        self
    }

    /// Registers a plugin after the `NODE_ENV` define.
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Renders the overrides as a configuration tree.
    pub fn to_table(&self) -> Result<Table, ConfigError> {
        let define = DefinePlugin::node_env(&self.node_env);
        let plugins = std::iter::once(define.descriptor())
            .chain(self.plugins.iter().map(|p| p.descriptor()))
            .collect();

        let overrides = Overrides {
            target: self.target,
            watch: self.watch,
            mode: self.mode,
            devtool: &self.devtool,
            output: OutputNames {
                chunk_filename: &self.chunk_filename,
            },
            dev_server: self.dev_server,
            plugins,
            module: ModuleRules {
                rules: self.rules.iter().map(Rule::to_value).collect(),
            },
        };

        Ok(Table::try_from(overrides)?)
    }

    /// Merges the overrides onto `base` and checks the composed rule patterns.
    pub fn compose(&self, base: Table) -> Result<Table, Error> {
        let merged = merge_tables(base, self.to_table()?);
        let checked = validate_rules(&merged)?;
        tracing::debug!(rules = checked, "composed development configuration");
        Ok(merged)
    }
}

fn absolute_dir(dir: String) -> String {
    if dir.contains("${") {
        return dir;
    }
    match std::path::absolute(&dir) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(dir = %dir, error = %e, "cannot make source directory absolute");
            dir
        }
    }
}

impl ConfigSource for DevProfile {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(vec![ConfigEntry::root(self.to_table()?)])
    }
}
