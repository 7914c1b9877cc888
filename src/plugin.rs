//! Plugin descriptors registered with the bundler.
//!
//! A plugin contributes an effect to the build. The composer never runs
//! plugins; it renders each one into a `{ name, options }` descriptor in the
//! `plugins` sequence, where order is significant.

use std::fmt;

use toml::{Table, Value};

/// The capability of contributing a plugin descriptor to the build.
pub trait Plugin: fmt::Debug + Send + Sync {
    /// Name the bundler's binding layer uses to instantiate the plugin.
    fn name(&self) -> &str;

    fn options(&self) -> Table {
        Table::new()
    }

    fn descriptor(&self) -> Value {
        let mut table = Table::new();
        table.insert("name".into(), Value::String(self.name().to_string()));
        table.insert("options".into(), Value::Table(self.options()));
        Value::Table(table)
    }
}

/// Compile-time constants substituted into bundled code.
///
/// Each value is source text: a string constant must carry its own quotes,
/// which [`define_str`](Self::define_str) adds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinePlugin {
    definitions: Table,
}

impl DefinePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `process.env.NODE_ENV` as the quoted `value`.
    pub fn node_env(value: &str) -> Self {
        Self::new().define_str("process.env.NODE_ENV", value)
    }

    /// Defines `expression` as a string literal.
    pub fn define_str(self, expression: impl Into<String>, value: &str) -> Self {
        let literal = serde_json::Value::String(value.to_string()).to_string();
        self.define_raw(expression, literal)
    }

    /// Defines `expression` as the given source text, unquoted.
    pub fn define_raw(mut self, expression: impl Into<String>, source: impl Into<String>) -> Self {
        self.definitions
            .insert(expression.into(), Value::String(source.into()));
        self
    }

    pub fn get(&self, expression: &str) -> Option<&str> {
        self.definitions.get(expression).and_then(Value::as_str)
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> &str {
        "DefinePlugin"
    }

    fn options(&self) -> Table {
        self.definitions.clone()
    }
}

/// Hot module replacement, for setups that register it explicitly instead
/// of through `devServer.hot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HotModuleReplacementPlugin;

impl Plugin for HotModuleReplacementPlugin {
    fn name(&self) -> &str {
        "HotModuleReplacementPlugin"
    }
}
