use toml::{Table, Value};

use super::ConfigError;

/// A value to merge into the configuration tree at `path` (empty for the root).
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// One layer of configuration in a [`Composer`](super::Composer).
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// An in-memory configuration tree, such as a base config built in code.
#[derive(Debug, Clone)]
pub struct TableSource {
    label: String,
    table: Table,
}

impl TableSource {
    pub fn new(label: impl Into<String>, table: Table) -> Self {
        Self {
            label: label.into(),
            table,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ConfigSource for TableSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(vec![ConfigEntry::root(self.table.clone())])
    }
}
