//! `${path.to.field}` references between configuration values.
//!
//! A rule can point at a shared location instead of repeating it:
//!
//! ```toml
//! [paths]
//! src = "/app/src"
//!
//! [[module.rules]]
//! test = "\\.js$"
//! include = "${paths.src}"
//! ```
//!
//! `$${...}` produces a literal `${...}`. A `$` not followed by `{` or `$`
//! is kept as-is, so regular expressions ending in `$` need no escaping.
//!
//! The `options` of each `plugins` descriptor are passed through untouched:
//! they carry plugin data such as define expressions, where `${...}` is
//! JavaScript template syntax.

use std::collections::HashMap;

use super::ConfigError;
use toml::{Table, Value};

/// Replaces every reference in `table` with the value it points at.
///
/// References are looked up in the tree as it was before resolution started,
/// and a referenced string is itself resolved first.
pub fn resolve_references(table: &mut Table) -> Result<(), ConfigError> {
    let snapshot = table.clone();
    let mut resolver = Resolver {
        root: &snapshot,
        resolved: HashMap::new(),
        in_progress: Vec::new(),
    };

    for (key, value) in table.iter_mut() {
        match value {
            Value::Array(plugins) if key == PLUGINS_KEY => {
                for plugin in plugins.iter_mut() {
                    resolver.walk_plugin(plugin)?;
                }
            }
            _ => resolver.walk(value)?,
        }
    }
    Ok(())
}

const PLUGINS_KEY: &str = "plugins";
const PLUGIN_OPTIONS_KEY: &str = "options";

enum Piece<'t> {
    Text(&'t str),
    Reference(&'t str),
}

struct Resolver<'a> {
    root: &'a Table,
    resolved: HashMap<String, String>,
    in_progress: Vec<String>,
}

impl Resolver<'_> {
    fn walk_plugin(&mut self, plugin: &mut Value) -> Result<(), ConfigError> {
        match plugin {
            Value::Table(descriptor) => {
                for (key, value) in descriptor.iter_mut() {
                    if key != PLUGIN_OPTIONS_KEY {
                        self.walk(value)?;
                    }
                }
                Ok(())
            }
            other => self.walk(other),
        }
    }

    fn walk_table(&mut self, table: &mut Table) -> Result<(), ConfigError> {
        for (_, value) in table.iter_mut() {
            self.walk(value)?;
        }
        Ok(())
    }

    fn walk(&mut self, value: &mut Value) -> Result<(), ConfigError> {
        match value {
            Value::String(s) => {
                let expanded = self.expand(s)?;
                *s = expanded;
                Ok(())
            }
            Value::Table(t) => self.walk_table(t),
            Value::Array(items) => items.iter_mut().try_for_each(|item| self.walk(item)),
            _ => Ok(()),
        }
    }

    fn expand(&mut self, text: &str) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(text.len());
        for piece in split_pieces(text)? {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Reference(path) => out.push_str(&self.lookup(path)?),
            }
        }
        Ok(out)
    }

    fn lookup(&mut self, path: &str) -> Result<String, ConfigError> {
        if let Some(done) = self.resolved.get(path) {
            return Ok(done.clone());
        }
        if self.in_progress.iter().any(|p| p == path) {
            return Err(ConfigError::CircularReference(path.to_string()));
        }

        let root = self.root;
        let text = match find(root, path)? {
            Value::String(s) => {
                self.in_progress.push(path.to_string());
                let expanded = self.expand(s);
                self.in_progress.pop();
                expanded?
            }
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Datetime(dt) => dt.to_string(),
            Value::Array(_) | Value::Table(_) => {
                return Err(ConfigError::NonScalarReference(path.to_string()))
            }
        };

        self.resolved.insert(path.to_string(), text.clone());
        Ok(text)
    }
}

fn split_pieces(text: &str) -> Result<Vec<Piece<'_>>, ConfigError> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(at) = rest.find('$') {
        let (before, tail) = rest.split_at(at);
        if !before.is_empty() {
            pieces.push(Piece::Text(before));
        }

        if let Some(after) = tail.strip_prefix("$$") {
            pieces.push(Piece::Text("$"));
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let end = after.find('}').ok_or(ConfigError::UnclosedReference)?;
            pieces.push(Piece::Reference(&after[..end]));
            rest = &after[end + 1..];
        } else {
            pieces.push(Piece::Text("$"));
            rest = &tail[1..];
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

fn find<'t>(root: &'t Table, path: &str) -> Result<&'t Value, ConfigError> {
    let mut parts = path.split('.');
    if path.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidReferencePath(path.to_string()));
    }

    let not_found = || ConfigError::ReferenceNotFound(path.to_string());
    let first = parts.next().ok_or_else(not_found)?;
    let mut current = root.get(first).ok_or_else(not_found)?;
    for part in parts {
        current = current
            .as_table()
            .and_then(|t| t.get(part))
            .ok_or_else(not_found)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(toml_str: &str) -> Result<Table, ConfigError> {
        let mut table: Table = toml::from_str(toml_str).unwrap();
        resolve_references(&mut table)?;
        Ok(table)
    }

    #[test]
    fn test_rule_include_reference() {
        let table = resolved(
            r#"
            [paths]
            src = "/app/src"

            [[module.rules]]
            test = "\\.js$"
            include = "${paths.src}"
            "#,
        )
        .unwrap();
        let rule = &table["module"]["rules"][0];
        assert_eq!(rule["include"].as_str(), Some("/app/src"));
        assert_eq!(rule["test"].as_str(), Some("\\.js$"));
    }

    #[test]
    fn test_chained_and_numeric_references() {
        let table = resolved(
            r#"
            root = "/app"
            dist = "${root}/dist"
            [devServer]
            port = 8080
            public = "http://localhost:${devServer.port}${dist}"
            "#,
        )
        .unwrap();
        assert_eq!(
            table["devServer"]["public"].as_str(),
            Some("http://localhost:8080/app/dist")
        );
    }

    #[test]
    fn test_escape_stays_literal_through_references() {
        let table = resolved(
            r#"
            template = "$${name}.js"
            copy = "${template}"
            "#,
        )
        .unwrap();
        assert_eq!(table["template"].as_str(), Some("${name}.js"));
        assert_eq!(table["copy"].as_str(), Some("${name}.js"));
    }

    #[test]
    fn test_circular_reference() {
        let result = resolved(
            r#"
            a = "${b}"
            b = "${a}"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::CircularReference(_))));
    }

    #[test]
    fn test_missing_reference() {
        let result = resolved(r#"include = "${paths.src}""#);
        assert!(matches!(result, Err(ConfigError::ReferenceNotFound(p)) if p == "paths.src"));
    }

    #[test]
    fn test_invalid_and_unclosed_references() {
        assert!(matches!(
            resolved(r#"a = "${paths..src}""#),
            Err(ConfigError::InvalidReferencePath(_))
        ));
        assert!(matches!(
            resolved(r#"a = "${paths.src""#),
            Err(ConfigError::UnclosedReference)
        ));
    }

    #[test]
    fn test_plugin_options_are_left_verbatim() {
        let table = resolved(
            r#"
            mode = "development"
            label = "${mode}"

            [[plugins]]
            name = "${mode}Plugin"
            options = { BANNER = "`v${VERSION}`", MODE = "${mode}" }

            [[plugins]]
            name = "Other"
            "#,
        )
        .unwrap();

        assert_eq!(table["label"].as_str(), Some("development"));
        let plugins = table["plugins"].as_array().unwrap();
        assert_eq!(plugins[0]["name"].as_str(), Some("developmentPlugin"));
        assert_eq!(
            plugins[0]["options"]["BANNER"].as_str(),
            Some("`v${VERSION}`")
        );
        assert_eq!(plugins[0]["options"]["MODE"].as_str(), Some("${mode}"));
    }

    #[test]
    fn test_non_scalar_reference() {
        let result = resolved(
            r#"
            plugins = ["A"]
            name = "${plugins}"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::NonScalarReference(_))));
    }
}
