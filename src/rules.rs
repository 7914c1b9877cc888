//! Rule descriptors for `module.rules` and the per-extension dispatch table.
//!
//! A rule selects files with `test` (a regular expression over the resource
//! path), narrows them with an optional `include` path prefix and `exclude`
//! pattern, and names the transforms that run on them. With `use`, the
//! bundler applies the list last-to-first.

use std::path::Path;

use regex_lite::Regex;
use thiserror::Error;
use toml::{Table, Value};

use crate::config::coerce_value;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuleError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex_lite::Error,
    },

    #[error("malformed rule descriptor at module.rules[{index}]: {reason}")]
    MalformedDescriptor { index: usize, reason: String },

    #[error("module.rules must be an array, found a {found}")]
    RulesNotArray { found: &'static str },
}

/// One transform step, e.g. `css-loader` with `sourceMap = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct UseEntry {
    pub loader: String,
    pub options: Table,
}

impl UseEntry {
    pub fn new(loader: impl Into<String>) -> Self {
        Self {
            loader: loader.into(),
            options: Table::new(),
        }
    }

    /// Parses the inline form `name?key=value&flag`.
    ///
    /// Option values are coerced like environment overrides; a bare key is
    /// `true`.
    pub fn parse(inline: &str) -> Self {
        let Some((loader, query)) = inline.split_once('?') else {
            return Self::new(inline);
        };

        let mut options = Table::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) => options.insert(key.to_string(), coerce_value(value)),
                None => options.insert(pair.to_string(), Value::Boolean(true)),
            };
        }

        Self {
            loader: loader.to_string(),
            options,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// A bare loader name, or `{ loader, options }` when options are set.
    pub fn to_value(&self) -> Value {
        if self.options.is_empty() {
            return Value::String(self.loader.clone());
        }
        let mut table = Table::new();
        table.insert("loader".into(), Value::String(self.loader.clone()));
        table.insert("options".into(), Value::Table(self.options.clone()));
        Value::Table(table)
    }
}

/// The transforms a rule applies.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleUse {
    /// A single loader, written as `loader = "..."`.
    Loader(String),
    /// An ordered list, written as `use = [...]`.
    Use(Vec<UseEntry>),
}

impl RuleUse {
    pub fn chain<I, S>(loaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RuleUse::Use(loaders.into_iter().map(|s| UseEntry::parse(s.as_ref())).collect())
    }

    /// Loader names in the order they are listed.
    pub fn loaders(&self) -> Vec<&str> {
        match self {
            RuleUse::Loader(name) => vec![name.as_str()],
            RuleUse::Use(entries) => entries.iter().map(|e| e.loader.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub test: String,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub transforms: RuleUse,
}

impl Rule {
    pub fn new(test: impl Into<String>, transforms: RuleUse) -> Self {
        Self {
            test: test.into(),
            include: None,
            exclude: None,
            transforms,
        }
    }

    pub fn include(mut self, dir: impl Into<String>) -> Self {
        self.include = Some(dir.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Whether the rule applies to `path`: `test` matches, the path lies
    /// under `include` (if set), and `exclude` (if set) does not match.
    pub fn matches(&self, path: impl AsRef<Path>) -> Result<bool, RuleError> {
        let path = path.as_ref();
        let text = path.to_string_lossy();

        if !compile(&self.test)?.is_match(&text) {
            return Ok(false);
        }
        if let Some(dir) = &self.include {
            if !path.starts_with(dir) {
                return Ok(false);
            }
        }
        if let Some(pattern) = &self.exclude {
            if compile(pattern)?.is_match(&text) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn to_value(&self) -> Value {
        let mut table = Table::new();
        table.insert("test".into(), Value::String(self.test.clone()));
        if let Some(dir) = &self.include {
            table.insert("include".into(), Value::String(dir.clone()));
        }
        if let Some(pattern) = &self.exclude {
            table.insert("exclude".into(), Value::String(pattern.clone()));
        }
        match &self.transforms {
            RuleUse::Loader(name) => {
                table.insert("loader".into(), Value::String(name.clone()));
            }
            RuleUse::Use(entries) => {
                let entries = entries.iter().map(UseEntry::to_value).collect();
                table.insert("use".into(), Value::Array(entries));
            }
        }
        Value::Table(table)
    }
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// File classes with a development transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Script,
    TypedScript,
    Stylesheet,
}

impl FileClass {
    pub const ALL: [FileClass; 3] = [FileClass::Script, FileClass::TypedScript, FileClass::Stylesheet];

    pub fn pattern(self) -> &'static str {
        match self {
            FileClass::Script => r"\.js$",
            FileClass::TypedScript => r"\.ts$",
            FileClass::Stylesheet => r"(?i)\.s?[c,a]ss$",
        }
    }

    pub fn transforms(self) -> RuleUse {
        match self {
            FileClass::Script => RuleUse::Loader("babel-loader".into()),
            FileClass::TypedScript => RuleUse::chain(["ts-loader"]),
            FileClass::Stylesheet => RuleUse::chain([
                "style-loader",
                "css-loader?sourceMap=true",
                "postcss-loader",
                "sass-loader",
            ]),
        }
    }

    /// The rule for this class with no include or exclude constraint.
    pub fn rule(self) -> Rule {
        Rule::new(self.pattern(), self.transforms())
    }

    /// The first class whose pattern matches `path`.
    pub fn classify(path: impl AsRef<Path>) -> Option<FileClass> {
        let path = path.as_ref();
        FileClass::ALL
            .into_iter()
            .find(|class| class.rule().matches(path).is_ok_and(|m| m))
    }
}

/// Development rules in registration order: scripts under `src_dir`,
/// typed scripts outside `node_modules`, then stylesheets.
pub fn development_rules(src_dir: impl Into<String>) -> Vec<Rule> {
    vec![
        FileClass::Script.rule().include(src_dir),
        FileClass::TypedScript.rule().exclude("node_modules"),
        FileClass::Stylesheet.rule(),
    ]
}

/// Checks every descriptor under `module.rules`: each must be a table, and
/// `test` and `exclude`, when they are strings, must compile.
///
/// Returns the number of rules checked.
pub fn validate_rules(config: &Table) -> Result<usize, RuleError> {
    let Some(rules) = config
        .get("module")
        .and_then(Value::as_table)
        .and_then(|module| module.get("rules"))
    else {
        return Ok(0);
    };

    let Some(rules) = rules.as_array() else {
        return Err(RuleError::RulesNotArray {
            found: rules.type_str(),
        });
    };

    for (index, rule) in rules.iter().enumerate() {
        let Some(rule) = rule.as_table() else {
            return Err(RuleError::MalformedDescriptor {
                index,
                reason: format!("expected a table, found a {}", rule.type_str()),
            });
        };
        for key in ["test", "exclude"] {
            if let Some(pattern) = rule.get(key).and_then(Value::as_str) {
                compile(pattern)?;
            }
        }
    }

    Ok(rules.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(FileClass::classify("src/app.js"), Some(FileClass::Script));
        assert_eq!(FileClass::classify("src/index.ts"), Some(FileClass::TypedScript));
        assert_eq!(FileClass::classify("styles/Main.SCSS"), Some(FileClass::Stylesheet));
        assert_eq!(FileClass::classify("styles/a.css"), Some(FileClass::Stylesheet));
        assert_eq!(FileClass::classify("styles/a.sass"), Some(FileClass::Stylesheet));
        assert_eq!(FileClass::classify("src/view.tsx"), None);
        assert_eq!(FileClass::classify("src/app.json"), None);
    }

    #[test]
    fn test_stylesheet_chain_order() {
        let transforms = FileClass::Stylesheet.transforms();
        assert_eq!(
            transforms.loaders(),
            ["style-loader", "css-loader", "postcss-loader", "sass-loader"]
        );
    }

    #[test]
    fn test_parse_inline_options() {
        let entry = UseEntry::parse("css-loader?sourceMap=true&importLoaders=1&modules");
        assert_eq!(entry.loader, "css-loader");
        assert_eq!(entry.options["sourceMap"], Value::Boolean(true));
        assert_eq!(entry.options["importLoaders"], Value::Integer(1));
        assert_eq!(entry.options["modules"], Value::Boolean(true));

        assert_eq!(UseEntry::parse("sass-loader"), UseEntry::new("sass-loader"));
    }

    #[test]
    fn test_use_entry_value_shape() {
        assert_eq!(
            UseEntry::new("ts-loader").to_value(),
            Value::String("ts-loader".into())
        );
        let value = UseEntry::new("css-loader")
            .with_option("sourceMap", true)
            .to_value();
        assert_eq!(value["loader"].as_str(), Some("css-loader"));
        assert_eq!(value["options"]["sourceMap"].as_bool(), Some(true));
    }

    #[test]
    fn test_include_limits_scripts_to_source_dir() {
        let rule = FileClass::Script.rule().include("/app/src");
        assert!(rule.matches("/app/src/index.js").unwrap());
        assert!(!rule.matches("/app/node_modules/lib/index.js").unwrap());
    }

    #[test]
    fn test_exclude_skips_node_modules() {
        let rule = FileClass::TypedScript.rule().exclude("node_modules");
        assert!(rule.matches("/app/src/main.ts").unwrap());
        assert!(!rule.matches("/app/node_modules/pkg/index.ts").unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let rule = Rule::new(r"\.(js$", RuleUse::Loader("babel-loader".into()));
        assert!(matches!(
            rule.matches("a.js"),
            Err(RuleError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_development_rules_descriptors() {
        let rules: Vec<Value> = development_rules("/app/src")
            .iter()
            .map(Rule::to_value)
            .collect();

        assert_eq!(rules[0]["test"].as_str(), Some(r"\.js$"));
        assert_eq!(rules[0]["include"].as_str(), Some("/app/src"));
        assert_eq!(rules[0]["loader"].as_str(), Some("babel-loader"));
        assert!(rules[0].get("use").is_none());

        assert_eq!(rules[1]["exclude"].as_str(), Some("node_modules"));
        assert_eq!(rules[1]["use"][0].as_str(), Some("ts-loader"));

        let chain = rules[2]["use"].as_array().unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[1]["loader"].as_str(), Some("css-loader"));
        assert_eq!(chain[1]["options"]["sourceMap"].as_bool(), Some(true));
    }

    #[test]
    fn test_validate_rules() {
        let config: Table = toml::from_str(
            r#"
            [[module.rules]]
            test = "\\.png$"
            type = "asset/resource"

            [[module.rules]]
            test = "\\.js$"
            exclude = "node_modules"
            loader = "babel-loader"
            "#,
        )
        .unwrap();
        assert_eq!(validate_rules(&config).unwrap(), 2);
        assert_eq!(validate_rules(&Table::new()).unwrap(), 0);

        let broken: Table = toml::from_str(
            r#"
            [[module.rules]]
            test = "(unclosed"
            "#,
        )
        .unwrap();
        assert!(matches!(
            validate_rules(&broken),
            Err(RuleError::InvalidPattern { .. })
        ));

        let scalar: Table = toml::from_str(r#"module = { rules = ["x"] }"#).unwrap();
        assert!(matches!(
            validate_rules(&scalar),
            Err(RuleError::MalformedDescriptor { index: 0, .. })
        ));

        let not_array: Table = toml::from_str(r#"module = { rules = "x" }"#).unwrap();
        assert!(matches!(
            validate_rules(&not_array),
            Err(RuleError::RulesNotArray { found: "string" })
        ));
    }
}
