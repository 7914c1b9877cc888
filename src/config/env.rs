use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Overrides taken from environment variables named `PREFIX<sep>A<sep>B`.
///
/// The remainder after the prefix is split on the separator and lowercased
/// into the key path `a.b`. Variables are applied in name order.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
        }
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator(self.prefix.clone()));
        }

        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut vars: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(key, value)| {
                let key = key.into_string().ok()?;
                if !key.starts_with(&prefix_with_sep) {
                    return None;
                }
                match value.into_string() {
                    Ok(value) => Some((key, value)),
                    Err(_) => {
                        tracing::warn!(variable = %key, "ignoring environment override with a non-UTF-8 value");
                        None
                    }
                }
            })
            .collect();
        vars.sort();

        let mut entries = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            let path_str = &key[prefix_with_sep.len()..];
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(str::to_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                tracing::warn!(variable = %key, "ignoring environment override with an empty path segment");
                continue;
            }

            entries.push(ConfigEntry::at_path(path, coerce_value(&value)));
        }

        Ok(entries)
    }
}

/// Interprets a raw string as the most specific scalar it spells:
/// boolean, integer, float (only with a decimal point), else string.
pub(crate) fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
