//! JSON rendering of a composed configuration for the bundler's binding layer.

use serde_json::{Map, Number};
use toml::{Table, Value};

use super::ConfigError;

/// Converts the tree to JSON.
///
/// Datetimes become their RFC 3339 string. Non-finite floats (`nan`, `inf`)
/// have no JSON form and are rejected with the key path that holds them.
pub fn to_json(table: &Table) -> Result<serde_json::Value, ConfigError> {
    let mut path = Vec::new();
    convert_table(table, &mut path)
}

fn convert_table(table: &Table, path: &mut Vec<String>) -> Result<serde_json::Value, ConfigError> {
    let mut object = Map::with_capacity(table.len());
    for (key, value) in table {
        path.push(key.clone());
        let converted = convert(value, path)?;
        path.pop();
        object.insert(key.clone(), converted);
    }
    Ok(serde_json::Value::Object(object))
}

fn convert(value: &Value, path: &mut Vec<String>) -> Result<serde_json::Value, ConfigError> {
    Ok(match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => {
                return Err(ConfigError::NotRepresentable {
                    path: path.join("."),
                    reason: format!("float {f} has no JSON form"),
                })
            }
        },
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        Value::Array(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                converted.push(convert(item, path)?);
                path.pop();
            }
            serde_json::Value::Array(converted)
        }
        Value::Table(table) => convert_table(table, path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(toml_str: &str) -> Table {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_plain_tree() {
        let json = to_json(&table(
            r#"
            mode = "development"
            watch = true
            [devServer]
            port = 8080
            [[plugins]]
            name = "DefinePlugin"
            "#,
        ))
        .unwrap();
        assert_eq!(
            json,
            json!({
                "mode": "development",
                "watch": true,
                "devServer": { "port": 8080 },
                "plugins": [{ "name": "DefinePlugin" }]
            })
        );
    }

    #[test]
    fn test_datetime_becomes_string() {
        let json = to_json(&table("built = 2024-05-01T10:00:00Z")).unwrap();
        assert_eq!(json["built"], json!("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let result = to_json(&table(
            r#"
            [[module.rules]]
            weight = nan
            "#,
        ));
        match result {
            Err(ConfigError::NotRepresentable { path, .. }) => {
                assert_eq!(path, "module.rules.0.weight")
            }
            other => panic!("expected NotRepresentable, got {other:?}"),
        }
        assert!(to_json(&table("limit = inf")).is_err());
    }
}
