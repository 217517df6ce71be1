//! Forgiving deserializers for request fields that arrive in several shapes.
//!
//! Form values reach the service as whatever the browser serialized: employee
//! counts as numbers or strings, site lists as strings, arrays of strings or
//! arrays of records.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::metrics::{format_number, scalar_text};

/// Accepts a string, number or boolean and keeps it as text.
///
/// # Accepted Formats
///
/// * `"250"` → `Some("250")`
/// * `250` / `250.0` → `Some("250")`
/// * `""`, `"   "`, `null` → `None`
///
/// # Errors
///
/// Returns an error for arrays and objects.
pub fn de_option_text_forgiving<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<Value>::deserialize(deserializer)?;
    match opt {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() => Ok(Some(format_number(f))),
            _ => Err(D::Error::custom("non-finite numeric value")),
        },
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            match other {
                Value::Array(_) => "an array",
                _ => "an object",
            }
        ))),
    }
}

/// Same as [`de_option_text_forgiving`] for required text; `null` becomes `""`.
pub fn de_text_forgiving<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    de_option_text_forgiving(deserializer).map(Option::unwrap_or_default)
}

/// A list field where `null` means empty.
pub fn de_nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts a list in any of the shapes the forms produce.
///
/// # Accepted Formats
///
/// * `"HQ; Plant"` → `["HQ", "Plant"]` (split on `;` or newlines)
/// * `["HQ", "Plant"]`
/// * `[{"name": "HQ", "location": "Vienna"}]` → `["name: HQ, location: Vienna"]`
/// * `null` → `[]`
pub fn de_string_list_forgiving<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<Value>::deserialize(deserializer)?;
    let items = match opt {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s
            .split([';', '\n'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(values)) => values.iter().filter_map(item_text).collect(),
        Some(other) => item_text(&other).into_iter().collect(),
    };
    Ok(items)
}

fn item_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{}: {}", k, scalar_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "de_text_forgiving")]
        name: String,
        #[serde(default, deserialize_with = "de_option_text_forgiving")]
        employees: Option<String>,
        #[serde(default, deserialize_with = "de_string_list_forgiving")]
        sites: Vec<String>,
        #[serde(default, deserialize_with = "de_nullable_list")]
        counts: Vec<u32>,
    }

    fn form(v: Value) -> Form {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_text_accepts_numbers_and_strings() {
        assert_eq!(form(json!({"employees": 42})).employees.as_deref(), Some("42"));
        assert_eq!(form(json!({"employees": " 42 "})).employees.as_deref(), Some("42"));
        assert_eq!(form(json!({"employees": ""})).employees, None);
        assert_eq!(form(json!({"employees": null})).employees, None);
        assert_eq!(form(json!({})).employees, None);
    }

    #[test]
    fn test_required_text_accepts_null() {
        assert_eq!(form(json!({"name": null})).name, "");
        assert_eq!(form(json!({})).name, "");
        assert_eq!(form(json!({"name": " Acme "})).name, "Acme");
    }

    #[test]
    fn test_nullable_list() {
        assert!(form(json!({"counts": null})).counts.is_empty());
        assert_eq!(form(json!({"counts": [1, 2]})).counts, vec![1, 2]);
        let result: Result<Form, _> = serde_json::from_value(json!({"counts": "1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_text_rejects_structures() {
        let result: Result<Form, _> = serde_json::from_value(json!({"employees": [1, 2]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_shapes() {
        assert_eq!(form(json!({"sites": "HQ; Plant\nDepot"})).sites, vec!["HQ", "Plant", "Depot"]);
        assert_eq!(form(json!({"sites": ["HQ", null, ""]})).sites, vec!["HQ"]);
        assert_eq!(
            form(json!({"sites": [{"name": "HQ", "location": "Vienna"}]})).sites,
            vec!["name: HQ, location: Vienna"]
        );
        assert!(form(json!({})).sites.is_empty());
    }
}
