//! Metric responses as recorded by the reporting forms, plus numeric coercion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One metric definition together with the company's recorded response.
///
/// `response` carries scalar answers (text or numbers, often numbers typed as
/// strings). `response_data` carries tabular answers, usually an array of flat
/// records whose key names vary between forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub reference: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub sub_section: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub disclosure_id: Option<String>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub response_data: Option<Value>,
    /// Declared shape of `response_data`; sniffed from key names when absent
    #[serde(default)]
    pub data_kind: Option<DataKind>,
}

impl Metric {
    /// Disclosure this metric belongs to: the explicit id, else the reference prefix (`B3-...` -> `B3`).
    pub fn disclosure(&self) -> Option<String> {
        if let Some(id) = self.disclosure_id.as_deref().map(str::trim)
            && !id.is_empty()
        {
            return Some(id.to_ascii_uppercase());
        }
        let prefix: String = self
            .reference
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        let mut chars = prefix.chars();
        match chars.next() {
            Some('B') if !prefix[1..].is_empty() && prefix[1..].chars().all(|c| c.is_ascii_digit()) => {
                Some(prefix)
            }
            _ => None,
        }
    }

    pub fn belongs_to(&self, disclosure_id: &str) -> bool {
        self.disclosure()
            .is_some_and(|id| id.eq_ignore_ascii_case(disclosure_id.trim()))
    }

    /// True when either the scalar or the tabular response carries content.
    pub fn has_data(&self) -> bool {
        self.response.as_ref().is_some_and(value_has_content)
            || self.response_data.as_ref().is_some_and(value_has_content)
    }

    /// Human label, falling back through the form hierarchy to the reference.
    pub fn display_label(&self) -> &str {
        [&self.label, &self.sub_section, &self.section, &self.topic]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
            .unwrap_or(self.reference.as_str())
    }

    /// Scalar response rendered as text, if present.
    pub fn response_text(&self) -> Option<String> {
        self.response
            .as_ref()
            .filter(|v| value_has_content(v))
            .map(scalar_text)
    }

    /// Tabular records, when `response_data` is a non-empty array of objects.
    pub fn records(&self) -> Option<&[Value]> {
        match self.response_data.as_ref() {
            Some(Value::Array(rows)) if rows.iter().any(Value::is_object) => Some(rows.as_slice()),
            _ => None,
        }
    }
}

/// Whether a JSON value holds anything a reader would consider an answer.
pub fn value_has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(value_has_content),
        Value::Object(map) => map.values().any(value_has_content),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Text form of a scalar JSON value (strings unquoted, numbers tidied).
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Format a number without trailing zeros, at most two decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Declared shape of a tabular response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Energy,
    Gender,
    Sites,
    Emissions,
    Safety,
    Generic,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Energy => "energy",
            DataKind::Gender => "gender",
            DataKind::Sites => "sites",
            DataKind::Emissions => "emissions",
            DataKind::Safety => "safety",
            DataKind::Generic => "generic",
        }
    }

    /// Sniff the kind from lower-cased key names, checked in order of precedence.
    pub fn infer<'a>(keys: impl IntoIterator<Item = &'a str>) -> DataKind {
        let keys: Vec<String> = keys.into_iter().map(str::to_lowercase).collect();
        let any = |words: &[&str]| keys.iter().any(|k| words.iter().any(|w| k.contains(w)));

        if any(&["energy", "fuel", "electricity"]) {
            DataKind::Energy
        } else if any(&["gender", "sex", "male", "female"]) {
            DataKind::Gender
        } else if any(&["subsidiary", "entity", "location"]) {
            DataKind::Sites
        } else if any(&["emission", "co2", "carbon"]) {
            DataKind::Emissions
        } else if any(&["accident", "injury", "safety"]) {
            DataKind::Safety
        } else {
            DataKind::Generic
        }
    }

    /// Sniff the kind from the keys of the first record of an array.
    pub fn infer_from_value(value: &Value) -> DataKind {
        let first = match value {
            Value::Array(rows) => rows.iter().find_map(Value::as_object),
            Value::Object(map) => Some(map),
            _ => None,
        };
        match first {
            Some(map) => DataKind::infer(map.keys().map(String::as_str)),
            None => DataKind::Generic,
        }
    }
}

impl std::str::FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" => Ok(DataKind::Energy),
            "gender" => Ok(DataKind::Gender),
            "sites" => Ok(DataKind::Sites),
            "emissions" => Ok(DataKind::Emissions),
            "safety" => Ok(DataKind::Safety),
            "generic" => Ok(DataKind::Generic),
            other => Err(format!("unknown data kind '{}'", other)),
        }
    }
}

/// First figure in a cell. Digit groups separated by single spaces ("1 200")
/// are one number.
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d{1,3}(?:[ \x{202F}]\d{3}\b)+(?:\.\d+)?|-?\d+(?:\.\d+)?")
        .expect("number regex should compile")
});

/// Outcome of reading a reported figure.
///
/// Keeps "nothing was reported" apart from "something was reported but it is
/// not a number", so callers never mistake either for a genuine zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Quantity {
    Value(f64),
    Missing,
    Unparseable(String),
}

impl Quantity {
    pub fn parse(value: &Value) -> Quantity {
        match value {
            Value::Null => Quantity::Missing,
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Quantity::Value(v),
                _ => Quantity::Unparseable(n.to_string()),
            },
            Value::String(s) => Quantity::parse_str(s),
            other => Quantity::Unparseable(other.to_string()),
        }
    }

    /// Strip thousands separators and units, then read the first numeric token.
    pub fn parse_str(raw: &str) -> Quantity {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Quantity::Missing;
        }
        let cleaned: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ',' | '\'' | '_' | '\u{a0}'))
            .collect();
        match NUMBER_TOKEN
            .find(&cleaned)
            .and_then(|m| {
                m.as_str()
                    .replace([' ', '\u{202f}'], "")
                    .parse::<f64>()
                    .ok()
            })
        {
            Some(v) if v.is_finite() => Quantity::Value(v),
            _ => Quantity::Unparseable(trimmed.to_string()),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Quantity::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Arithmetic view: anything that is not a number counts as zero.
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, Quantity::Unparseable(_))
    }
}
