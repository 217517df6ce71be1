//! Column lookup over loosely keyed records.

use serde_json::{Map, Value};

use crate::metrics::{Quantity, scalar_text, value_has_content};

pub type Record = Map<String, Value>;

const LABEL_NEEDLES: &[&str] = &["type", "source", "carrier", "category", "fuel", "energy", "name"];
const AMOUNT_NEEDLES: &[&str] = &["consumption", "amount", "quantity", "value", "total", "usage"];

/// First key whose lower-cased name contains one of `needles`, skipping `exclude`.
///
/// Needles are tried in order, so earlier needles take priority over later ones.
pub fn find_key<'a>(record: &'a Record, needles: &[&str], exclude: &[&str]) -> Option<&'a str> {
    for needle in needles {
        let hit = record.keys().find(|k| {
            !exclude.iter().any(|e| e.eq_ignore_ascii_case(k)) && k.to_lowercase().contains(needle)
        });
        if let Some(k) = hit {
            return Some(k.as_str());
        }
    }
    None
}

/// Value under the first key matching `needles`.
pub fn find_value<'a>(record: &'a Record, needles: &[&str], exclude: &[&str]) -> Option<&'a Value> {
    find_key(record, needles, exclude).and_then(|k| record.get(k))
}

/// Unit written in a column header, e.g. `"Consumption (MWh)"` -> `MWh`.
pub fn unit_from_key(key: &str) -> Option<String> {
    let open = key.rfind('(')?;
    let close = key[open..].find(')')? + open;
    let unit = key[open + 1..close].trim();
    (!unit.is_empty()).then(|| unit.to_string())
}

/// Rows labelled literally "Total" are aggregates and never count as data rows.
pub fn is_total_label(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case("total")
}

pub fn objects(rows: &[Value]) -> impl Iterator<Item = &Record> {
    rows.iter().filter_map(Value::as_object)
}

/// First key matching `needles` whose value is text rather than a figure.
pub fn text_key<'a>(record: &'a Record, needles: &[&str], exclude: &[&str]) -> Option<&'a str> {
    for needle in needles {
        let hit = record.iter().find(|(k, v)| {
            !exclude.iter().any(|e| e.eq_ignore_ascii_case(k))
                && k.to_lowercase().contains(needle)
                && is_text(v)
        });
        if let Some((k, _)) = hit {
            return Some(k.as_str());
        }
    }
    None
}

/// First key matching `needles` whose value reads as a number.
pub fn numeric_key<'a>(record: &'a Record, needles: &[&str], exclude: &[&str]) -> Option<&'a str> {
    for needle in needles {
        let hit = record.iter().find(|(k, v)| {
            !exclude.iter().any(|e| e.eq_ignore_ascii_case(k))
                && k.to_lowercase().contains(needle)
                && is_figure(v)
        });
        if let Some((k, _)) = hit {
            return Some(k.as_str());
        }
    }
    None
}

/// A number, or a string that starts like one ("1,200 MWh" but not "Scope 1").
pub fn is_figure(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => {
            let t = s.trim().trim_start_matches(['-', '+']);
            t.starts_with(|c: char| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn is_text(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.trim().is_empty()) && !is_figure(value)
}

/// Non-empty `key: value` pairs of a record.
pub fn pairs(record: &Record) -> Vec<String> {
    record
        .iter()
        .filter(|(_, v)| value_has_content(v))
        .map(|(k, v)| format!("{}: {}", k.trim(), scalar_text(v)))
        .collect()
}

/// One row of an energy consumption table.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRow {
    pub label: String,
    pub renewable: Option<Quantity>,
    pub non_renewable: Option<Quantity>,
    pub amount: Option<Quantity>,
    pub unit: Option<String>,
}

impl EnergyRow {
    pub fn from_record(record: &Record) -> EnergyRow {
        let mut renewable_key = None;
        let mut non_renewable_key = None;
        for key in record.keys() {
            let lower = key.to_lowercase();
            if !lower.contains("renewable") {
                continue;
            }
            if lower.contains("non") {
                non_renewable_key.get_or_insert(key.as_str());
            } else {
                renewable_key.get_or_insert(key.as_str());
            }
        }
        let unit_key = find_key(record, &["unit"], &[]);

        let mut skip: Vec<&str> = [renewable_key, non_renewable_key, unit_key]
            .into_iter()
            .flatten()
            .collect();
        let label_key = text_key(record, LABEL_NEEDLES, &skip).or_else(|| {
            record
                .iter()
                .find(|(k, v)| !skip.contains(&k.as_str()) && is_text(v))
                .map(|(k, _)| k.as_str())
        });
        skip.extend(label_key);
        let amount_key = find_key(record, AMOUNT_NEEDLES, &skip);

        let unit = unit_key
            .and_then(|k| record.get(k))
            .filter(|v| value_has_content(v))
            .map(scalar_text)
            .or_else(|| {
                [amount_key, renewable_key, non_renewable_key]
                    .into_iter()
                    .flatten()
                    .find_map(unit_from_key)
            });

        let quantity = |key: Option<&str>| key.and_then(|k| record.get(k)).map(Quantity::parse);
        EnergyRow {
            label: label_key
                .and_then(|k| record.get(k))
                .map(scalar_text)
                .unwrap_or_default(),
            renewable: quantity(renewable_key),
            non_renewable: quantity(non_renewable_key),
            amount: quantity(amount_key),
            unit,
        }
    }

    /// Whether the row states a renewable / non-renewable split.
    pub fn has_split(&self) -> bool {
        self.renewable.is_some() || self.non_renewable.is_some()
    }

    pub fn renewable_value(&self) -> f64 {
        self.renewable.as_ref().map(Quantity::or_zero).unwrap_or(0.0)
    }

    pub fn non_renewable_value(&self) -> f64 {
        self.non_renewable.as_ref().map(Quantity::or_zero).unwrap_or(0.0)
    }

    /// Renewable plus non-renewable when split, otherwise the stated amount.
    pub fn total(&self) -> f64 {
        if self.has_split() {
            self.renewable_value() + self.non_renewable_value()
        } else {
            self.amount.as_ref().map(Quantity::or_zero).unwrap_or(0.0)
        }
    }

    pub fn is_total(&self) -> bool {
        is_total_label(&self.label)
    }

    /// Raw text of every cell that could not be read as a number.
    pub fn unparseable(&self) -> Vec<String> {
        [&self.renewable, &self.non_renewable, &self.amount]
            .into_iter()
            .flatten()
            .filter_map(|q| match q {
                Quantity::Unparseable(raw) => Some(raw.clone()),
                _ => None,
            })
            .collect()
    }
}
