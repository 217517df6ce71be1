//! Prose rendering of tabular metric responses.
//!
//! The reporting forms store tables as arrays of flat records whose key names
//! drift between form versions ("Consumption", "consumption", "amount"). The
//! summarizer turns such a table into a sentence the prompt can quote. The
//! rendering strategy comes from the caller's declared [`DataKind`], or is
//! sniffed from the first record's keys when no kind was declared.

use serde_json::Value;

use crate::metrics::{DataKind, Quantity, format_number, scalar_text, value_has_content};
use crate::tabular::{
    EnergyRow, Record, find_key, find_value, is_total_label, numeric_key, objects, pairs, text_key,
    unit_from_key,
};

pub const NO_ENTRIES: &str = "No entries have been recorded.";
pub const NO_MEANINGFUL_INFORMATION: &str = "The provided data contains no meaningful information.";

/// Summarize with the kind sniffed from key names.
pub fn summarize(value: &Value) -> String {
    summarize_as(value, None)
}

/// Summarize a JSON payload, using `kind` when the caller declared one.
pub fn summarize_as(value: &Value, kind: Option<DataKind>) -> String {
    match value {
        Value::Array(items) if items.is_empty() => NO_ENTRIES.to_string(),
        _ if !value_has_content(value) => NO_MEANINGFUL_INFORMATION.to_string(),
        Value::Array(items) => {
            let records: Vec<&Record> = objects(items)
                .filter(|r| r.values().any(value_has_content))
                .collect();
            if records.is_empty() {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|v| value_has_content(v))
                    .map(scalar_text)
                    .collect();
                return sentence(&parts.join(", "));
            }
            let kind = kind.unwrap_or_else(|| DataKind::infer_from_value(value));
            tracing::debug!(kind = kind.as_str(), rows = records.len(), "summarizing table");
            match kind {
                DataKind::Energy => energy(&records),
                DataKind::Gender => gender(&records),
                DataKind::Sites => sites(&records),
                DataKind::Emissions => emissions(&records),
                DataKind::Safety => safety(&records),
                DataKind::Generic => generic(&records),
            }
        }
        Value::Object(map) => sentence(&pairs(map).join(", ")),
        other => scalar_text(other),
    }
}

fn sentence(body: &str) -> String {
    let body = body.trim();
    if body.ends_with('.') {
        body.to_string()
    } else {
        format!("{}.", body)
    }
}

fn with_unit(value: &str, unit: Option<&str>) -> String {
    match unit {
        Some(u) if !u.is_empty() => format!("{} {}", value, u),
        _ => value.to_string(),
    }
}

fn quantity_text(q: Option<&Quantity>) -> String {
    match q {
        Some(Quantity::Value(v)) => format_number(*v),
        Some(Quantity::Unparseable(raw)) => raw.clone(),
        Some(Quantity::Missing) | None => "not reported".to_string(),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {}", one)
    } else {
        format!("{} {}", n, many)
    }
}

fn energy(records: &[&Record]) -> String {
    let rows: Vec<EnergyRow> = records.iter().map(|r| EnergyRow::from_record(r)).collect();
    let data: Vec<&EnergyRow> = rows.iter().filter(|r| !r.is_total()).collect();
    let listed: Vec<&EnergyRow> = if data.is_empty() { rows.iter().collect() } else { data };

    let parts: Vec<String> = listed
        .iter()
        .map(|row| {
            let label = if row.label.is_empty() { "Unspecified source" } else { row.label.as_str() };
            let unit = row.unit.as_deref();
            if row.has_split() {
                format!(
                    "{} {} ({} renewable, {} non-renewable)",
                    label,
                    with_unit(&format_number(row.total()), unit),
                    quantity_text(row.renewable.as_ref()),
                    quantity_text(row.non_renewable.as_ref()),
                )
            } else {
                format!("{} {}", label, with_unit(&quantity_text(row.amount.as_ref()), unit))
            }
        })
        .collect();

    let mut text = format!("Energy consumption was reported as follows: {}.", parts.join("; "));

    let units: Vec<&str> = listed.iter().filter_map(|r| r.unit.as_deref()).collect();
    let same_unit = units.len() == listed.len() && units.windows(2).all(|w| w[0] == w[1]);
    if listed.len() > 1 && same_unit && !listed[0].is_total() {
        let total: f64 = listed.iter().map(|r| r.total()).sum();
        text.push_str(&format!(
            " Total consumption amounts to {}.",
            with_unit(&format_number(total), units.first().copied())
        ));
        let renewable: f64 = listed.iter().map(|r| r.renewable_value()).sum();
        if total > 0.0 && listed.iter().all(|r| r.has_split()) {
            text.push_str(&format!(
                " Renewable sources account for {}% of the total.",
                format_number(renewable / total * 100.0)
            ));
        }
    }
    text
}

const GENDER_CATEGORIES: &[&str] = &[
    "male", "female", "men", "women", "man", "woman", "other", "nonbinary", "diverse",
    "undisclosed", "unspecified",
];

/// Whether a column header names a gender category ("Female employees", "Non-binary").
fn is_gender_category(key: &str) -> bool {
    key.to_lowercase()
        .replace(['-', '_'], "")
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GENDER_CATEGORIES.contains(&word))
}

fn gender(records: &[&Record]) -> String {
    let mut other_columns: Vec<String> = Vec::new();
    let mut counts: Vec<(String, f64)> = Vec::new();
    let mut add = |label: &str, n: f64| match counts.iter_mut().find(|(l, _)| l.eq_ignore_ascii_case(label)) {
        Some((_, total)) => *total += n,
        None => counts.push((label.to_string(), n)),
    };

    for record in records {
        if let Some(gender_key) = find_key(record, &["gender", "sex"], &[]) {
            let label = record.get(gender_key).map(scalar_text).unwrap_or_default();
            if label.is_empty() || is_total_label(&label) {
                continue;
            }
            let count = find_value(
                record,
                &["count", "number", "headcount", "employees", "fte", "value", "total"],
                &[gender_key],
            )
            .map(|v| Quantity::parse(v).or_zero())
            .unwrap_or(0.0);
            add(&label, count);
        } else {
            for (key, value) in record.iter() {
                if is_total_label(key) || !value_has_content(value) {
                    continue;
                }
                if !is_gender_category(key) {
                    other_columns.push(format!("{}: {}", key.trim(), scalar_text(value)));
                    continue;
                }
                if let Some(n) = Quantity::parse(value).value() {
                    add(key.trim(), n);
                }
            }
        }
    }

    let total: f64 = counts.iter().map(|(_, n)| n).sum();
    if total <= 0.0 {
        return "The workforce composition was reported without headcount figures.".to_string();
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(label, n)| {
            format!(
                "{} {} ({:.1}%)",
                format_number(*n),
                label.to_lowercase(),
                n / total * 100.0
            )
        })
        .collect();
    let mut text = format!(
        "The workforce comprises {} people: {}.",
        format_number(total),
        parts.join(", ")
    );
    if !other_columns.is_empty() {
        text.push_str(&format!(" Also reported: {}.", other_columns.join(", ")));
    }
    text
}

fn sites(records: &[&Record]) -> String {
    let entries: Vec<String> = records
        .iter()
        .filter_map(|record| {
            let name_key = text_key(record, &["subsidiary", "entity", "name", "site"], &[]);
            let name = name_key.and_then(|k| record.get(k)).map(scalar_text);
            let location = find_value(
                record,
                &["location", "address", "country", "city"],
                &name_key.into_iter().collect::<Vec<_>>(),
            )
            .filter(|v| value_has_content(v))
            .map(scalar_text);
            match (name, location) {
                (Some(n), Some(l)) => Some(format!("{} ({})", n, l)),
                (Some(n), None) => Some(n),
                (None, Some(l)) => Some(l),
                (None, None) => None,
            }
        })
        .collect();
    if entries.is_empty() {
        return generic(records);
    }
    format!(
        "The reporting scope covers {}: {}.",
        plural(entries.len(), "site", "sites"),
        entries.join(", ")
    )
}

fn emissions(records: &[&Record]) -> String {
    let mut total = 0.0;
    let mut units: Vec<String> = Vec::new();
    let parts: Vec<String> = records
        .iter()
        .filter_map(|record| {
            let amount_key = numeric_key(
                record,
                &["tco2", "co2", "emission", "carbon", "amount", "value", "total"],
                &[],
            )?;
            let label = text_key(record, &["scope", "source", "category", "type", "name"], &[amount_key])
                .and_then(|k| record.get(k))
                .map(scalar_text)
                .unwrap_or_else(|| amount_key.trim().to_string());
            if is_total_label(&label) {
                return None;
            }
            let unit = find_value(record, &["unit"], &[amount_key])
                .filter(|v| value_has_content(v))
                .map(scalar_text)
                .or_else(|| unit_from_key(amount_key))
                .unwrap_or_else(|| "tCO2e".to_string());
            let amount = record.get(amount_key).map(|v| Quantity::parse(v).or_zero()).unwrap_or(0.0);
            total += amount;
            units.push(unit.clone());
            Some(format!("{} {} {}", label, format_number(amount), unit))
        })
        .collect();

    if parts.is_empty() {
        return generic(records);
    }
    let mut text = format!("Reported greenhouse gas emissions: {}", parts.join(", "));
    if parts.len() > 1 && units.windows(2).all(|w| w[0] == w[1]) {
        text.push_str(&format!(", giving a total of {} {}", format_number(total), units[0]));
    }
    sentence(&text)
}

fn safety(records: &[&Record]) -> String {
    let incidents: f64 = records
        .iter()
        .flat_map(|record| record.iter())
        .filter(|(k, _)| {
            let k = k.to_lowercase();
            ["accident", "injur", "incident", "fatal"].iter().any(|n| k.contains(n))
        })
        .filter_map(|(_, v)| Quantity::parse(v).value())
        .sum();
    let details: Vec<String> = records.iter().map(|r| pairs(r).join(", ")).collect();
    let mut text = format!(
        "Health and safety data covers {}: {}.",
        plural(records.len(), "record", "records"),
        details.join("; ")
    );
    if incidents > 0.0 {
        text.push_str(&format!(
            " A total of {} accidents, injuries or incidents was reported.",
            format_number(incidents)
        ));
    } else {
        text.push_str(" No accidents or injuries were reported.");
    }
    text
}

fn generic(records: &[&Record]) -> String {
    let rows: Vec<String> = records
        .iter()
        .map(|r| pairs(r).join(", "))
        .filter(|s| !s.is_empty())
        .collect();
    if rows.is_empty() {
        return NO_MEANINGFUL_INFORMATION.to_string();
    }
    sentence(&rows.join("; "))
}
