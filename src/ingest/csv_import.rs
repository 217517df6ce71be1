use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, VsmeError};
use crate::metrics::Metric;

const REFERENCE_ALIASES: &[&str] = &[
    "reference",
    "ref",
    "metricreference",
    "metric",
    "code",
    "datapoint",
    "datapointid",
    "id",
];
const RESPONSE_ALIASES: &[&str] = &["response", "value", "answer", "amount"];
const UNIT_ALIASES: &[&str] = &["unit", "units"];
const LABEL_ALIASES: &[&str] = &["label", "question", "metricname", "description"];
const DISCLOSURE_ALIASES: &[&str] = &["disclosure", "disclosureid"];

/// Result of one import run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub metrics: Vec<Metric>,
    /// Data rows without a reference
    pub skipped_rows: usize,
}

fn normalize(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Default)]
struct Columns {
    reference: usize,
    response: Option<usize>,
    unit: Option<usize>,
    label: Option<usize>,
    disclosure: Option<usize>,
}

impl Columns {
    fn detect(headers: &[String]) -> Result<Columns> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };
        let reference = find(REFERENCE_ALIASES).ok_or_else(|| VsmeError::Import {
            message: format!(
                "no reference column found (headers: {})",
                headers.join(", ")
            ),
        })?;
        Ok(Columns {
            reference,
            response: find(RESPONSE_ALIASES),
            unit: find(UNIT_ALIASES),
            label: find(LABEL_ALIASES),
            disclosure: find(DISCLOSURE_ALIASES),
        })
    }

    fn is_identity(&self, idx: usize) -> bool {
        idx == self.reference || Some(idx) == self.label || Some(idx) == self.disclosure
    }
}

fn cell(row: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

struct Group {
    reference: String,
    rows: Vec<csv::StringRecord>,
}

/// Read metrics from CSV.
///
/// Rows sharing a reference are grouped. A reference with one row and nothing
/// beyond its response becomes a scalar `response`; anything else becomes
/// `responseData` records keyed by the original headers.
pub fn import_csv<R: Read>(reader: R, default_disclosure: Option<&str>) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let columns = Columns::detect(&headers)?;

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped_rows = 0;
    for result in rdr.records() {
        let row = result?;
        let Some(reference) = cell(&row, Some(columns.reference)) else {
            if row.iter().any(|c| !c.trim().is_empty()) {
                skipped_rows += 1;
            }
            continue;
        };
        let key = reference.to_ascii_uppercase();
        match index.get(&key) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    reference: reference.to_string(),
                    rows: vec![row],
                });
            }
        }
    }

    let default_disclosure = default_disclosure
        .map(|d| d.trim().to_ascii_uppercase())
        .filter(|d| !d.is_empty());
    let metrics: Vec<Metric> = groups
        .into_iter()
        .map(|group| group_to_metric(group, &columns, &headers, default_disclosure.as_deref()))
        .collect();

    tracing::info!(
        metrics = metrics.len(),
        skipped_rows,
        "imported metric responses from CSV"
    );
    Ok(ImportReport {
        metrics,
        skipped_rows,
    })
}

pub fn import_csv_path(path: &Path, default_disclosure: Option<&str>) -> Result<ImportReport> {
    let file = std::fs::File::open(path).map_err(|e| VsmeError::Import {
        message: format!("cannot open {}: {}", path.display(), e),
    })?;
    import_csv(file, default_disclosure)
}

fn group_to_metric(
    group: Group,
    columns: &Columns,
    headers: &[String],
    default_disclosure: Option<&str>,
) -> Metric {
    let first = &group.rows[0];
    let first_cell = |idx| group.rows.iter().find_map(|r| cell(r, idx)).map(str::to_string);
    let label = first_cell(columns.label);
    let unit = first_cell(columns.unit);
    let disclosure_id = first_cell(columns.disclosure)
        .map(|d| d.to_ascii_uppercase())
        .or_else(|| default_disclosure.map(str::to_string));

    let has_extra = |row: &csv::StringRecord| {
        row.iter().enumerate().any(|(i, c)| {
            !columns.is_identity(i)
                && Some(i) != columns.response
                && Some(i) != columns.unit
                && !c.trim().is_empty()
        })
    };

    let (response, response_data) = if group.rows.len() == 1 && !has_extra(first) {
        (cell(first, columns.response).map(|v| Value::String(v.to_string())), None)
    } else {
        let records: Vec<Value> = group
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (i, header) in headers.iter().enumerate() {
                    if columns.is_identity(i) || header.is_empty() {
                        continue;
                    }
                    let value = cell(row, Some(i))
                        .map(|v| Value::String(v.to_string()))
                        .unwrap_or(Value::Null);
                    record.insert(header.clone(), value);
                }
                Value::Object(record)
            })
            .collect();
        (None, Some(Value::Array(records)))
    };

    Metric {
        reference: group.reference,
        label,
        unit,
        disclosure_id,
        response,
        response_data,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_headers_and_scalars() {
        let csv = "\u{feff}Datapoint ID,Question,Answer,Unit\n\
                   B3-GHG-SCOPE1,Scope 1 emissions,120,tCO2e\n\
                   B8-EMPLOYEES,Number of employees,42,\n";
        let report = import_csv(csv.as_bytes(), None).unwrap();
        assert_eq!(report.metrics.len(), 2);
        let scope1 = &report.metrics[0];
        assert_eq!(scope1.reference, "B3-GHG-SCOPE1");
        assert_eq!(scope1.label.as_deref(), Some("Scope 1 emissions"));
        assert_eq!(scope1.response, Some(Value::String("120".to_string())));
        assert_eq!(scope1.unit.as_deref(), Some("tCO2e"));
        assert!(scope1.response_data.is_none());
        assert_eq!(scope1.disclosure().as_deref(), Some("B3"));
        assert!(report.metrics[1].unit.is_none());
    }

    #[test]
    fn test_multi_row_reference_becomes_records() {
        let csv = "ref,Energy type,Renewable (MWh),Non-renewable (MWh)\n\
                   B3-ENERGY,Electricity,100,50\n\
                   B3-ENERGY,Natural gas,,200\n\
                   ,,,\n\
                   ,Orphan,1,2\n";
        let report = import_csv(csv.as_bytes(), Some("b3")).unwrap();
        assert_eq!(report.metrics.len(), 1);
        assert_eq!(report.skipped_rows, 1);
        let energy = &report.metrics[0];
        assert_eq!(energy.disclosure_id.as_deref(), Some("B3"));
        let rows = energy.records().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Energy type"], "Electricity");
        assert_eq!(rows[1]["Renewable (MWh)"], Value::Null);
        assert!(rows[0].get("ref").is_none());
    }

    #[test]
    fn test_single_row_with_extra_cells_is_tabular() {
        let csv = "Reference,Site,Location\nB1-SITES,HQ,Vienna\n";
        let report = import_csv(csv.as_bytes(), None).unwrap();
        let sites = &report.metrics[0];
        assert!(sites.response.is_none());
        assert_eq!(sites.records().unwrap()[0]["Location"], "Vienna");
    }

    #[test]
    fn test_missing_reference_column() {
        let csv = "Question,Answer\nEmployees,42\n";
        let err = import_csv(csv.as_bytes(), None).unwrap_err();
        assert!(matches!(err, VsmeError::Import { .. }));
        assert!(err.to_string().contains("no reference column"));
    }

    #[test]
    fn test_explicit_disclosure_column_wins() {
        let csv = "code,disclosure,value\nENERGY-TOTAL,b3,500\n";
        let report = import_csv(csv.as_bytes(), Some("B1")).unwrap();
        assert_eq!(report.metrics[0].disclosure_id.as_deref(), Some("B3"));
    }
}
