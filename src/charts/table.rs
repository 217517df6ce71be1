//! Tabular responses rendered as-is.

use serde_json::{Value, json};

use super::{ChartSpec, ChartType};
use crate::metrics::{Metric, value_has_content};

/// Table chart of the first metric that carries a tabular response.
pub fn tabular_response(metrics: &[&Metric]) -> Vec<ChartSpec> {
    let Some((metric, rows)) = metrics.iter().find_map(|m| {
        m.records()
            .filter(|rows| rows.iter().any(value_has_content))
            .map(|rows| (*m, rows))
    }) else {
        return Vec::new();
    };

    let data: Vec<Value> = rows
        .iter()
        .filter(|row| value_has_content(row))
        .map(|row| match row {
            Value::Object(_) => row.clone(),
            other => json!({ "value": other }),
        })
        .collect();

    let label = metric.display_label();
    let insight = match data.len() {
        1 => "1 entry reported.".to_string(),
        n => format!("{} entries reported.", n),
    };
    vec![ChartSpec {
        title: label.to_string(),
        description: format!("Reported entries for {} ({}).", label, metric.reference),
        chart_type: ChartType::Table,
        data,
        insights: vec![insight],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_tabular_metric_becomes_table() {
        let scalar = Metric {
            reference: "B1-OPTION".to_string(),
            response: Some(json!("Basic module")),
            ..Default::default()
        };
        let sites = Metric {
            reference: "B1-SITES".to_string(),
            label: Some("Sites".to_string()),
            response_data: Some(json!([
                {"Site": "HQ", "Location": "Vienna"},
                {"Site": null, "Location": null},
                {"Site": "Plant", "Location": "Graz"}
            ])),
            ..Default::default()
        };
        let charts = tabular_response(&[&scalar, &sites]);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].chart_type, ChartType::Table);
        assert_eq!(charts[0].title, "Sites");
        assert_eq!(charts[0].data.len(), 2);
        assert_eq!(charts[0].insights, vec!["2 entries reported.".to_string()]);
    }

    #[test]
    fn test_no_tabular_metric() {
        let empty = Metric {
            reference: "B1-SITES".to_string(),
            response_data: Some(json!([])),
            ..Default::default()
        };
        assert!(tabular_response(&[&empty]).is_empty());
    }
}
