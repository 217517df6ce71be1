//! Energy mix breakdown: shares of total consumption and renewable split.

use serde_json::{Value, json};

use super::{ChartSpec, ChartType, unparseable_notice};
use crate::metrics::{DataKind, Metric, format_number, round2};
use crate::tabular::{EnergyRow, objects};

const DEFAULT_UNIT: &str = "MWh";

/// Computed row of the breakdown table
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyShare {
    pub label: String,
    pub renewable: f64,
    pub non_renewable: f64,
    pub total: f64,
    /// Share of total consumption, percent, two decimals
    pub percentage: f64,
    /// Renewable share within the row, percent, two decimals
    pub renewable_percentage: f64,
}

/// Whether a metric's table looks like energy consumption.
fn is_energy_metric(metric: &Metric) -> bool {
    let Some(rows) = metric.records() else {
        return false;
    };
    match metric.data_kind {
        Some(kind) => kind == DataKind::Energy,
        None => {
            let payload = Value::Array(rows.to_vec());
            DataKind::infer_from_value(&payload) == DataKind::Energy
                || objects(rows).any(|r| r.keys().any(|k| k.to_lowercase().contains("renewable")))
        }
    }
}

/// Per-row totals and percentages, excluding rows labelled "Total" from every denominator.
pub fn compute_shares(rows: &[EnergyRow]) -> Vec<EnergyShare> {
    let data: Vec<&EnergyRow> = rows.iter().filter(|r| !r.is_total()).collect();
    let grand_total: f64 = data.iter().map(|r| r.total()).sum();
    data.iter()
        .map(|row| {
            let total = row.total();
            let renewable = row.renewable_value();
            EnergyShare {
                label: if row.label.is_empty() {
                    "Unspecified".to_string()
                } else {
                    row.label.clone()
                },
                renewable,
                non_renewable: row.non_renewable_value(),
                total,
                percentage: if grand_total > 0.0 {
                    round2(total / grand_total * 100.0)
                } else {
                    0.0
                },
                renewable_percentage: if total > 0.0 && row.has_split() {
                    round2(renewable / total * 100.0)
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Table, two pies and a stacked bar for the first energy-shaped metric.
pub fn energy_breakdown(metrics: &[&Metric]) -> Vec<ChartSpec> {
    let Some(metric) = metrics.iter().copied().find(|m| is_energy_metric(m)) else {
        return Vec::new();
    };
    let rows: Vec<EnergyRow> = metric
        .records()
        .map(|rows| objects(rows).map(EnergyRow::from_record).collect())
        .unwrap_or_default();
    let shares = compute_shares(&rows);
    if shares.is_empty() {
        return Vec::new();
    }

    let unit = rows
        .iter()
        .find_map(|r| r.unit.clone())
        .or_else(|| metric.unit.clone())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string());
    let split_known = rows.iter().filter(|r| !r.is_total()).all(EnergyRow::has_split);
    let unparsed: Vec<String> = rows.iter().flat_map(EnergyRow::unparseable).collect();
    let notice = unparseable_notice(&unparsed);

    let grand_total: f64 = shares.iter().map(|s| s.total).sum();
    let renewable_total: f64 = shares.iter().map(|s| s.renewable).sum();
    let non_renewable_total: f64 = shares.iter().map(|s| s.non_renewable).sum();
    let renewable_share = if grand_total > 0.0 {
        round2(renewable_total / grand_total * 100.0)
    } else {
        0.0
    };

    let mut insights = vec![format!(
        "Total energy consumption is {} {}.",
        format_number(grand_total),
        unit
    )];
    if split_known && grand_total > 0.0 {
        insights.push(format!(
            "Renewable sources account for {}% of total consumption.",
            format_number(renewable_share)
        ));
    }
    if let Some(largest) = shares
        .iter()
        .filter(|s| s.total > 0.0)
        .max_by(|a, b| a.total.total_cmp(&b.total))
    {
        insights.push(format!(
            "{} is the largest energy source at {}% of consumption.",
            largest.label,
            format_number(largest.percentage)
        ));
    }
    insights.extend(notice.clone());

    let mut table: Vec<Value> = shares
        .iter()
        .map(|s| {
            json!({
                "energyType": s.label,
                "renewable": round2(s.renewable),
                "nonRenewable": round2(s.non_renewable),
                "total": round2(s.total),
                "unit": unit,
                "percentageOfTotal": s.percentage,
                "renewablePercentage": s.renewable_percentage,
            })
        })
        .collect();
    let total_percentage = if grand_total > 0.0 { 100.0 } else { 0.0 };
    table.push(json!({
        "energyType": "Total",
        "renewable": round2(renewable_total),
        "nonRenewable": round2(non_renewable_total),
        "total": round2(grand_total),
        "unit": unit,
        "percentageOfTotal": total_percentage,
        "renewablePercentage": renewable_share,
    }));

    let mut charts = vec![
        ChartSpec {
            title: "Energy consumption breakdown".to_string(),
            description: format!(
                "Consumption per energy type in {} with its share of the total.",
                unit
            ),
            chart_type: ChartType::Table,
            data: table,
            insights,
        },
        ChartSpec {
            title: "Energy consumption by type".to_string(),
            description: "Share of each energy type in total consumption.".to_string(),
            chart_type: ChartType::PieChart,
            data: shares
                .iter()
                .map(|s| json!({"name": s.label, "value": round2(s.total), "percentage": s.percentage}))
                .collect(),
            insights: notice.iter().cloned().collect(),
        },
    ];

    if split_known && renewable_total + non_renewable_total > 0.0 {
        charts.push(ChartSpec {
            title: "Renewable vs non-renewable energy".to_string(),
            description: "Split of total consumption by renewable origin.".to_string(),
            chart_type: ChartType::PieChart,
            data: vec![
                json!({
                    "name": "Renewable",
                    "value": round2(renewable_total),
                    "percentage": renewable_share,
                }),
                json!({
                    "name": "Non-renewable",
                    "value": round2(non_renewable_total),
                    "percentage": round2(100.0 - renewable_share),
                }),
            ],
            insights: vec![format!(
                "{}% of energy comes from renewable sources.",
                format_number(renewable_share)
            )],
        });
        charts.push(ChartSpec {
            title: "Energy sources by renewable origin".to_string(),
            description: format!(
                "Renewable and non-renewable consumption per energy type in {}.",
                unit
            ),
            chart_type: ChartType::StackedBarChart,
            data: shares
                .iter()
                .map(|s| {
                    json!({
                        "name": s.label,
                        "renewable": round2(s.renewable),
                        "nonRenewable": round2(s.non_renewable),
                    })
                })
                .collect(),
            insights: Vec::new(),
        });
    }
    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn energy_metric(data: Value) -> Metric {
        Metric {
            reference: "B3-ENERGY".to_string(),
            response_data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn test_percentages_sum_to_hundred_excluding_total_row() {
        let m = energy_metric(json!([
            {"Energy type": "Electricity", "Renewable (MWh)": "100", "Non-renewable (MWh)": "233"},
            {"Energy type": "Natural gas", "Renewable (MWh)": "0", "Non-renewable (MWh)": "333"},
            {"Energy type": "Diesel", "Renewable (MWh)": "1", "Non-renewable (MWh)": "332"},
            {"Energy type": "Total", "Renewable (MWh)": "101", "Non-renewable (MWh)": "898"}
        ]));
        let rows: Vec<EnergyRow> = objects(m.records().unwrap())
            .map(EnergyRow::from_record)
            .collect();
        let shares = compute_shares(&rows);
        assert_eq!(shares.len(), 3);
        let sum: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 0.05, "sum was {sum}");
        assert!(shares.iter().all(|s| s.label != "Total"));
    }

    #[test]
    fn test_zero_total_gives_zero_percentages() {
        let m = energy_metric(json!([
            {"Energy type": "Electricity", "Renewable": "0", "Non-renewable": "0"}
        ]));
        let rows: Vec<EnergyRow> = objects(m.records().unwrap())
            .map(EnergyRow::from_record)
            .collect();
        let shares = compute_shares(&rows);
        assert_eq!(shares[0].percentage, 0.0);
        // a zero split produces the table and type pie only
        let charts = energy_breakdown(&[&m]);
        assert_eq!(charts.len(), 2);
    }

    #[test]
    fn test_breakdown_charts() {
        let m = energy_metric(json!([
            {"Energy type": "Electricity", "Renewable (MWh)": 300, "Non-renewable (MWh)": 100},
            {"Energy type": "Heating oil", "Renewable (MWh)": 0, "Non-renewable (MWh)": 100},
            {"Energy type": "TOTAL", "Renewable (MWh)": 300, "Non-renewable (MWh)": 200}
        ]));
        let charts = energy_breakdown(&[&m]);
        assert_eq!(charts.len(), 4);

        let table = &charts[0];
        assert_eq!(table.chart_type, ChartType::Table);
        assert_eq!(table.data.len(), 3);
        assert_eq!(table.data[0]["percentageOfTotal"], json!(80.0));
        assert_eq!(table.data[0]["renewablePercentage"], json!(75.0));
        assert_eq!(table.data[2]["energyType"], "Total");
        assert_eq!(table.data[2]["total"], json!(500.0));
        assert!(table.insights[1].contains("60%"));

        let renewable_pie = &charts[2];
        assert_eq!(renewable_pie.data[0]["value"], json!(300.0));
        assert_eq!(renewable_pie.data[1]["percentage"], json!(40.0));

        assert_eq!(charts[3].chart_type, ChartType::StackedBarChart);
        assert_eq!(charts[3].data.len(), 2);
    }

    #[test]
    fn test_unparseable_cells_become_insights() {
        let m = energy_metric(json!([
            {"Energy type": "Electricity", "Renewable": "unknown", "Non-renewable": "50"}
        ]));
        let charts = energy_breakdown(&[&m]);
        assert!(
            charts[0]
                .insights
                .iter()
                .any(|i| i.contains("\"unknown\"")),
            "{:?}",
            charts[0].insights
        );
    }

    #[test]
    fn test_declared_kind_controls_selection() {
        let mut m = energy_metric(json!([{"Item": "Grid", "Amount": 10}]));
        assert!(energy_breakdown(&[&m]).is_empty());
        m.data_kind = Some(DataKind::Energy);
        let charts = energy_breakdown(&[&m]);
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].data[0]["energyType"], "Grid");
        assert_eq!(charts[0].data[0]["unit"], "MWh");
    }
}
