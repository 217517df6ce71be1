//! Scope 1/2/3 greenhouse gas comparison.

use serde_json::{Value, json};

use super::{ChartSpec, ChartType, unparseable_notice};
use crate::metrics::{Metric, Quantity, format_number, round2};

pub const GHG_UNIT: &str = "tCO2e";

/// Metric references holding the three emission scopes, in chart order.
pub const SCOPE_REFERENCES: [(&str, &str); 3] = [
    ("B3-GHG-SCOPE1", "Scope 1"),
    ("B3-GHG-SCOPE2", "Scope 2"),
    ("B3-GHG-SCOPE3", "Scope 3"),
];

/// First copy of `reference` that carries a response, `all_metrics` before
/// `metrics`; else the first copy at all.
fn lookup<'a>(reference: &str, all_metrics: &'a [Metric], metrics: &'a [Metric]) -> Option<&'a Metric> {
    let mut matches = all_metrics
        .iter()
        .chain(metrics.iter())
        .filter(|m| m.reference.trim().eq_ignore_ascii_case(reference));
    let first = matches.next()?;
    if first.has_data() {
        return Some(first);
    }
    Some(matches.find(|m| m.has_data()).unwrap_or(first))
}

fn scope_quantity(metric: &Metric) -> Quantity {
    match (&metric.response, &metric.response_data) {
        (Some(v), _) if !v.is_null() => Quantity::parse(v),
        (_, Some(v)) if !v.is_array() && !v.is_object() => Quantity::parse(v),
        _ => Quantity::Missing,
    }
}

/// Bar chart with exactly one entry per scope, plus a summary table.
///
/// Emitted when at least one scope metric exists; scopes without a usable
/// response are charted as 0 and called out in the insights.
pub fn ghg_scopes(metrics: &[Metric], all_metrics: &[Metric]) -> Vec<ChartSpec> {
    let found: Vec<(&str, Option<&Metric>)> = SCOPE_REFERENCES
        .iter()
        .map(|(reference, label)| (*label, lookup(reference, all_metrics, metrics)))
        .collect();
    if found.iter().all(|(_, m)| m.is_none()) {
        return Vec::new();
    }

    let mut missing = Vec::new();
    let mut unparsed = Vec::new();
    let values: Vec<(&str, f64)> = found
        .iter()
        .map(|(label, metric)| {
            let q = metric.map(scope_quantity).unwrap_or(Quantity::Missing);
            match &q {
                Quantity::Missing => missing.push(*label),
                Quantity::Unparseable(raw) => unparsed.push(raw.clone()),
                Quantity::Value(_) => {}
            }
            (*label, q.or_zero())
        })
        .collect();
    let total: f64 = values.iter().map(|(_, v)| v).sum();

    let bars: Vec<Value> = values
        .iter()
        .map(|(label, v)| json!({"scope": label, "value": round2(*v), "unit": GHG_UNIT}))
        .collect();

    let mut rows: Vec<Value> = values
        .iter()
        .map(|(label, v)| {
            let share = if total > 0.0 { round2(v / total * 100.0) } else { 0.0 };
            json!({"scope": label, "emissions": round2(*v), "unit": GHG_UNIT, "percentage": share})
        })
        .collect();
    let total_share = if total > 0.0 { 100.0 } else { 0.0 };
    rows.push(json!({"scope": "Total", "emissions": round2(total), "unit": GHG_UNIT, "percentage": total_share}));

    let mut insights = vec![format!(
        "Total reported emissions are {} {}.",
        format_number(total),
        GHG_UNIT
    )];
    if total > 0.0
        && let Some((label, v)) = values.iter().max_by(|a, b| a.1.total_cmp(&b.1))
    {
        insights.push(format!(
            "{} is the largest source at {}% of reported emissions.",
            label,
            format_number(round2(v / total * 100.0))
        ));
    }
    if !missing.is_empty() {
        insights.push(format!(
            "No response recorded for {}; shown as 0.",
            missing.join(", ")
        ));
    }
    insights.extend(unparseable_notice(&unparsed));

    vec![
        ChartSpec {
            title: "GHG emissions by scope".to_string(),
            description: format!("Gross Scope 1, 2 and 3 emissions in {}.", GHG_UNIT),
            chart_type: ChartType::BarChart,
            data: bars,
            insights: insights.clone(),
        },
        ChartSpec {
            title: "GHG emissions summary".to_string(),
            description: "Emissions per scope with their share of the total.".to_string(),
            chart_type: ChartType::Table,
            data: rows,
            insights,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(reference: &str, response: Value) -> Metric {
        Metric {
            reference: reference.to_string(),
            response: Some(response),
            ..Default::default()
        }
    }

    #[test]
    fn test_bar_chart_always_has_three_scopes() {
        for metrics in [
            vec![scope("B3-GHG-SCOPE1", json!("120"))],
            vec![
                scope("B3-GHG-SCOPE1", json!(120)),
                scope("B3-GHG-SCOPE2", json!("80")),
                scope("B3-GHG-SCOPE3", json!("400")),
            ],
            vec![scope("B3-GHG-SCOPE2", json!(null))],
        ] {
            let charts = ghg_scopes(&[], &metrics);
            assert_eq!(charts[0].chart_type, ChartType::BarChart);
            assert_eq!(charts[0].data.len(), 3);
            assert_eq!(charts[1].data.len(), 4);
        }
    }

    #[test]
    fn test_no_scope_metrics_no_charts() {
        let other = vec![scope("B3-ENERGY-TOTAL", json!("10"))];
        assert!(ghg_scopes(&other, &other).is_empty());
    }

    #[test]
    fn test_missing_and_unparseable_scopes() {
        let all = vec![
            scope("B3-GHG-SCOPE1", json!("1,000 t")),
            scope("B3-GHG-SCOPE2", json!("tbd")),
        ];
        let charts = ghg_scopes(&[], &all);
        let bars = &charts[0].data;
        assert_eq!(bars[0]["value"], json!(1000.0));
        assert_eq!(bars[1]["value"], json!(0.0));
        assert_eq!(bars[2]["value"], json!(0.0));
        let insights = &charts[0].insights;
        assert!(insights.iter().any(|i| i.contains("Scope 3; shown as 0")), "{insights:?}");
        assert!(insights.iter().any(|i| i.contains("\"tbd\"")), "{insights:?}");
        assert_eq!(charts[1].data[3]["emissions"], json!(1000.0));
    }

    #[test]
    fn test_all_metrics_take_precedence() {
        let filtered = vec![scope("B3-GHG-SCOPE1", json!("1"))];
        let all = vec![scope("b3-ghg-scope1", json!("5"))];
        let charts = ghg_scopes(&filtered, &all);
        assert_eq!(charts[0].data[0]["value"], json!(5.0));
    }

    #[test]
    fn test_empty_copy_does_not_hide_filled_scope() {
        let filtered = vec![scope("B3-GHG-SCOPE1", json!("30"))];
        let all = vec![scope("B3-GHG-SCOPE1", json!(null))];
        let charts = ghg_scopes(&filtered, &all);
        assert_eq!(charts[0].data[0]["value"], json!(30.0));
        assert!(
            !charts[0].insights.iter().any(|i| i.contains("Scope 1;")),
            "{:?}",
            charts[0].insights
        );
    }

    #[test]
    fn test_space_grouped_scope_value() {
        let all = vec![scope("B3-GHG-SCOPE1", json!("1 200"))];
        let charts = ghg_scopes(&[], &all);
        assert_eq!(charts[0].data[0]["value"], json!(1200.0));
        assert_eq!(charts[0].insights[0], "Total reported emissions are 1200 tCO2e.");
    }
}
