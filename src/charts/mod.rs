//! Chart recommendations per disclosure.
//!
//! The catalogue decides which builders run for a disclosure; each builder is
//! a pure function over the metric list that returns zero or more chart specs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{self, ChartCapability};
use crate::deserializers::{de_nullable_list, de_text_forgiving};
use crate::metrics::Metric;

pub mod energy;
pub mod ghg;
pub mod table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
    Table,
    PieChart,
    BarChart,
    StackedBarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub title: String,
    pub description: String,
    pub chart_type: ChartType,
    pub data: Vec<Value>,
    #[serde(default)]
    pub insights: Vec<String>,
}

/// Body of the graphics recommendation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsRequest {
    pub disclosure_id: String,
    #[serde(default, deserialize_with = "de_text_forgiving")]
    pub disclosure_title: String,
    #[serde(default, deserialize_with = "de_text_forgiving")]
    pub disclosure_description: String,
    #[serde(default, deserialize_with = "de_nullable_list")]
    pub metrics: Vec<Metric>,
    #[serde(default, deserialize_with = "de_nullable_list")]
    pub all_metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsRecommendations {
    pub has_charts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contextual_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GraphicsRecommendations {
    pub fn none(message: impl Into<String>) -> Self {
        Self {
            has_charts: false,
            charts: None,
            contextual_analysis: None,
            message: Some(message.into()),
        }
    }

    pub fn charts(&self) -> &[ChartSpec] {
        self.charts.as_deref().unwrap_or(&[])
    }

    /// Every insight across the charts, in chart order.
    pub fn insights(&self) -> Vec<String> {
        self.charts()
            .iter()
            .flat_map(|c| c.insights.iter().cloned())
            .collect()
    }
}

/// Build chart specs for a disclosure from its metrics.
///
/// `all_metrics` is the company's full metric set; builders that cross-reference
/// metrics outside the request's filtered list look there first.
pub fn build_recommendations(
    disclosure_id: &str,
    metrics: &[Metric],
    all_metrics: &[Metric],
) -> GraphicsRecommendations {
    let id = disclosure_id.trim().to_ascii_uppercase();
    let capabilities = catalog::chart_capabilities(&id);
    if capabilities.is_empty() {
        return GraphicsRecommendations::none(format!(
            "No chart recommendations are available for disclosure {}.",
            id
        ));
    }

    let own: Vec<&Metric> = metrics.iter().filter(|m| m.belongs_to(&id)).collect();
    let mut charts = Vec::new();
    for capability in capabilities {
        let built = match capability {
            ChartCapability::TabularResponse => table::tabular_response(&own),
            ChartCapability::EnergyBreakdown => energy::energy_breakdown(&own),
            ChartCapability::GhgScopes => ghg::ghg_scopes(metrics, all_metrics),
        };
        tracing::debug!(disclosure = %id, ?capability, charts = built.len(), "chart builder finished");
        charts.extend(built);
    }

    if charts.is_empty() {
        return GraphicsRecommendations::none(format!(
            "No chartable data has been recorded for disclosure {} yet.",
            id
        ));
    }
    GraphicsRecommendations {
        has_charts: true,
        charts: Some(charts),
        contextual_analysis: None,
        message: None,
    }
}

/// Notice for cells that could not be read as numbers.
pub(crate) fn unparseable_notice(cells: &[String]) -> Option<String> {
    if cells.is_empty() {
        return None;
    }
    let quoted: Vec<String> = cells.iter().map(|c| format!("\"{}\"", c)).collect();
    Some(format!(
        "Some values could not be read as numbers and were charted as 0: {}.",
        quoted.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric(reference: &str, response: Option<Value>, data: Option<Value>) -> Metric {
        Metric {
            reference: reference.to_string(),
            response,
            response_data: data,
            ..Default::default()
        }
    }

    #[test]
    fn test_unhandled_disclosures_have_no_charts() {
        let metrics = vec![metric("B2-1", Some(json!("Policy adopted")), None)];
        for id in ["B2", "B4", "B5", "B6", "B7", "B8", "B9", "B10", "B11", "X1", ""] {
            let recs = build_recommendations(id, &metrics, &metrics);
            assert!(!recs.has_charts, "{id}");
            assert!(recs.charts.is_none());
            assert!(recs.message.is_some());
        }
    }

    #[test]
    fn test_capable_disclosure_without_data() {
        let recs = build_recommendations("B1", &[], &[]);
        assert!(!recs.has_charts);
        assert!(recs.message.unwrap().contains("No chartable data"));
    }

    #[test]
    fn test_b3_combines_energy_and_ghg() {
        let metrics = vec![
            metric(
                "B3-ENERGY",
                None,
                Some(json!([
                    {"Energy type": "Electricity", "Renewable": 50, "Non-renewable": 50}
                ])),
            ),
            metric("B3-GHG-SCOPE1", Some(json!("10")), None),
        ];
        let recs = build_recommendations("b3", &metrics, &metrics);
        assert!(recs.has_charts);
        let types: Vec<ChartType> = recs.charts().iter().map(|c| c.chart_type).collect();
        assert_eq!(
            types,
            vec![
                ChartType::Table,
                ChartType::PieChart,
                ChartType::PieChart,
                ChartType::StackedBarChart,
                ChartType::BarChart,
                ChartType::Table,
            ]
        );
        assert!(!recs.insights().is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let recs = GraphicsRecommendations::none("nothing");
        let v = serde_json::to_value(&recs).unwrap();
        assert_eq!(v, json!({"hasCharts": false, "message": "nothing"}));

        let chart = ChartSpec {
            title: "t".to_string(),
            description: "d".to_string(),
            chart_type: ChartType::StackedBarChart,
            data: vec![],
            insights: vec![],
        };
        let v = serde_json::to_value(&chart).unwrap();
        assert_eq!(v["chartType"], "StackedBarChart");
    }

    #[test]
    fn test_request_accepts_nulls_from_forms() {
        let req: GraphicsRequest = serde_json::from_value(json!({
            "disclosureId": "B3",
            "disclosureTitle": null,
            "disclosureDescription": null,
            "metrics": [{"reference": "B3-GHG-SCOPE1", "response": "10"}],
            "allMetrics": null
        }))
        .unwrap();
        assert_eq!(req.disclosure_title, "");
        assert_eq!(req.disclosure_description, "");
        assert_eq!(req.metrics.len(), 1);
        assert!(req.all_metrics.is_empty());
    }
}
