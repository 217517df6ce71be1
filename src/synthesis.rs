//! Disclosure drafting: filter the metrics, build the prompt, call the model.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::charts::GraphicsRecommendations;
use crate::clients::{GenerationParams, TextGenerator};
use crate::deserializers::{
    de_nullable_list, de_option_text_forgiving, de_string_list_forgiving, de_text_forgiving,
};
use crate::error::{Result, VsmeError};
use crate::metrics::Metric;
use crate::prompts;

/// Returned instead of a draft when nothing has been recorded yet.
pub const NO_DATA_MESSAGE: &str = "No data has been recorded for this disclosure yet. Please collect and enter the relevant metric responses before generating the disclosure text.";

/// Company context used by disclosures that describe the undertaking itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default, deserialize_with = "de_text_forgiving")]
    pub name: String,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub legal_form: Option<String>,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub employees: Option<String>,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub turnover: Option<String>,
    #[serde(default, deserialize_with = "de_option_text_forgiving")]
    pub reporting_period: Option<String>,
    #[serde(default, deserialize_with = "de_string_list_forgiving")]
    pub sites: Vec<String>,
}

impl CompanyProfile {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.legal_form.is_none()
            && self.sector.is_none()
            && self.country.is_none()
            && self.employees.is_none()
            && self.turnover.is_none()
            && self.reporting_period.is_none()
            && self.sites.is_empty()
    }
}

/// Body of the disclosure generation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureRequest {
    pub disclosure_id: String,
    #[serde(default, deserialize_with = "de_text_forgiving")]
    pub disclosure_title: String,
    #[serde(default, deserialize_with = "de_text_forgiving")]
    pub disclosure_description: String,
    #[serde(default, deserialize_with = "de_nullable_list")]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub company_profile: Option<CompanyProfile>,
}

impl DisclosureRequest {
    /// Metrics of this disclosure that carry a response.
    pub fn relevant_metrics(&self) -> Vec<&Metric> {
        let id = self.disclosure_id.trim();
        self.metrics
            .iter()
            .filter(|m| m.belongs_to(id) && m.has_data())
            .collect()
    }

    /// Whether the company profile is usable context for this disclosure.
    pub fn profile_applies(&self) -> bool {
        catalog::find(&self.disclosure_id).is_some_and(|d| d.uses_company_profile)
            && self.company_profile.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Draft the disclosure text.
///
/// Returns [`NO_DATA_MESSAGE`] without touching the generator when there is
/// nothing to draft from. A missing generator is reported as
/// [`VsmeError::MissingApiKey`].
pub async fn synthesize(
    generator: Option<&dyn TextGenerator>,
    request: &DisclosureRequest,
    params: &GenerationParams,
) -> Result<String> {
    if request.disclosure_id.trim().is_empty() {
        return Err(VsmeError::Validation {
            message: "disclosureId is required".to_string(),
        });
    }

    let metrics = request.relevant_metrics();
    if metrics.is_empty() && !request.profile_applies() {
        tracing::info!(
            disclosure = %request.disclosure_id,
            received = request.metrics.len(),
            "no recorded data, returning canned response"
        );
        return Ok(NO_DATA_MESSAGE.to_string());
    }

    let generator = generator.ok_or(VsmeError::MissingApiKey)?;
    let disclosure = catalog::find(&request.disclosure_id);
    if disclosure.is_none() {
        tracing::warn!(disclosure = %request.disclosure_id, "disclosure not in catalogue, drafting without guidance");
    }
    let prompt = prompts::build_disclosure_prompt(request, disclosure, &metrics);
    tracing::debug!(
        disclosure = %request.disclosure_id,
        model = generator.model(),
        metrics = metrics.len(),
        prompt_chars = prompt.len(),
        "generating disclosure response"
    );

    let text = generator.generate(&prompt, params).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(VsmeError::Upstream {
            message: "model returned an empty response".to_string(),
        });
    }
    Ok(text.to_string())
}

/// Best-effort commentary over chart insights.
///
/// Falls back to the joined insights when no generator is configured or the
/// call fails. Returns `None` when there are no charts.
pub async fn contextual_analysis(
    generator: Option<&dyn TextGenerator>,
    disclosure_id: &str,
    disclosure_title: &str,
    recommendations: &GraphicsRecommendations,
    params: &GenerationParams,
) -> Option<String> {
    if !recommendations.has_charts {
        return None;
    }
    let fallback = recommendations.insights().join(" ");
    let Some(generator) = generator else {
        return (!fallback.is_empty()).then_some(fallback);
    };

    let prompt = prompts::build_chart_analysis_prompt(disclosure_id, disclosure_title, recommendations);
    match generator.generate(&prompt, params).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            tracing::warn!(disclosure = %disclosure_id, "empty chart analysis, using insights");
            (!fallback.is_empty()).then_some(fallback)
        }
        Err(e) => {
            tracing::warn!(disclosure = %disclosure_id, error = %e, "chart analysis failed, using insights");
            (!fallback.is_empty()).then_some(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::build_recommendations;
    use crate::clients::GeneratorError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeGenerator {
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> std::result::Result<String, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            if self.fail {
                return Err(GeneratorError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok("  Drafted disclosure.\n".to_string())
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn request(id: &str, metrics: Vec<Metric>) -> DisclosureRequest {
        DisclosureRequest {
            disclosure_id: id.to_string(),
            metrics,
            ..Default::default()
        }
    }

    fn metric(reference: &str, response: serde_json::Value) -> Metric {
        Metric {
            reference: reference.to_string(),
            response: Some(response),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_data_short_circuits() {
        let fake = FakeGenerator::default();
        let req = request(
            "B3",
            vec![
                metric("B3-GHG-SCOPE1", json!(null)),
                metric("B3-GHG-SCOPE2", json!("  ")),
                metric("B4-AIR", json!("12")),
            ],
        );
        let text = synthesize(Some(&fake), &req, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(text, NO_DATA_MESSAGE);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_data_without_generator_still_canned() {
        let req = request("B7", Vec::new());
        let text = synthesize(None, &req, &GenerationParams::default()).await.unwrap();
        assert_eq!(text, NO_DATA_MESSAGE);
    }

    #[tokio::test]
    async fn test_generates_and_trims() {
        let fake = FakeGenerator::default();
        let req = request("B3", vec![metric("B3-GHG-SCOPE1", json!("120"))]);
        let text = synthesize(Some(&fake), &req, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(text, "Drafted disclosure.");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert!(fake.last_prompt.lock().unwrap().contains("B3-GHG-SCOPE1"));
    }

    #[tokio::test]
    async fn test_b1_profile_is_enough_context() {
        let fake = FakeGenerator::default();
        let mut req = request("B1", Vec::new());
        req.company_profile = Some(CompanyProfile {
            name: "Acme GmbH".to_string(),
            ..Default::default()
        });
        synthesize(Some(&fake), &req, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);

        // the profile is ignored outside B1
        req.disclosure_id = "B8".to_string();
        let text = synthesize(Some(&fake), &req, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(text, NO_DATA_MESSAGE);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_generator_is_missing_key() {
        let req = request("B3", vec![metric("B3-GHG-SCOPE1", json!(5))]);
        let err = synthesize(None, &req, &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VsmeError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_retried() {
        let fake = FakeGenerator {
            fail: true,
            ..Default::default()
        };
        let req = request("B3", vec![metric("B3-GHG-SCOPE1", json!(5))]);
        let err = synthesize(Some(&fake), &req, &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VsmeError::Upstream { .. }));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_disclosure_id_rejected() {
        let err = synthesize(None, &request(" ", Vec::new()), &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VsmeError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_contextual_analysis_falls_back_to_insights() {
        let metrics = vec![metric("B3-GHG-SCOPE1", json!(10))];
        let recs = build_recommendations("B3", &metrics, &metrics);
        let params = GenerationParams::default();

        let offline = contextual_analysis(None, "B3", "", &recs, &params).await.unwrap();
        assert!(offline.contains("Total reported emissions are 10 tCO2e."));

        let failing = FakeGenerator {
            fail: true,
            ..Default::default()
        };
        let fallback = contextual_analysis(Some(&failing), "B3", "", &recs, &params)
            .await
            .unwrap();
        assert_eq!(fallback, offline);

        let ok = FakeGenerator::default();
        let generated = contextual_analysis(Some(&ok), "B3", "", &recs, &params).await;
        assert_eq!(generated.as_deref(), Some("Drafted disclosure."));

        let none = build_recommendations("B5", &metrics, &metrics);
        assert!(contextual_analysis(Some(&ok), "B5", "", &none, &params).await.is_none());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let req: DisclosureRequest = serde_json::from_value(json!({
            "disclosureId": "B1",
            "disclosureTitle": "Basis for preparation",
            "metrics": [{"reference": "B1-OPTION", "response": "Basic"}],
            "companyProfile": {"name": "Acme", "employees": 42, "sites": "HQ; Plant"}
        }))
        .unwrap();
        assert_eq!(req.relevant_metrics().len(), 1);
        let profile = req.company_profile.unwrap();
        assert_eq!(profile.employees.as_deref(), Some("42"));
        assert_eq!(profile.sites, vec!["HQ", "Plant"]);
    }

    #[test]
    fn test_request_accepts_nulls_from_forms() {
        let req: DisclosureRequest = serde_json::from_value(json!({
            "disclosureId": "B1",
            "disclosureTitle": null,
            "disclosureDescription": null,
            "metrics": null,
            "companyProfile": {"name": null, "country": "Austria", "sites": null}
        }))
        .unwrap();
        assert_eq!(req.disclosure_title, "");
        assert_eq!(req.disclosure_description, "");
        assert!(req.metrics.is_empty());
        let profile = req.company_profile.as_ref().unwrap();
        assert_eq!(profile.name, "");
        assert_eq!(profile.country.as_deref(), Some("Austria"));
        assert!(req.profile_applies());
    }
}
