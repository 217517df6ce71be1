use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{AppState, ForwardedAuth};
use crate::catalog;
use crate::charts::{GraphicsRecommendations, GraphicsRequest, build_recommendations};
use crate::error::{Result, VsmeError};
use crate::store::DisclosureResponse;
use crate::synthesis::{self, DisclosureRequest, NO_DATA_MESSAGE};

fn body<T: DeserializeOwned>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(v)| v).map_err(|rejection| VsmeError::Validation {
        message: rejection.body_text(),
    })
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(VsmeError::Validation {
            message: "disclosureId is required".to_string(),
        });
    }
    Ok(())
}

async fn persist(state: &AppState, auth: &ForwardedAuth, row: DisclosureResponse) {
    let Some(store) = state.store.as_ref() else {
        return;
    };
    if let Err(e) = store.upsert(&auth.0, &row).await {
        tracing::warn!(disclosure = %row.disclosure_id, error = %e, "failed to persist disclosure response");
    }
}

/// POST /generate-disclosure-response
pub async fn generate_disclosure_response(
    State(state): State<AppState>,
    Extension(auth): Extension<ForwardedAuth>,
    payload: std::result::Result<Json<DisclosureRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    require_id(&request.disclosure_id)?;
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        disclosure = %request.disclosure_id,
        metrics = request.metrics.len(),
        "generate disclosure response"
    );

    let params = state.config.model.params();
    let text = synthesis::synthesize(state.generator(), &request, &params).await?;

    if text != NO_DATA_MESSAGE {
        persist(
            &state,
            &auth,
            DisclosureResponse::with_content(&request.disclosure_id, text.clone()),
        )
        .await;
    }
    tracing::info!(%request_id, chars = text.len(), "disclosure response ready");
    Ok(Json(json!({ "generatedResponse": text })))
}

/// POST /generate-graphics-recommendations
pub async fn generate_graphics_recommendations(
    State(state): State<AppState>,
    Extension(auth): Extension<ForwardedAuth>,
    payload: std::result::Result<Json<GraphicsRequest>, JsonRejection>,
) -> Result<Json<GraphicsRecommendations>> {
    let request = body(payload)?;
    require_id(&request.disclosure_id)?;
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        disclosure = %request.disclosure_id,
        metrics = request.metrics.len(),
        all_metrics = request.all_metrics.len(),
        "generate graphics recommendations"
    );

    let mut recommendations =
        build_recommendations(&request.disclosure_id, &request.metrics, &request.all_metrics);
    if recommendations.has_charts {
        recommendations.contextual_analysis = synthesis::contextual_analysis(
            state.generator(),
            &request.disclosure_id,
            &request.disclosure_title,
            &recommendations,
            &state.config.model.params(),
        )
        .await;

        let graphics = serde_json::to_value(&recommendations)?;
        persist(
            &state,
            &auth,
            DisclosureResponse::with_graphics(&request.disclosure_id, graphics),
        )
        .await;
    }
    tracing::info!(
        %request_id,
        charts = recommendations.charts().len(),
        "graphics recommendations ready"
    );
    Ok(Json(recommendations))
}

/// GET /disclosures
pub async fn list_disclosures() -> impl IntoResponse {
    Json(catalog::DISCLOSURES.as_slice())
}
