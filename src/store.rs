//! Persistence of generated disclosure responses.
//!
//! Rows are keyed by (owner, disclosure id) and written with last-write-wins
//! upserts. Fields left as `None` keep whatever the row already holds, so the
//! text and the chart recommendations can be saved independently.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::StoreConfig;
use crate::error::{Result, VsmeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureResponse {
    pub disclosure_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphics_recommendations: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl DisclosureResponse {
    pub fn with_content(disclosure_id: &str, content: impl Into<String>) -> Self {
        Self {
            disclosure_id: disclosure_id.trim().to_ascii_uppercase(),
            content: Some(content.into()),
            graphics_recommendations: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_graphics(disclosure_id: &str, graphics: Value) -> Self {
        Self {
            disclosure_id: disclosure_id.trim().to_ascii_uppercase(),
            content: None,
            graphics_recommendations: Some(graphics),
            updated_at: Utc::now(),
        }
    }

    fn merge(&mut self, newer: &DisclosureResponse) {
        if let Some(content) = &newer.content {
            self.content = Some(content.clone());
        }
        if let Some(graphics) = &newer.graphics_recommendations {
            self.graphics_recommendations = Some(graphics.clone());
        }
        self.updated_at = newer.updated_at;
    }
}

#[async_trait]
pub trait DisclosureStore: Send + Sync {
    /// Insert or merge the row for (`authorization`'s owner, disclosure id).
    async fn upsert(&self, authorization: &str, response: &DisclosureResponse) -> Result<()>;
}

/// Process-local store, keyed by the raw authorization value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(String, String), DisclosureResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, authorization: &str, disclosure_id: &str) -> Option<DisclosureResponse> {
        let key = (authorization.to_string(), disclosure_id.trim().to_ascii_uppercase());
        self.rows.lock().ok()?.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DisclosureStore for MemoryStore {
    async fn upsert(&self, authorization: &str, response: &DisclosureResponse) -> Result<()> {
        let mut rows = self.rows.lock().map_err(|_| VsmeError::Store {
            message: "memory store lock poisoned".to_string(),
        })?;
        let key = (authorization.to_string(), response.disclosure_id.clone());
        rows.entry(key)
            .and_modify(|row| row.merge(response))
            .or_insert_with(|| response.clone());
        Ok(())
    }
}

/// PostgREST-compatible store. The caller's authorization header is forwarded
/// so row-level security decides the owner.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
}

impl RestStore {
    pub fn new(cfg: &StoreConfig, url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| VsmeError::Config {
                message: format!("failed to build store client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            table: cfg.table.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict=disclosure_id,user_id",
            self.base_url, self.table
        )
    }
}

/// Row body in the store's snake_case column naming; absent fields are omitted.
pub fn row_body(response: &DisclosureResponse) -> Value {
    let mut row = Map::new();
    row.insert("disclosure_id".to_string(), json!(response.disclosure_id));
    if let Some(content) = &response.content {
        row.insert("content".to_string(), json!(content));
    }
    if let Some(graphics) = &response.graphics_recommendations {
        row.insert("graphics_recommendations".to_string(), graphics.clone());
    }
    row.insert("updated_at".to_string(), json!(response.updated_at.to_rfc3339()));
    Value::Object(row)
}

#[async_trait]
impl DisclosureStore for RestStore {
    async fn upsert(&self, authorization: &str, response: &DisclosureResponse) -> Result<()> {
        let mut req = self
            .client
            .post(self.endpoint())
            .header("Authorization", authorization)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row_body(response));
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }

        let resp = req.send().await.map_err(|e| VsmeError::Store {
            message: format!("store request failed: {}", e),
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VsmeError::Store {
                message: format!("store returned {}: {}", status, body),
            });
        }
        tracing::debug!(disclosure = %response.disclosure_id, table = %self.table, "disclosure response stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_merges_columns() {
        let store = MemoryStore::new();
        store
            .upsert("Bearer a", &DisclosureResponse::with_content("b3", "First draft"))
            .await
            .unwrap();
        store
            .upsert(
                "Bearer a",
                &DisclosureResponse::with_graphics("B3", json!({"hasCharts": true})),
            )
            .await
            .unwrap();
        let row = store.get("Bearer a", "B3").unwrap();
        assert_eq!(row.content.as_deref(), Some("First draft"));
        assert_eq!(row.graphics_recommendations, Some(json!({"hasCharts": true})));

        store
            .upsert("Bearer a", &DisclosureResponse::with_content("B3", "Second draft"))
            .await
            .unwrap();
        let row = store.get("Bearer a", "B3").unwrap();
        assert_eq!(row.content.as_deref(), Some("Second draft"));
        assert!(row.graphics_recommendations.is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_separates_owners() {
        let store = MemoryStore::new();
        store
            .upsert("Bearer a", &DisclosureResponse::with_content("B1", "A"))
            .await
            .unwrap();
        store
            .upsert("Bearer b", &DisclosureResponse::with_content("B1", "B"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("Bearer b", "b1").unwrap().content.as_deref(), Some("B"));
    }

    #[test]
    fn test_row_body_omits_absent_columns() {
        let row = row_body(&DisclosureResponse::with_content("B2", "text"));
        assert_eq!(row["disclosure_id"], "B2");
        assert_eq!(row["content"], "text");
        assert!(row.get("graphics_recommendations").is_none());
        assert!(row["updated_at"].is_string());
    }

    #[test]
    fn test_rest_endpoint() {
        let cfg = StoreConfig {
            table: "disclosure_responses".to_string(),
            ..Default::default()
        };
        let store = RestStore::new(&cfg, "https://db.example.com/").unwrap();
        assert_eq!(
            store.endpoint(),
            "https://db.example.com/rest/v1/disclosure_responses?on_conflict=disclosure_id,user_id"
        );
    }
}
