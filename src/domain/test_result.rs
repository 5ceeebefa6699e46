//! Outcome of a live endpoint test. Advisory only; never stored with the config.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub endpoint_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Fully resolved URL the request went to, query string included
    pub request_url: String,
}

impl TestResult {
    pub fn failure(
        endpoint_id: impl Into<String>,
        request_url: impl Into<String>,
        error: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            success: false,
            status: None,
            data: None,
            error: Some(error.into()),
            response_time_ms,
            timestamp: Utc::now(),
            request_url: request_url.into(),
        }
    }
}
