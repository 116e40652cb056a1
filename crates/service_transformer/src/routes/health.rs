//! Health check and good-to-go endpoints
//!
//! Both endpoints probe the bucket behind the load pipeline.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;

use super::AppState;
use crate::worker::LoadReport;

/// Name of the bucket connectivity check
pub const BUCKET_CHECK: &str = "bucket-connectivity";

/// Health check response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Whether every check passed
    pub ok: bool,
    /// Service version
    pub version: String,
    /// Service uptime in seconds
    pub uptime_secs: u64,
    /// Individual checks
    pub checks: Vec<HealthCheck>,
    /// State of the instrument table
    pub instruments: InstrumentStatus,
    /// Outcome of the most recent load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_load: Option<LoadReport>,
}

/// One dependency check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    pub ok: bool,
    /// What fails when this check does
    pub business_impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Instrument table status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentStatus {
    pub initialized: bool,
    pub count: usize,
    pub loading: bool,
}

/// Build the health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/__health", get(health_handler))
        .route("/__gtg", get(gtg_handler))
}

async fn bucket_check(state: &AppState) -> HealthCheck {
    let (ok, message) = match state.worker.check_connectivity().await {
        Ok(true) => (true, None),
        Ok(false) => (false, Some("Bucket does not exist".to_string())),
        Err(e) => (false, Some(e.to_string())),
    };
    HealthCheck {
        name: BUCKET_CHECK.to_string(),
        ok,
        business_impact: "Financial instruments cannot be reloaded".to_string(),
        message,
    }
}

/// GET /__health - Health report
///
/// Always answers 200; failing checks are reported in the body.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let check = bucket_check(&state).await;
    let table = state.table();

    let response = HealthResponse {
        ok: check.ok,
        version: crate::VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        checks: vec![check],
        instruments: InstrumentStatus {
            initialized: table.is_initialized(),
            count: table.count(),
            loading: state.worker.is_loading(),
        },
        last_load: state.worker.last_report().map(|report| (*report).clone()),
    };

    (StatusCode::OK, Json(response))
}

/// GET /__gtg - Good-to-go probe
///
/// Returns 200 OK while the bucket is reachable, 503 otherwise.
async fn gtg_handler(State(state): State<AppState>) -> impl IntoResponse {
    let check = bucket_check(&state).await;
    if check.ok {
        (StatusCode::OK, "OK".to_string())
    } else {
        let message = check.message.unwrap_or_default();
        tracing::warn!(check = BUCKET_CHECK, %message, "Good-to-go check failed");
        (StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::ServiceConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = routes()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_before_first_load() {
        let (status, health) = get_json(empty_state(), "/__health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["ok"], true);
        assert_eq!(health["version"], crate::VERSION);
        assert_eq!(health["checks"][0]["name"], BUCKET_CHECK);
        assert_eq!(health["instruments"]["initialized"], false);
        assert_eq!(health["instruments"]["count"], 0);
        assert!(health.get("lastLoad").is_none());
    }

    #[tokio::test]
    async fn test_health_after_load() {
        let (_, health) = get_json(loaded_state().await, "/__health").await;

        assert_eq!(health["instruments"]["initialized"], true);
        assert_eq!(health["instruments"]["count"], 1);
        assert_eq!(health["instruments"]["loading"], false);
        assert_eq!(health["lastLoad"]["succeeded"], true);
        assert_eq!(health["lastLoad"]["instruments"], 1);
        assert!(health.get("uptimeSecs").is_some());
    }

    #[tokio::test]
    async fn test_health_reports_missing_bucket() {
        let state = state_with(loader().unavailable(), ServiceConfig::default());
        let (status, health) = get_json(state, "/__health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["ok"], false);
        assert_eq!(health["checks"][0]["ok"], false);
        assert_eq!(health["checks"][0]["message"], "Bucket does not exist");
    }

    #[tokio::test]
    async fn test_gtg() {
        let response = routes()
            .with_state(empty_state())
            .oneshot(Request::builder().uri("/__gtg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let state = state_with(loader().unavailable(), ServiceConfig::default());
        let response = routes()
            .with_state(state)
            .oneshot(Request::builder().uri("/__gtg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
