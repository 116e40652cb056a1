//! Financial instrument endpoints
//!
//! Every read works on one table generation taken at the start of the
//! request, so streamed responses never mix two loads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::stream::{self, StreamExt};
use infra_master::{FinancialInstrument, InstrumentMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;

/// Path prefix of the instrument API
pub const BASE_PATH: &str = "/transformers/financial-instruments";

/// Line of the `__ids` stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdEntry {
    pub id: String,
}

/// Line of the listing stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUrlEntry {
    pub api_url: String,
}

/// Alternative identifiers of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeIdentifiers {
    pub uuids: Vec<String>,
    pub factset_identifier: String,
    pub figi_code: String,
}

/// Public representation of a financial instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentResponse {
    pub uuid: String,
    pub pref_label: String,
    pub alternative_identifiers: AlternativeIdentifiers,
    pub issued_by: String,
}

impl From<FinancialInstrument> for InstrumentResponse {
    fn from(instrument: FinancialInstrument) -> Self {
        Self {
            alternative_identifiers: AlternativeIdentifiers {
                uuids: vec![instrument.id.clone()],
                factset_identifier: instrument.security_id,
                figi_code: instrument.figi_code,
            },
            uuid: instrument.id,
            pref_label: instrument.security_name,
            issued_by: instrument.org_id,
        }
    }
}

/// Reload acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub message: String,
}

/// Build the instrument routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(BASE_PATH, get(list_handler))
        .route(&format!("{BASE_PATH}/__count"), get(count_handler))
        .route(&format!("{BASE_PATH}/__ids"), get(ids_handler))
        .route(&format!("{BASE_PATH}/__reload"), post(reload_handler))
        .route(&format!("{BASE_PATH}/{{id}}"), get(instrument_handler))
}

fn snapshot(state: &AppState) -> Result<Arc<InstrumentMap>, ApiError> {
    state.table().snapshot().ok_or(ApiError::NotInitialized)
}

/// Stream `items` as newline-delimited JSON
fn ndjson<T>(items: Vec<T>) -> Response
where
    T: Serialize + Send + 'static,
{
    let lines = stream::iter(items).map(|item| {
        serde_json::to_string(&item).map(|mut line| {
            line.push('\n');
            line
        })
    });

    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// GET /transformers/financial-instruments/__count
async fn count_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(snapshot(&state)?.len().to_string())
}

/// GET /transformers/financial-instruments/__ids
async fn ids_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let instruments = snapshot(&state)?;
    let ids = instruments
        .keys()
        .map(|id| IdEntry { id: id.clone() })
        .collect();
    Ok(ndjson::<IdEntry>(ids))
}

/// GET /transformers/financial-instruments
async fn list_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let instruments = snapshot(&state)?;
    let base_url = &state.config.base_url;
    let urls = instruments
        .keys()
        .map(|id| ApiUrlEntry {
            api_url: format!("{base_url}{id}"),
        })
        .collect();
    Ok(ndjson::<ApiUrlEntry>(urls))
}

/// GET /transformers/financial-instruments/{id}
async fn instrument_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InstrumentResponse>, ApiError> {
    let instruments = snapshot(&state)?;
    match instruments.get(&id) {
        Some(instrument) => Ok(Json(instrument.clone().into())),
        None => Err(ApiError::NotFound(id)),
    }
}

/// POST /transformers/financial-instruments/__reload
async fn reload_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if state.worker.trigger().is_none() {
        return Err(ApiError::LoadInProgress);
    }
    tracing::info!("Reload requested");
    let response = ReloadResponse {
        message: "Reload started".to_string(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}
