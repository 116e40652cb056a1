//! Route modules for the transformer
//!
//! This module contains endpoint group-specific routers:
//! - instruments: Financial instrument read and reload endpoints
//! - health: Health check and good-to-go endpoints

pub mod health;
pub mod instruments;

use std::sync::Arc;

use axum::Router;
use infra_master::InstrumentTable;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::worker::LoadWorker;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Background loader owning the instrument table
    pub worker: LoadWorker,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Arc<ServiceConfig>, worker: LoadWorker) -> Self {
        Self {
            config,
            worker,
            start_time: std::time::Instant::now(),
        }
    }

    /// Instrument table served by the API
    pub fn table(&self) -> &InstrumentTable {
        self.worker.table()
    }
}

/// Build the main application router by merging all route modules
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(instruments::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use adapter_loader::InMemoryLoader;
    use infra_master::{DelimitedParser, LoadPipeline, ResourceNames};

    pub const FOLDER: &str = "2024-01-05";

    pub const COVERAGE: &str = "\
\"FSYM_ID\"|\"CURRENCY\"|\"PROPER_NAME\"|\"FSYM_PRIMARY_EQUITY_ID\"|\"FSYM_PRIMARY_LISTING_ID\"|\"ACTIVE_FLAG\"|\"FREF_SECURITY_TYPE\"|\"FREF_LISTING_EXCHANGE\"|\"LISTING_FLAG\"|\"REGIONAL_FLAG\"|\"SECURITY_FLAG\"|\"FREF_EXCHANGE_LOCATION_CODE\"|\"DR_FLAG\"|\"UNIVERSE_TYPE\"
\"ABCDEF-S\"|\"USD\"|\"Acme Corp\"|\"ABCDEF-S\"|\"ABCDEF-R\"|1|\"SHARE\"|\"\"|0|0|1|\"\"|0|\"EQ\"
\"ABCDEF-R\"|\"USD\"|\"Acme Corp\"|\"ABCDEF-S\"|\"ABCDEF-L\"|1|\"SHARE\"|\"\"|0|1|0|\"US\"|0|\"EQ\"
";
    pub const SEC_ENTITY: &str = "\"FSYM_ID\"|\"FACTSET_ENTITY_ID\"\n\"ABCDEF-S\"|\"MNBVCX-E\"\n";
    pub const FIGI: &str = "\"FSYM_ID\"|\"BBG_ID\"\n\"ABCDEF-L\"|\"BBG000ABCDEF\"\n";

    /// Identifier of `ABCDEF-S`
    pub const ACME_ID: &str = "fd0d50ba-7031-3ebf-a594-4806b65a74bd";
    /// Identifier of `MNBVCX-E`
    pub const ACME_ORG_ID: &str = "6f2a22e5-2fb6-304e-b92b-1438f306dc94";

    pub fn loader() -> InMemoryLoader {
        InMemoryLoader::new()
            .with_latest_folder(FOLDER)
            .with_resource(format!("{FOLDER}/sym_coverage.txt"), COVERAGE)
            .with_resource(format!("{FOLDER}/ent_scr_sec_entity.txt"), SEC_ENTITY)
            .with_resource(format!("{FOLDER}/sym_bbg.txt"), FIGI)
    }

    pub fn state_with(loader: InMemoryLoader, config: ServiceConfig) -> AppState {
        let pipeline = LoadPipeline::new(
            Arc::new(loader),
            Arc::new(DelimitedParser::default()),
            ResourceNames::default(),
        );
        let worker = LoadWorker::new(pipeline, Arc::new(InstrumentTable::new()));
        AppState::new(Arc::new(config), worker)
    }

    /// State whose table has not been loaded
    pub fn empty_state() -> AppState {
        state_with(loader(), ServiceConfig::default())
    }

    /// State whose table holds the Acme instrument
    pub async fn loaded_state() -> AppState {
        let state = empty_state();
        state.worker.trigger().unwrap().await.unwrap();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_merges_all_route_groups() {
        let router = build_router(loaded_state().await);

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/__gtg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/transformers/financial-instruments/__count")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let router = build_router(empty_state());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/unknown/path")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_app_state_config_access() {
        let config = ServiceConfig {
            port: 9999,
            ..Default::default()
        };
        let state = state_with(loader(), config);

        assert_eq!(state.config.port, 9999);
        assert!(!state.table().is_initialized());
    }
}
