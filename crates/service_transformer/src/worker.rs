//! Background load worker
//!
//! Runs the load pipeline off the request path. At most one load is in
//! flight; a trigger while a load runs is refused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adapter_loader::LoaderError;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use infra_master::{InstrumentTable, LoadError, LoadPipeline};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of the most recent load
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// When the load finished
    pub finished_at: DateTime<Utc>,
    /// Whether the table was replaced
    pub succeeded: bool,
    /// Instruments published by the load
    pub instruments: usize,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadReport {
    fn success(instruments: usize) -> Self {
        Self {
            finished_at: Utc::now(),
            succeeded: true,
            instruments,
            error: None,
        }
    }

    fn failure(error: &LoadError) -> Self {
        Self {
            finished_at: Utc::now(),
            succeeded: false,
            instruments: 0,
            error: Some(error.to_string()),
        }
    }
}

struct Inner {
    pipeline: LoadPipeline,
    table: Arc<InstrumentTable>,
    loading: AtomicBool,
    last: ArcSwapOption<LoadReport>,
}

/// Clears the in-flight flag even if the load task panics.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the single background loader, cheap to clone
#[derive(Clone)]
pub struct LoadWorker {
    inner: Arc<Inner>,
}

impl LoadWorker {
    pub fn new(pipeline: LoadPipeline, table: Arc<InstrumentTable>) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                table,
                loading: AtomicBool::new(false),
                last: ArcSwapOption::empty(),
            }),
        }
    }

    /// Table the worker publishes to
    pub fn table(&self) -> &Arc<InstrumentTable> {
        &self.inner.table
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<Arc<LoadReport>> {
        self.inner.last.load_full()
    }

    /// Start a load in the background.
    ///
    /// Returns `None` without starting anything when a load is already running.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        if self
            .inner
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Load already in progress, trigger ignored");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let _guard = LoadingGuard(&inner.loading);
            let report = match inner.pipeline.load_into(&inner.table).await {
                Ok(count) => LoadReport::success(count),
                Err(e) => LoadReport::failure(&e),
            };
            inner.last.store(Some(Arc::new(report)));
        }))
    }

    /// Whether the bucket behind the pipeline is reachable
    pub async fn check_connectivity(&self) -> Result<bool, LoaderError> {
        self.inner.pipeline.loader().bucket_exists().await
    }
}
