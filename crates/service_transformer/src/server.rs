//! Server startup and binding
//!
//! Wires the resource loader, load pipeline and router together and serves
//! them with graceful shutdown.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use adapter_loader::{FsBucketLoader, HttpBucketLoader, ResourceLoader, ZipBundleLoader};
use axum::Router;
use infra_master::{DelimitedParser, InstrumentTable, LoadPipeline};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::{ConfigError, LoaderKind, ServiceConfig};
use crate::routes::{self, AppState};
use crate::worker::LoadWorker;

/// Server instance that can be started
pub struct Server {
    /// Service configuration
    config: Arc<ServiceConfig>,
    /// Background loader
    worker: LoadWorker,
    /// The built router
    router: Router,
}

impl Server {
    /// Create a new server reading extracts through the configured loader
    pub fn new(config: ServiceConfig) -> Self {
        let loader = configured_loader(&config);
        Self::with_loader(config, loader)
    }

    /// Create a new server reading extracts through `loader`
    pub fn with_loader(config: ServiceConfig, loader: Arc<dyn ResourceLoader>) -> Self {
        let parser = Arc::new(DelimitedParser::new(config.schema_layout()));
        let pipeline = LoadPipeline::new(loader, parser, config.resource_names());
        let worker = LoadWorker::new(pipeline, Arc::new(InstrumentTable::new()));

        let config = Arc::new(config);
        let router = routes::build_router(AppState::new(config.clone(), worker.clone()));

        Self {
            config,
            worker,
            router,
        }
    }

    /// Get the socket address the server will bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.config.socket_addr();
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Get the configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get the background loader
    pub fn worker(&self) -> &LoadWorker {
        &self.worker
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self
            .socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(addr).await?;

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific listener until Ctrl-C or SIGTERM
    ///
    /// This is useful for testing where you want to use a listener bound to port 0
    /// to get a random available port.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `signal` resolves
    ///
    /// In-flight requests get `shutdown_timeout_secs` to finish once the
    /// signal fires.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "Server listening");

        if self.config.load_on_start {
            self.worker.trigger();
        }

        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        let stopping = Arc::new(Notify::new());
        let graceful = {
            let stopping = Arc::clone(&stopping);
            async move {
                signal.await;
                stopping.notify_one();
            }
        };

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(graceful)
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => return result,
            () = stopping.notified() => {}
        }

        match tokio::time::timeout(timeout, serve).await {
            Ok(result) => {
                info!("Server stopped");
                result
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Shutdown timeout elapsed with open connections");
                Ok(())
            }
        }
    }

    /// Create a test server and return the bound address
    ///
    /// This binds to port 0 to get a random available port, starts the server
    /// in a background task, and returns the actual bound address.
    #[cfg(test)]
    pub async fn spawn_test_server(
        config: ServiceConfig,
        loader: adapter_loader::InMemoryLoader,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self::with_loader(config, Arc::new(loader));
        let handle = tokio::spawn(async move {
            server.run_with_listener(listener).await.ok();
        });

        // Give the server a moment to start
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        (addr, handle)
    }
}

/// Loader selected by `config`, unpacking zip bundles when enabled
fn configured_loader(config: &ServiceConfig) -> Arc<dyn ResourceLoader> {
    match (config.loader, config.bundle) {
        (LoaderKind::Fs, false) => Arc::new(FsBucketLoader::new(config.bucket_root.clone())),
        (LoaderKind::Fs, true) => Arc::new(ZipBundleLoader::new(FsBucketLoader::new(
            config.bucket_root.clone(),
        ))),
        (LoaderKind::Http, bundle) => {
            let loader =
                HttpBucketLoader::new(config.bucket_endpoint.clone(), config.bucket_name.clone());
            if bundle {
                Arc::new(ZipBundleLoader::new(loader))
            } else {
                Arc::new(loader)
            }
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
