mod error;
mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::agent::AgentRegistry;
use crate::core::coordinator::Coordinator;
use crate::core::lifecycle::LifecycleComponent;

pub struct ApiServerConfig {
    pub coordinator: Arc<Coordinator>,
    pub registry: Arc<AgentRegistry>,
    pub api_host: String,
    pub api_port: u16,
    pub dashboard_origins: Vec<String>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) registry: Arc<AgentRegistry>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
    pub(crate) dashboard_origins: Vec<String>,
}

pub struct ApiServer {
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: AppState {
                coordinator: config.coordinator,
                registry: config.registry,
                api_host: config.api_host,
                api_port: config.api_port,
                dashboard_origins: config.dashboard_origins,
            },
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.state.api_host, self.state.api_port)
    }
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server initializing...");
        let count = self.state.registry.reload().await;
        if count == 0 {
            warn!(
                "No agents found in {}; run `blindfold init` to create the standard roster files.",
                self.state.registry.agents_dir().display()
            );
        }
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding API server to {}", addr))?;
        let app = router::build_api_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        self.handle = Some(tokio::spawn(async move {
            info!("API Server running at http://{addr}");
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("API Server crashed: {}", e);
            }
        }));
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }
}
