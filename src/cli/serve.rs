use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::ServeFlags;
use crate::core::agent::{AgentRegistry, Roster};
use crate::core::config::{AppConfig, RootPaths};
use crate::core::coordinator::Coordinator;
use crate::core::lifecycle::LifecycleManager;
use crate::core::store::{RecordStore, WriterLock};
use crate::core::terminal::{self, GuideSection, print_link, print_warn};
use crate::interfaces::web::{ApiServer, ApiServerConfig};
use crate::logging::init_tracing;

/// CLI flags win over `blindfold.toml`.
pub(crate) fn apply_overrides(config: &mut AppConfig, flags: &ServeFlags) {
    if let Some(host) = &flags.host {
        config.server.host = host.clone();
    }
    if let Some(port) = flags.port {
        config.server.port = port;
    }
    if flags.seed {
        config.agents.seed_on_start = true;
    }
}

pub async fn run_server(root: PathBuf, flags: ServeFlags) -> Result<()> {
    tokio::fs::create_dir_all(&root)
        .await
        .with_context(|| format!("creating root directory {}", root.display()))?;

    let mut config = AppConfig::load(&root).await?;
    apply_overrides(&mut config, &flags);
    let paths = RootPaths::resolve(&root, &config);

    let log_file = config.logging.file.then_some(paths.log_file.as_path());
    init_tracing(&config.logging.level, log_file)?;
    terminal::print_banner();
    info!("Starting blindfold from {}", paths.root.display());

    let store = Arc::new(
        RecordStore::open(&paths.data_dir)
            .await
            .with_context(|| format!("opening data directory {}", paths.data_dir.display()))?,
    );
    let roster = Roster::load(&paths.roster).await?;
    let registry = Arc::new(AgentRegistry::new(
        paths.agents_dir.clone(),
        roster,
        store.clone(),
    ));
    let coordinator = Arc::new(Coordinator::new(store.clone(), registry.clone()));

    let api = ApiServer::new(ApiServerConfig {
        coordinator: coordinator.clone(),
        registry: registry.clone(),
        api_host: config.server.host.clone(),
        api_port: config.server.port,
        dashboard_origins: config.server.dashboard_origins.clone(),
    });
    let address = api.address();

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(WriterLock::new(&paths.data_dir))));
    lifecycle.attach(Arc::new(Mutex::new(api)));
    lifecycle.start().await?;

    if config.agents.seed_on_start {
        let seeded = coordinator.seed_proposals().await?;
        if seeded.is_empty() {
            print_warn("Seeding skipped: none of the starter agents are registered.");
        }
    }

    let agent_count = registry.list().await.len();
    GuideSection::new("Mission Control")
        .status("Status", &style("RUNNING").green().bold().to_string())
        .status("Data", &paths.data_dir.display().to_string())
        .status(
            "Agents",
            &format!("{} from {}", agent_count, paths.agents_dir.display()),
        )
        .blank()
        .info("Press Ctrl+C to stop the server.")
        .print();
    print_link("API", &format!("http://{}", address));
    println!();

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}
