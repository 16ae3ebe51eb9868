use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "blindfold.toml";

/// Written by `blindfold init`; every key shows its default.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"[server]
host = "127.0.0.1"
port = 3100
# Extra origins allowed to poll the API (the local host:port pair is always allowed).
dashboard_origins = ["http://localhost:3000"]

[storage]
data_dir = "data"

[agents]
dir = "agents"
roster = "roster.toml"
seed_on_start = false

[logging]
level = "info"
file = true
"#;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub dashboard_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// Relative paths resolve against the root directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentsConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub roster: Option<PathBuf>,

    #[serde(default)]
    pub seed_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_true")]
    pub file: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3100
}
fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dashboard_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: true,
        }
    }
}

impl AppConfig {
    pub async fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let config_path = root.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            info!("No {} found, using defaults.", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", config_path.display()))?;

        info!(
            "Loaded config: listen={}:{}, log_level={}",
            config.server.host, config.server.port, config.logging.level
        );
        Ok(config)
    }
}

/// Absolute locations derived from the root directory and the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub agents_dir: PathBuf,
    pub roster: PathBuf,
    pub log_file: PathBuf,
}

impl RootPaths {
    pub fn resolve(root: &Path, config: &AppConfig) -> Self {
        let under_root = |configured: &Option<PathBuf>, default: &str| match configured {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(default),
        };
        Self {
            root: root.to_path_buf(),
            data_dir: under_root(&config.storage.data_dir, "data"),
            agents_dir: under_root(&config.agents.dir, "agents"),
            roster: under_root(&config.agents.roster, "roster.toml"),
            log_file: root.join("run").join("blindfold.log"),
        }
    }
}
