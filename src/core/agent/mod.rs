mod roster;

pub use roster::{ProfileSpec, Roster};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::store::types::{AgentRuntimeState, AgentStateDoc, AgentStatus};
use crate::core::store::{Collection, RecordStore, StoreError};

/// Stable agent id: lowercase display name with whitespace runs joined by `_`.
pub fn agent_id(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// `qa-automation-engineer.md` -> `Qa Automation Engineer`.
pub fn display_name_from_file(stem: &str) -> String {
    stem.replace('-', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Role metadata of a registered agent. Agents whose id has no roster entry
/// are kept as `Unknown` and report the generic profile.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentProfile {
    Configured(ProfileSpec),
    Unknown,
}

const UNKNOWN_ROLE: &str = "AI Agent";
const UNKNOWN_DESCRIPTION: &str = "Specialized agent";
const UNKNOWN_COLOR: &str = "#00d4ff";

impl AgentProfile {
    pub fn role(&self) -> &str {
        match self {
            AgentProfile::Configured(spec) => &spec.role,
            AgentProfile::Unknown => UNKNOWN_ROLE,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            AgentProfile::Configured(spec) => &spec.description,
            AgentProfile::Unknown => UNKNOWN_DESCRIPTION,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            AgentProfile::Configured(spec) => &spec.color,
            AgentProfile::Unknown => UNKNOWN_COLOR,
        }
    }

    pub fn capabilities(&self) -> &[String] {
        match self {
            AgentProfile::Configured(spec) => &spec.capabilities,
            AgentProfile::Unknown => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentProfile::Configured(_) => "configured",
            AgentProfile::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub profile: AgentProfile,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub last_active: DateTime<Utc>,
}

/// Wire shape of an agent in `GET /agents`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub profile: &'static str,
    pub status: AgentStatus,
    pub color: String,
    pub capabilities: Vec<String>,
    pub current_task: Option<String>,
    pub last_active: DateTime<Utc>,
    pub suggestion_count: usize,
}

/// Known agents, built from the agent-description directory and the roster.
///
/// The in-memory map is rebuilt only by `reload`. Status, current task and
/// last-active time live in the agent-state document, so they survive both
/// reloads and restarts.
pub struct AgentRegistry {
    agents_dir: PathBuf,
    roster: Roster,
    store: Arc<RecordStore>,
    agents: RwLock<BTreeMap<String, Agent>>,
}

impl AgentRegistry {
    pub fn new(agents_dir: PathBuf, roster: Roster, store: Arc<RecordStore>) -> Self {
        Self {
            agents_dir,
            roster,
            store,
            agents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    /// Rescan the description directory and rebuild the map. Returns the agent count.
    pub async fn reload(&self) -> usize {
        let names = scan_agent_names(&self.agents_dir).await;
        let persisted = self.store.agent_state().await;

        let mut rebuilt = BTreeMap::new();
        for name in names {
            let id = agent_id(&name);
            let profile = match self.roster.get(&id) {
                Some(spec) => AgentProfile::Configured(spec.clone()),
                None => {
                    debug!("Agent '{}' has no roster profile", name);
                    AgentProfile::Unknown
                }
            };
            let runtime = persisted.agents.get(&id);
            rebuilt.insert(
                id.clone(),
                Agent {
                    id,
                    name,
                    profile,
                    status: runtime.map(|r| r.status).unwrap_or_default(),
                    current_task: runtime.and_then(|r| r.current_task.clone()),
                    last_active: runtime.map(|r| r.last_active).unwrap_or_else(Utc::now),
                },
            );
        }

        let count = rebuilt.len();
        *self.agents.write().await = rebuilt;
        info!(
            "Agent registry loaded {} agent(s) from {}",
            count,
            self.agents_dir.display()
        );
        count
    }

    /// Look up by id or display name.
    pub async fn get(&self, name_or_id: &str) -> Option<Agent> {
        let agents = self.agents.read().await;
        agents
            .get(name_or_id)
            .or_else(|| agents.get(&agent_id(name_or_id)))
            .cloned()
    }

    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn list_agents(&self) -> Vec<AgentSummary> {
        let proposals = self.store.proposals().await;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for proposal in &proposals {
            *counts.entry(proposal.agent.as_str()).or_default() += 1;
        }

        self.list()
            .await
            .into_iter()
            .map(|agent| AgentSummary {
                suggestion_count: counts.get(agent.name.as_str()).copied().unwrap_or(0),
                role: agent.profile.role().to_string(),
                description: agent.profile.description().to_string(),
                profile: agent.profile.kind(),
                color: agent.profile.color().to_string(),
                capabilities: agent.profile.capabilities().to_vec(),
                id: agent.id,
                name: agent.name,
                status: agent.status,
                current_task: agent.current_task,
                last_active: agent.last_active,
            })
            .collect()
    }

    /// Persist a status transition. Unregistered agents are skipped and yield `None`.
    pub async fn set_status(
        &self,
        name_or_id: &str,
        status: AgentStatus,
        current_task: Option<String>,
    ) -> Result<Option<Agent>, StoreError> {
        let Some(agent) = self.get(name_or_id).await else {
            debug!("Skipping status update for unregistered agent '{}'", name_or_id);
            return Ok(None);
        };

        let now = Utc::now();
        let runtime = AgentRuntimeState {
            status,
            current_task: current_task.clone(),
            last_active: now,
        };
        let id = agent.id.clone();
        self.store
            .update(Collection::AgentState, |doc: &mut AgentStateDoc| {
                doc.agents.insert(id, runtime);
                doc.updated_at = Some(now);
                Ok::<_, StoreError>(())
            })
            .await?;

        let mut agents = self.agents.write().await;
        let updated = agents.get_mut(&agent.id).map(|entry| {
            entry.status = status;
            entry.current_task = current_task;
            entry.last_active = now;
            entry.clone()
        });
        Ok(updated)
    }
}

async fn scan_agent_names(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Agent directory {} unavailable: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let name = display_name_from_file(stem);
                    if !name.is_empty() {
                        names.push(name);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped scanning {}: {}", dir.display(), e);
                break;
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
pub(crate) fn write_agent_files(dir: &Path, stems: &[&str]) {
    std::fs::create_dir_all(dir).expect("create agents dir");
    for stem in stems {
        std::fs::write(dir.join(format!("{}.md", stem)), "# agent\n").expect("write agent file");
    }
}
