
use std::sync::Arc;

use crate::core::agent::{AgentRegistry, Roster, write_agent_files};
use crate::core::coordinator::Coordinator;
use crate::core::store::{RecordStore, test_store};

pub(super) const STANDARD_AGENT_FILES: &[&str] = &[
    "explorer-agent",
    "devops-engineer",
    "qa-automation-engineer",
    "code-archaeologist",
    "debugger",
];

pub(super) struct Harness {
    pub _tmp: tempfile::TempDir,
    pub store: Arc<RecordStore>,
    pub registry: Arc<AgentRegistry>,
    pub coordinator: Coordinator,
}

pub(super) async fn harness_with_agents(stems: &[&str]) -> Harness {
    let (tmp, store) = test_store().await;
    let agents_dir = tmp.path().join("agents");
    write_agent_files(&agents_dir, stems);
    let registry = Arc::new(AgentRegistry::new(agents_dir, Roster::builtin(), store.clone()));
    registry.reload().await;
    let coordinator = Coordinator::new(store.clone(), registry.clone());
    Harness {
        _tmp: tmp,
        store,
        registry,
        coordinator,
    }
}

pub(super) async fn harness() -> Harness {
    harness_with_agents(STANDARD_AGENT_FILES).await
}
