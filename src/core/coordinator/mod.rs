use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::agent::{Agent, AgentRegistry};
use crate::core::broadcast::Broadcaster;
use crate::core::store::types::{
    AgentStatus, Communication, Feedback, Message, MessageKind, Priority, Proposal,
    ProposalStatus, Task, TaskStatus, new_record_id,
};
use crate::core::store::{Collection, RecordStore, StoreError};

/// Sender name used for coordinator-originated notifications.
pub const SYSTEM_SENDER: &str = "system";
const DEFAULT_APPROVER: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    Validation(String),
    #[error("proposal '{0}' not found")]
    ProposalNotFound(String),
    #[error("task '{0}' not found")]
    TaskNotFound(String),
    #[error("agent '{0}' is not registered")]
    AgentNotFound(String),
    #[error("proposal '{id}' was already {status}")]
    AlreadyDecided { id: String, status: ProposalStatus },
    #[error("task '{0}' is already completed")]
    TaskAlreadyCompleted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caller-supplied proposal fields. `priority` is the raw rank name.
#[derive(Debug, Clone, Default)]
pub struct ProposalDraft {
    pub task: String,
    pub reason: String,
    pub expected_outcome: String,
    pub priority: Option<String>,
}

impl ProposalDraft {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Thought {
    pub thought: String,
    pub timestamp: DateTime<Utc>,
    pub agent: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_agents: usize,
    pub active_agents: usize,
    pub pending_proposals: usize,
    pub completed_tasks: usize,
    pub success_rate: u32,
    pub uptime: String,
}

/// Proposals the coordinator can seed on behalf of the standard agents.
const AUTO_PROPOSALS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "Explorer Agent",
        "Investigar nuevas tendencias en IA",
        "Es importante mantenernos actualizados con las últimas tecnologías",
        "Reporte de tendencias con recomendaciones",
        "medium",
    ),
    (
        "Devops Engineer",
        "Revisar infraestructura de deployment",
        "Los últimos deploys tuvieron tiempos de build elevados",
        "Optimización de pipeline CI/CD",
        "high",
    ),
    (
        "Qa Automation Engineer",
        "Aumentar cobertura de tests en API",
        "La cobertura actual es del 72%, objetivo es 90%",
        "50+ nuevos tests unitarios",
        "medium",
    ),
    (
        "Code Archaeologist",
        "Refactorizar módulo de autenticación",
        "Código legacy con patrones obsoletos",
        "Código más mantenible y seguro",
        "low",
    ),
];

/// Owns the proposal and task state machines.
///
/// Proposals move `pending -> approved | rejected` exactly once; approval
/// spawns one `in_progress` task which moves to `completed` exactly once.
/// Every transition is persisted through the record store and announced
/// through the broadcaster.
pub struct Coordinator {
    store: Arc<RecordStore>,
    registry: Arc<AgentRegistry>,
    broadcaster: Broadcaster,
    started_at: DateTime<Utc>,
}

impl Coordinator {
    pub fn new(store: Arc<RecordStore>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            broadcaster: Broadcaster::new(store.clone()),
            store,
            registry,
            started_at: Utc::now(),
        }
    }

    /// Create a pending proposal attributed to `agent_name`. The author does
    /// not have to be registered.
    pub async fn create_proposal(
        &self,
        agent_name: &str,
        draft: ProposalDraft,
    ) -> Result<Proposal, CoordinatorError> {
        let agent_name = agent_name.trim();
        let task = draft.task.trim();
        if agent_name.is_empty() || task.is_empty() {
            return Err(CoordinatorError::Validation(
                "agentName and task are required".to_string(),
            ));
        }
        let priority = match draft.priority.as_deref() {
            None => Priority::default(),
            Some(raw) => Priority::parse(raw).ok_or_else(|| {
                CoordinatorError::Validation(format!(
                    "priority must be one of low, medium, high, critical (got '{}')",
                    raw
                ))
            })?,
        };

        let proposal = Proposal {
            id: new_record_id("prop"),
            agent: agent_name.to_string(),
            agent_id: crate::core::agent::agent_id(agent_name),
            task: task.to_string(),
            reason: draft.reason,
            expected_outcome: draft.expected_outcome,
            priority,
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            votes: Vec::new(),
            dependencies: Vec::new(),
        };

        let stored = proposal.clone();
        self.store
            .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                doc.insert(0, stored);
                Ok::<_, CoordinatorError>(())
            })
            .await?;

        self.broadcaster
            .broadcast(
                Message::new(&proposal.agent, MessageKind::Proposal, format!("Proposed: {}", proposal.task))
                    .with_proposal(&proposal.id),
            )
            .await?;

        info!(
            "Proposal {} created by {} ({})",
            proposal.id,
            proposal.agent,
            proposal.priority.as_str()
        );
        Ok(proposal)
    }

    /// Create a proposal through a registered agent.
    pub async fn propose_as_agent(
        &self,
        agent: &str,
        draft: ProposalDraft,
    ) -> Result<Proposal, CoordinatorError> {
        let agent = self.require_agent(agent).await?;
        self.create_proposal(&agent.name, draft).await
    }

    /// Decide a pending proposal. Approval spawns a task and marks the author active.
    pub async fn approve_proposal(
        &self,
        proposal_id: &str,
        approved: bool,
        approved_by: Option<&str>,
    ) -> Result<Proposal, CoordinatorError> {
        let proposal_id = proposal_id.trim();
        if proposal_id.is_empty() {
            return Err(CoordinatorError::Validation(
                "proposalId is required".to_string(),
            ));
        }
        let approver = approved_by
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_APPROVER)
            .to_string();

        let proposal = self
            .store
            .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                let pos = doc
                    .iter()
                    .position(|p| p.id == proposal_id)
                    .ok_or_else(|| CoordinatorError::ProposalNotFound(proposal_id.to_string()))?;
                if doc[pos].status != ProposalStatus::Pending {
                    return Err(CoordinatorError::AlreadyDecided {
                        id: proposal_id.to_string(),
                        status: doc[pos].status,
                    });
                }
                // Decided proposals move to the tail of the document.
                let mut proposal = doc.remove(pos);
                proposal.status = if approved {
                    ProposalStatus::Approved
                } else {
                    ProposalStatus::Rejected
                };
                proposal.approved_by = Some(approver);
                proposal.approved_at = Some(Utc::now());
                doc.push(proposal.clone());
                Ok(proposal)
            })
            .await?;

        if approved {
            let task = match self.spawn_task(&proposal).await {
                Ok(task) => task,
                Err(e) => {
                    warn!(
                        "Task for proposal {} could not be stored, reopening it: {}",
                        proposal.id, e
                    );
                    self.reopen_proposal(&proposal.id).await?;
                    return Err(e);
                }
            };
            self.broadcaster
                .broadcast(
                    Message::new(
                        SYSTEM_SENDER,
                        MessageKind::TaskAssigned,
                        format!("Your proposal was approved: {}", proposal.task),
                    )
                    .to(&proposal.agent)
                    .with_proposal(&proposal.id)
                    .with_task_id(&task.id),
                )
                .await?;
            self.registry
                .set_status(&proposal.agent, AgentStatus::Active, Some(task.task.clone()))
                .await?;
            info!(
                "Proposal {} approved by {}, task {} started",
                proposal.id,
                proposal.approved_by.as_deref().unwrap_or(DEFAULT_APPROVER),
                task.id
            );
        } else {
            self.broadcaster
                .broadcast(
                    Message::new(
                        SYSTEM_SENDER,
                        MessageKind::System,
                        format!("Proposal rejected: {}", proposal.task),
                    )
                    .to(&proposal.agent)
                    .with_proposal(&proposal.id),
                )
                .await?;
            info!("Proposal {} rejected", proposal.id);
        }

        Ok(proposal)
    }

    /// Undo a decision whose side effects failed: back to `pending`, placed
    /// among the pending proposals by creation time.
    async fn reopen_proposal(&self, proposal_id: &str) -> Result<(), CoordinatorError> {
        self.store
            .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                let Some(pos) = doc.iter().position(|p| p.id == proposal_id) else {
                    return Ok::<_, CoordinatorError>(());
                };
                let mut proposal = doc.remove(pos);
                proposal.status = ProposalStatus::Pending;
                proposal.approved_by = None;
                proposal.approved_at = None;
                let at = doc
                    .iter()
                    .position(|p| {
                        p.status != ProposalStatus::Pending || p.created_at < proposal.created_at
                    })
                    .unwrap_or(doc.len());
                doc.insert(at, proposal);
                Ok(())
            })
            .await
    }

    async fn spawn_task(&self, proposal: &Proposal) -> Result<Task, CoordinatorError> {
        let task = Task {
            id: new_record_id("task"),
            proposal_id: proposal.id.clone(),
            agent: proposal.agent.clone(),
            task: proposal.task.clone(),
            reason: proposal.reason.clone(),
            expected_outcome: proposal.expected_outcome.clone(),
            status: TaskStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        let stored = task.clone();
        self.store
            .update(Collection::Tasks, |doc: &mut Vec<Task>| {
                doc.insert(0, stored);
                Ok::<_, CoordinatorError>(())
            })
            .await?;
        Ok(task)
    }

    pub async fn complete_task(
        &self,
        task_id: &str,
        result: &str,
    ) -> Result<Task, CoordinatorError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(CoordinatorError::Validation("taskId is required".to_string()));
        }

        let task = self
            .store
            .update(Collection::Tasks, |doc: &mut Vec<Task>| {
                let task = doc
                    .iter_mut()
                    .find(|t| t.id == task_id)
                    .ok_or_else(|| CoordinatorError::TaskNotFound(task_id.to_string()))?;
                if task.status == TaskStatus::Completed {
                    return Err(CoordinatorError::TaskAlreadyCompleted(task_id.to_string()));
                }
                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                task.result = Some(result.to_string());
                Ok(task.clone())
            })
            .await?;

        self.broadcaster
            .broadcast(
                Message::new(
                    &task.agent,
                    MessageKind::TaskCompleted,
                    format!("Task completed: {}", task.task),
                )
                .with_task_id(&task.id)
                .with_result(result),
            )
            .await?;
        self.registry
            .set_status(&task.agent, AgentStatus::Idle, None)
            .await?;

        info!("Task {} completed by {}", task.id, task.agent);
        Ok(task)
    }

    pub async fn list_proposals(&self) -> Vec<Proposal> {
        self.store.proposals().await
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.tasks().await
    }

    pub async fn list_messages(&self) -> Communication {
        self.store.communication().await
    }

    pub async fn request_collaboration(
        &self,
        agent: &str,
        to: &str,
        task: &str,
    ) -> Result<Message, CoordinatorError> {
        let agent = self.require_agent(agent).await?;
        let (to, task) = (to.trim(), task.trim());
        if to.is_empty() || task.is_empty() {
            return Err(CoordinatorError::Validation("to and task are required".to_string()));
        }

        self.registry
            .set_status(&agent.id, AgentStatus::Collaborating, None)
            .await?;
        let message = self
            .broadcaster
            .broadcast(
                Message::new(
                    &agent.name,
                    MessageKind::CollaborationRequest,
                    format!("Can we work together on: {}?", task),
                )
                .to(to)
                .with_task(task),
            )
            .await?;
        info!("{} asked {} to collaborate", agent.name, to);
        Ok(message)
    }

    pub async fn give_feedback(
        &self,
        agent: &str,
        to: &str,
        about_task: &str,
        feedback: &str,
        rating: u8,
    ) -> Result<Feedback, CoordinatorError> {
        let agent = self.require_agent(agent).await?;
        let (to, feedback) = (to.trim(), feedback.trim());
        if to.is_empty() || feedback.is_empty() {
            return Err(CoordinatorError::Validation(
                "to and feedback are required".to_string(),
            ));
        }
        if !(1..=5).contains(&rating) {
            return Err(CoordinatorError::Validation(format!(
                "rating must be between 1 and 5 (got {})",
                rating
            )));
        }

        let record = self
            .broadcaster
            .record_feedback(Feedback {
                id: String::new(),
                from: agent.name.clone(),
                to: to.to_string(),
                about_task: about_task.trim().to_string(),
                feedback: feedback.to_string(),
                rating,
                timestamp: Utc::now(),
            })
            .await?;
        self.broadcaster
            .broadcast(
                Message::new(&agent.name, MessageKind::Feedback, feedback)
                    .to(to)
                    .with_rating(rating),
            )
            .await?;
        info!("{} rated {} {}/5", agent.name, to, rating);
        Ok(record)
    }

    /// Mark the agent as thinking and echo the topic back.
    pub async fn think(&self, agent: &str, about: &str) -> Result<Thought, CoordinatorError> {
        let agent = self.require_agent(agent).await?;
        self.registry
            .set_status(&agent.id, AgentStatus::Thinking, agent.current_task.clone())
            .await?;
        Ok(Thought {
            thought: about.to_string(),
            timestamp: Utc::now(),
            agent: agent.name,
        })
    }

    /// Create the standard starter proposals for whichever authors are registered.
    pub async fn seed_proposals(&self) -> Result<Vec<Proposal>, CoordinatorError> {
        let mut created = Vec::new();
        for (agent, task, reason, outcome, priority) in AUTO_PROPOSALS {
            if self.registry.get(agent).await.is_none() {
                debug!("Skipping seed proposal for unregistered agent '{}'", agent);
                continue;
            }
            let draft = ProposalDraft::new(*task)
                .reason(*reason)
                .expected_outcome(*outcome)
                .priority(*priority);
            created.push(self.propose_as_agent(agent, draft).await?);
        }
        info!("Seeded {} proposal(s)", created.len());
        Ok(created)
    }

    pub async fn stats(&self) -> Stats {
        let agents = self.registry.list().await;
        let proposals = self.store.proposals().await;
        let tasks = self.store.tasks().await;

        let completed_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let success_rate = if tasks.is_empty() {
            0
        } else {
            (completed_tasks * 100 / tasks.len()) as u32
        };

        Stats {
            total_agents: agents.len(),
            active_agents: agents
                .iter()
                .filter(|a| a.status != AgentStatus::Idle)
                .count(),
            pending_proposals: proposals
                .iter()
                .filter(|p| p.status == ProposalStatus::Pending)
                .count(),
            completed_tasks,
            success_rate,
            uptime: format_uptime(Utc::now() - self.started_at),
        }
    }

    async fn require_agent(&self, name_or_id: &str) -> Result<Agent, CoordinatorError> {
        self.registry
            .get(name_or_id)
            .await
            .ok_or_else(|| CoordinatorError::AgentNotFound(name_or_id.to_string()))
    }
}

/// `2h 15m` style; minutes only below an hour.
pub fn format_uptime(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests;
