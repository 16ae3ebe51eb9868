use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deserializes case-insensitively; ranks outside the four known ones read
/// as `Medium` so a single odd record cannot fail the whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Priority::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Support,
    Oppose,
    Abstain,
}

/// Peer vote on a proposal. Kept for document compatibility; nothing casts votes yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVote {
    pub agent: String,
    pub vote: VoteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    pub agent: String,
    pub agent_id: String,
    pub task: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default)]
    pub priority: Priority,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: Vec<AgentVote>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub proposal_id: String,
    pub agent: String,
    pub task: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expected_outcome: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Proposal,
    CollaborationRequest,
    Feedback,
    TaskAssigned,
    TaskCompleted,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl Message {
    /// Unstamped message; the broadcaster assigns `id` and `timestamp`.
    pub fn new(from: impl Into<String>, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            from: from.into(),
            to: None,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            proposal_id: None,
            task_id: None,
            task: None,
            result: None,
            rating: None,
        }
    }

    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to = Some(recipient.into());
        self
    }

    pub fn with_proposal(mut self, proposal_id: impl Into<String>) -> Self {
        self.proposal_id = Some(proposal_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub from: String,
    pub to: String,
    pub about_task: String,
    pub feedback: String,
    pub rating: u8,
    pub timestamp: DateTime<Utc>,
}

/// The combined `agent-messages.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub feedbacks: Vec<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Active,
    Thinking,
    Collaborating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRuntimeState {
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub current_task: Option<String>,
    pub last_active: DateTime<Utc>,
}

/// The `agents-state.json` document, keyed by agent id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateDoc {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentRuntimeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Time-ordered record id with a kind prefix, e.g. `prop_0192…`.
pub fn new_record_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::now_v7().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parse_accepts_the_four_ranks() {
        assert_eq!(Priority::parse("low"), Some(Priority::Low));
        assert_eq!(Priority::parse(" High "), Some(Priority::High));
        assert_eq!(Priority::parse("CRITICAL"), Some(Priority::Critical));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn proposal_uses_camel_case_wire_names() {
        let proposal = Proposal {
            id: "prop_1".to_string(),
            agent: "Explorer Agent".to_string(),
            agent_id: "explorer_agent".to_string(),
            task: "t".to_string(),
            reason: String::new(),
            expected_outcome: "o".to_string(),
            priority: Priority::High,
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            votes: Vec::new(),
            dependencies: Vec::new(),
        };
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["agentId"], "explorer_agent");
        assert_eq!(json["expectedOutcome"], "o");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "pending");
        assert!(json.get("approvedBy").is_none());
    }

    #[test]
    fn message_kind_serializes_under_type() {
        let msg = Message::new("system", MessageKind::TaskAssigned, "hello").to("Debugger");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "task_assigned");
        assert_eq!(json["to"], "Debugger");
    }

    #[test]
    fn legacy_proposal_without_optional_fields_parses() {
        let raw = r#"{
            "id": "prop_1700000000000",
            "agent": "Debugger",
            "agentId": "debugger",
            "task": "Fix flaky test",
            "status": "approved",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "approvedBy": "user",
            "approvedAt": "2024-05-01T10:05:00.000Z"
        }"#;
        let proposal: Proposal = serde_json::from_str(raw).unwrap();
        assert_eq!(proposal.priority, Priority::Medium);
        assert_eq!(proposal.status, ProposalStatus::Approved);
        assert!(proposal.votes.is_empty());
    }

    #[test]
    fn unknown_or_null_priority_reads_as_medium() {
        let base = r#"{
            "id": "prop_1", "agent": "Debugger", "agentId": "debugger",
            "task": "t", "status": "pending",
            "createdAt": "2024-05-01T10:00:00.000Z", "priority": PRIORITY
        }"#;
        for (raw, expected) in [
            ("\"urgent\"", Priority::Medium),
            ("null", Priority::Medium),
            ("\"HIGH\"", Priority::High),
        ] {
            let proposal: Proposal = serde_json::from_str(&base.replace("PRIORITY", raw)).unwrap();
            assert_eq!(proposal.priority, expected, "priority {}", raw);
        }
    }

    #[test]
    fn message_without_id_parses() {
        let raw = r#"{
            "from": "Explorer Agent",
            "type": "proposal",
            "content": "Propuesta: Investigar tendencias",
            "proposalId": "prop_1700000000000",
            "timestamp": "2024-05-01T10:00:00.000Z"
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert!(msg.id.is_empty());
        assert_eq!(msg.kind, MessageKind::Proposal);
        assert_eq!(msg.proposal_id.as_deref(), Some("prop_1700000000000"));
    }

    #[test]
    fn record_ids_are_prefixed_and_distinct() {
        let a = new_record_id("task");
        let b = new_record_id("task");
        assert!(a.starts_with("task_"));
        assert_ne!(a, b);
    }
}
