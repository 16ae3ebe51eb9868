use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

use super::agent_id;

/// Role metadata for a configured agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub color: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse roster {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("roster entry '{name}' has id '{id}', expected '{expected}'")]
    IdMismatch {
        name: String,
        id: String,
        expected: String,
    },
    #[error("roster id '{0}' is defined more than once")]
    DuplicateId(String),
    #[error("roster entry '{0}' has an empty role")]
    EmptyRole(String),
    #[error("roster entry '{id}' has invalid color '{color}' (expected #rrggbb)")]
    InvalidColor { id: String, color: String },
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default, rename = "agent")]
    agents: Vec<ProfileSpec>,
}

/// Validated profile table keyed by stable agent id.
#[derive(Debug, Clone)]
pub struct Roster {
    profiles: BTreeMap<String, ProfileSpec>,
}

type BuiltinEntry = (&'static str, &'static str, &'static str, &'static str, &'static [&'static str]);

const BUILTIN_PROFILES: &[BuiltinEntry] = &[
    (
        "Orchestrator",
        "AI Orchestrator",
        "Coordinates several agents on complex work",
        "#ff3366",
        &["coordination", "planning", "delegation"],
    ),
    (
        "Frontend Specialist",
        "Frontend Developer",
        "React, Vue and modern web frameworks",
        "#00d4ff",
        &["react", "vue", "css", "ui_ux"],
    ),
    (
        "Backend Specialist",
        "Backend Developer",
        "APIs and server-side development",
        "#00d4ff",
        &["node", "python", "apis", "databases"],
    ),
    (
        "Database Architect",
        "Database Designer",
        "Database design and tuning",
        "#10b981",
        &["sql", "nosql", "optimization", "schema"],
    ),
    (
        "Devops Engineer",
        "DevOps Specialist",
        "CI/CD and infrastructure",
        "#f59e0b",
        &["docker", "kubernetes", "ci_cd", "cloud"],
    ),
    (
        "Penetration Tester",
        "Security Expert",
        "Security testing",
        "#ff3366",
        &["security", "penetration", "audit", "compliance"],
    ),
    (
        "Qa Automation Engineer",
        "QA Engineer",
        "Automated testing",
        "#10b981",
        &["testing", "automation", "quality", "coverage"],
    ),
    (
        "Code Archaeologist",
        "Code Analyst",
        "Legacy code analysis",
        "#a855f7",
        &["refactoring", "legacy", "analysis", "documentation"],
    ),
    (
        "Performance Optimizer",
        "Performance Engineer",
        "Performance tuning",
        "#f59e0b",
        &["optimization", "profiling", "caching", "speed"],
    ),
    (
        "Product Owner",
        "Product Manager",
        "Product strategy",
        "#ec4899",
        &["strategy", "requirements", "roadmap", "prioritization"],
    ),
    (
        "Project Planner",
        "Project Manager",
        "Project management",
        "#8b5cf6",
        &["planning", "tracking", "coordination", "reporting"],
    ),
    (
        "Documentation Writer",
        "Technical Writer",
        "Technical documentation",
        "#6b7280",
        &["documentation", "writing", "clarity", "structure"],
    ),
    (
        "Mobile Developer",
        "App Developer",
        "Mobile development",
        "#06b6d4",
        &["ios", "android", "react_native", "flutter"],
    ),
    (
        "Game Developer",
        "Game Engineer",
        "Game development",
        "#22c55e",
        &["unity", "unreal", "game_design", "physics"],
    ),
    (
        "Debugger",
        "Bug Hunter",
        "Bug detection",
        "#ef4444",
        &["debugging", "troubleshooting", "root_cause", "fixing"],
    ),
    (
        "Explorer Agent",
        "Researcher",
        "Research",
        "#a855f7",
        &["research", "analysis", "summarization", "trends"],
    ),
];

impl Roster {
    pub fn builtin() -> Self {
        let profiles = BUILTIN_PROFILES
            .iter()
            .map(|(name, role, description, color, caps)| {
                let spec = ProfileSpec {
                    id: agent_id(name),
                    name: name.to_string(),
                    role: role.to_string(),
                    description: description.to_string(),
                    color: color.to_string(),
                    capabilities: caps.iter().map(|c| c.to_string()).collect(),
                };
                (spec.id.clone(), spec)
            })
            .collect();
        Self { profiles }
    }

    pub fn from_specs(specs: Vec<ProfileSpec>) -> Result<Self, RosterError> {
        let mut seen = HashSet::new();
        let mut profiles = BTreeMap::new();
        for spec in specs {
            let expected = agent_id(&spec.name);
            if spec.id != expected {
                return Err(RosterError::IdMismatch {
                    name: spec.name,
                    id: spec.id,
                    expected,
                });
            }
            if !seen.insert(spec.id.clone()) {
                return Err(RosterError::DuplicateId(spec.id));
            }
            if spec.role.trim().is_empty() {
                return Err(RosterError::EmptyRole(spec.id));
            }
            if !is_hex_color(&spec.color) {
                return Err(RosterError::InvalidColor {
                    id: spec.id,
                    color: spec.color,
                });
            }
            profiles.insert(spec.id.clone(), spec);
        }
        Ok(Self { profiles })
    }

    /// Load `roster.toml` when present; fall back to the built-in table otherwise.
    pub async fn load(path: &Path) -> Result<Self, RosterError> {
        if !path.exists() {
            info!("No roster at {}, using built-in profiles.", path.display());
            return Ok(Self::builtin());
        }
        let shown = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RosterError::Read {
                path: shown.clone(),
                source,
            })?;
        let file: RosterFile = toml::from_str(&content).map_err(|source| RosterError::Parse {
            path: shown.clone(),
            source,
        })?;
        let roster = Self::from_specs(file.agents)?;
        info!("Loaded {} roster profile(s) from {}", roster.len(), shown);
        Ok(roster)
    }

    pub fn get(&self, id: &str) -> Option<&ProfileSpec> {
        self.profiles.get(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfileSpec> {
        self.profiles.values()
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_roster_has_sixteen_profiles_keyed_by_slug() {
        let roster = Roster::builtin();
        assert_eq!(roster.len(), 16);
        let explorer = roster.get("explorer_agent").expect("explorer profile");
        assert_eq!(explorer.name, "Explorer Agent");
        assert_eq!(explorer.role, "Researcher");
        assert!(explorer.capabilities.contains(&"trends".to_string()));
        assert!(roster.get("qa_automation_engineer").is_some());
    }

    #[test]
    fn builtin_profiles_pass_validation() {
        let specs: Vec<ProfileSpec> = Roster::builtin().iter().cloned().collect();
        let roster = Roster::from_specs(specs).expect("built-in roster is valid");
        assert_eq!(roster.len(), 16);
    }

    #[test]
    fn from_specs_rejects_mismatched_id() {
        let err = Roster::from_specs(vec![ProfileSpec {
            id: "explorer".to_string(),
            name: "Explorer Agent".to_string(),
            role: "Researcher".to_string(),
            description: String::new(),
            color: "#a855f7".to_string(),
            capabilities: Vec::new(),
        }])
        .unwrap_err();
        assert!(matches!(err, RosterError::IdMismatch { .. }));
    }

    #[test]
    fn from_specs_rejects_duplicates_and_bad_colors() {
        let spec = ProfileSpec {
            id: "debugger".to_string(),
            name: "Debugger".to_string(),
            role: "Bug Hunter".to_string(),
            description: String::new(),
            color: "#ef4444".to_string(),
            capabilities: Vec::new(),
        };
        let err = Roster::from_specs(vec![spec.clone(), spec.clone()]).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateId(id) if id == "debugger"));

        let mut bad = spec;
        bad.color = "red".to_string();
        let err = Roster::from_specs(vec![bad]).unwrap_err();
        assert!(matches!(err, RosterError::InvalidColor { .. }));
    }

    #[tokio::test]
    async fn load_missing_file_returns_builtin() {
        let tmpdir = tempfile::tempdir().unwrap();
        let roster = Roster::load(&tmpdir.path().join("roster.toml")).await.unwrap();
        assert_eq!(roster.len(), 16);
    }

    #[tokio::test]
    async fn load_parses_toml_roster() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("roster.toml");
        std::fs::write(
            &path,
            r##"
[[agent]]
id = "data_scientist"
name = "Data Scientist"
role = "ML Engineer"
description = "Models and experiments"
color = "#123abc"
capabilities = ["ml", "statistics"]
"##,
        )
        .unwrap();

        let roster = Roster::load(&path).await.unwrap();
        assert_eq!(roster.len(), 1);
        let spec = roster.get("data_scientist").unwrap();
        assert_eq!(spec.capabilities, vec!["ml", "statistics"]);
    }

    #[tokio::test]
    async fn load_reports_parse_errors() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("roster.toml");
        std::fs::write(&path, "[[agent]\nid = ").unwrap();
        let err = Roster::load(&path).await.unwrap_err();
        assert!(matches!(err, RosterError::Parse { .. }));
    }
}
