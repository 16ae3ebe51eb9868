use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::core::agent::{ProfileSpec, Roster};
use crate::core::config::{AppConfig, CONFIG_FILE, DEFAULT_CONFIG_TEMPLATE, RootPaths};
use crate::core::terminal::{GuideSection, print_info, print_success};
use crate::platform::{NativePlatform, Platform};

#[derive(Debug, Default)]
pub(crate) struct InitReport {
    pub root: PathBuf,
    pub agent_files_written: usize,
    pub config_written: bool,
}

/// `Qa Automation Engineer` -> `qa-automation-engineer.md`
pub(crate) fn agent_file_name(display_name: &str) -> String {
    let stem = display_name
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    format!("{}.md", stem)
}

fn agent_file_body(spec: &ProfileSpec) -> String {
    format!(
        "# {}\n\n**Role:** {}\n\n{}\n\n**Capabilities:** {}\n",
        spec.name,
        spec.role,
        spec.description,
        spec.capabilities.join(", ")
    )
}

/// Create the root layout. Existing files are left untouched. Agent files
/// follow the roster `serve` would load.
pub(crate) async fn run_init(root: &Path) -> Result<InitReport> {
    let config_path = root.join(CONFIG_FILE);
    let config_written = !config_path.exists();
    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("creating {}", root.display()))?;
    if config_written {
        tokio::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
            .await
            .with_context(|| format!("writing {}", config_path.display()))?;
    }

    let config = AppConfig::load(root).await?;
    let paths = RootPaths::resolve(root, &config);
    for dir in [&paths.data_dir, &paths.agents_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    NativePlatform::restrict_dir_permissions(&paths.data_dir);

    let roster = Roster::load(&paths.roster).await?;
    let mut agent_files_written = 0;
    for spec in roster.iter() {
        let path = paths.agents_dir.join(agent_file_name(&spec.name));
        if path.exists() {
            continue;
        }
        tokio::fs::write(&path, agent_file_body(spec))
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        agent_files_written += 1;
    }

    Ok(InitReport {
        root: root.to_path_buf(),
        agent_files_written,
        config_written,
    })
}

pub async fn run_init_command(root: &Path) -> Result<()> {
    let report = run_init(root).await?;
    print_success("blindfold is initialized.");
    GuideSection::new("Layout")
        .status("Root", &report.root.display().to_string())
        .status("Agent files", &format!("{} written", report.agent_files_written))
        .status(
            "Config",
            if report.config_written {
                "written"
            } else {
                "kept existing"
            },
        )
        .print();
    println!();
    print_info(&format!(
        "Start the server with `{} serve --root {}`.",
        NativePlatform::binary_name(),
        report.root.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::{AgentProfile, AgentRegistry};
    use crate::core::store::RecordStore;
    use std::sync::Arc;

    #[test]
    fn file_names_are_kebab_case() {
        assert_eq!(
            agent_file_name("Qa Automation Engineer"),
            "qa-automation-engineer.md"
        );
        assert_eq!(agent_file_name("Debugger"), "debugger.md");
    }

    #[tokio::test]
    async fn init_creates_layout_and_is_idempotent() {
        let tmpdir = tempfile::tempdir().unwrap();
        let root = tmpdir.path().join("home");

        let first = run_init(&root).await.unwrap();
        assert!(first.config_written);
        assert_eq!(first.agent_files_written, 16);
        assert!(root.join("data").is_dir());
        assert!(root.join("agents").join("explorer-agent.md").is_file());

        let second = run_init(&root).await.unwrap();
        assert!(!second.config_written);
        assert_eq!(second.agent_files_written, 0);
    }

    #[tokio::test]
    async fn generated_files_register_as_configured_agents() {
        let tmpdir = tempfile::tempdir().unwrap();
        let root = tmpdir.path().to_path_buf();
        run_init(&root).await.unwrap();

        let store = Arc::new(RecordStore::open(root.join("data")).await.unwrap());
        let registry = AgentRegistry::new(root.join("agents"), Roster::builtin(), store);
        assert_eq!(registry.reload().await, 16);
        for agent in registry.list().await {
            assert!(
                matches!(agent.profile, AgentProfile::Configured(_)),
                "{} should match a roster profile",
                agent.name
            );
        }
    }

    #[tokio::test]
    async fn init_follows_a_configured_roster() {
        let tmpdir = tempfile::tempdir().unwrap();
        let root = tmpdir.path().to_path_buf();
        std::fs::write(
            root.join("roster.toml"),
            r##"
[[agent]]
id = "qa_lead"
name = "QA Lead"
role = "Quality"
description = "Owns the release checklist"
color = "#22d3ee"
capabilities = ["testing"]
"##,
        )
        .unwrap();

        let report = run_init(&root).await.unwrap();
        assert_eq!(report.agent_files_written, 1);
        assert!(root.join("agents").join("qa-lead.md").is_file());
        assert!(!root.join("agents").join("explorer-agent.md").exists());
    }
}
