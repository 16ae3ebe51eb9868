mod client;
mod init;
mod serve;

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use crate::core::terminal::{self, GuideSection, print_error};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Server")
        .command("serve", "Run the mission control API")
        .command("init", "Create the data directory, agent files and config")
        .print();

    GuideSection::new("Dashboard")
        .command("agents", "List registered agents")
        .command("proposals", "List proposals, newest first")
        .command("tasks", "List tasks")
        .command("messages", "Show the broadcast log")
        .command("stats", "Show summary counters")
        .print();

    GuideSection::new("Decisions")
        .command("propose", "Submit a proposal (--agent, --task, --priority)")
        .command("approve", "Approve a proposal by id")
        .command("reject", "Reject a proposal by id")
        .command("complete", "Complete a task by id (--result)")
        .command("seed", "Create the standard starter proposals")
        .command("reload", "Rescan the agents directory")
        .print();

    GuideSection::new("Options")
        .text("--root <dir>        Root directory (default: $BLINDFOLD_HOME or ~/.blindfold)")
        .text("--host, --port      Override the listen address for serve")
        .text("--seed              Seed starter proposals when serve starts")
        .text("--api-url <url>     Server for client commands (default: http://127.0.0.1:3100)")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style(NativePlatform::binary_name()).green()
    );
}

/// Value following `flag`, searched from `start`.
pub(crate) fn parse_string_flag(args: &[String], start: usize, flag: &str) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if args[i] == flag {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

pub(crate) fn resolve_root(flag: Option<String>) -> PathBuf {
    match flag {
        Some(dir) => PathBuf::from(dir),
        None => NativePlatform::data_dir(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ServeFlags {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub seed: bool,
}

pub(crate) fn parse_serve_flags(args: &[String], start: usize) -> ServeFlags {
    let mut flags = ServeFlags::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                if i + 1 < args.len() {
                    flags.host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--port" => {
                if i + 1 < args.len() {
                    flags.port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--seed" => {
                flags.seed = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    flags
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");

    match cmd {
        "serve" | "start" => {
            let root = resolve_root(parse_string_flag(&args, 2, "--root"));
            serve::run_server(root, parse_serve_flags(&args, 2)).await
        }
        "init" => {
            let root = resolve_root(parse_string_flag(&args, 2, "--root"));
            init::run_init_command(&root).await
        }
        "" | "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other if client::is_client_command(other) => client::run_client_command(&args).await,
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}
