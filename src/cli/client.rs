use anyhow::{Result, anyhow};
use console::style;
use reqwest::Client;
use serde_json::Value;

use super::parse_string_flag;
use crate::core::terminal::{GuideSection, print_status, print_success};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3100";

const CLIENT_COMMANDS: &[&str] = &[
    "agents",
    "proposals",
    "tasks",
    "messages",
    "stats",
    "propose",
    "approve",
    "reject",
    "complete",
    "seed",
    "reload",
];

const VALUE_FLAGS: &[&str] = &[
    "--api-url",
    "--agent",
    "--task",
    "--reason",
    "--outcome",
    "--priority",
    "--by",
    "--result",
];

pub(crate) fn is_client_command(cmd: &str) -> bool {
    CLIENT_COMMANDS.contains(&cmd)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
struct RequestPlan {
    method: HttpMethod,
    path: String,
    body: Option<Value>,
}

impl RequestPlan {
    fn get(path: &str) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
        }
    }

    fn post(path: &str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.to_string(),
            body: Some(body),
        }
    }
}

fn parse_api_url(args: &[String]) -> String {
    parse_string_flag(args, 2, "--api-url").unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// First argument after the command that is neither a flag nor a flag value.
fn first_positional(args: &[String]) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if VALUE_FLAGS.contains(&args[i].as_str()) {
            i += 2;
        } else if args[i].starts_with("--") {
            i += 1;
        } else {
            return Some(args[i].clone());
        }
    }
    None
}

fn required(args: &[String], what: &str, usage: &str) -> Result<String> {
    first_positional(args).ok_or_else(|| anyhow!("missing {}. Usage: {}", what, usage))
}

fn build_request_plan(args: &[String]) -> Result<RequestPlan> {
    let cmd = args.get(1).map(String::as_str).unwrap_or("");
    let flag = |name: &str| parse_string_flag(args, 2, name);

    match cmd {
        "agents" => Ok(RequestPlan::get("/agents")),
        "proposals" => Ok(RequestPlan::get("/proposals")),
        "tasks" => Ok(RequestPlan::get("/tasks")),
        "messages" => Ok(RequestPlan::get("/communication")),
        "stats" => Ok(RequestPlan::get("/stats")),
        "seed" => Ok(RequestPlan::post("/proposals/seed", serde_json::json!({}))),
        "reload" => Ok(RequestPlan::post("/agents/reload", serde_json::json!({}))),
        "propose" => {
            let agent = flag("--agent").ok_or_else(|| anyhow!("propose requires --agent <name>"))?;
            let task = flag("--task").ok_or_else(|| anyhow!("propose requires --task <text>"))?;
            let mut body = serde_json::json!({
                "agentName": agent,
                "task": task,
                "reason": flag("--reason").unwrap_or_default(),
                "expectedOutcome": flag("--outcome").unwrap_or_default(),
            });
            if let Some(priority) = flag("--priority") {
                body["priority"] = Value::String(priority);
            }
            Ok(RequestPlan::post("/proposals", body))
        }
        "approve" | "reject" => {
            let id = required(args, "proposal id", &format!("{} <proposalId> [--by <name>]", cmd))?;
            let mut body = serde_json::json!({
                "proposalId": id,
                "approved": cmd == "approve",
            });
            if let Some(by) = flag("--by") {
                body["approvedBy"] = Value::String(by);
            }
            Ok(RequestPlan::post("/proposals/approve", body))
        }
        "complete" => {
            let id = required(args, "task id", "complete <taskId> [--result <text>]")?;
            Ok(RequestPlan::post(
                "/tasks/complete",
                serde_json::json!({
                    "taskId": id,
                    "result": flag("--result").unwrap_or_default(),
                }),
            ))
        }
        other => Err(anyhow!("Unsupported command '{}'", other)),
    }
}

pub async fn run_client_command(args: &[String]) -> Result<()> {
    let api_url = parse_api_url(args);
    let plan = build_request_plan(args)?;
    let client = Client::new();
    let url = format!("{}{}", api_url.trim_end_matches('/'), plan.path);

    let request = match plan.method {
        HttpMethod::Get => client.get(&url),
        HttpMethod::Post => client.post(&url),
    };
    let request = if let Some(body) = &plan.body {
        request.json(body)
    } else {
        request
    };

    let resp = request.send().await.map_err(|e| {
        anyhow!(
            "Could not reach blindfold at {} - {}. Is `blindfold serve` running?",
            api_url,
            e
        )
    })?;
    let status = resp.status();
    let body = resp.json::<Value>().await?;
    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed");
        return Err(anyhow!("{} ({})", message, status));
    }

    render(args.get(1).map(String::as_str).unwrap_or(""), &body)
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("?")
}

fn render(cmd: &str, body: &Value) -> Result<()> {
    let empty = Vec::new();
    match cmd {
        "agents" => {
            let agents = body["agents"].as_array().unwrap_or(&empty);
            let mut section = GuideSection::new(&format!("Agents · {}", agents.len()));
            for agent in agents {
                section = section.bullet(&format!(
                    "{} [{}] {} · {} proposal(s)",
                    style(str_field(agent, "name")).white().bold(),
                    str_field(agent, "status"),
                    str_field(agent, "role"),
                    agent["suggestionCount"].as_u64().unwrap_or(0),
                ));
            }
            section.print();
        }
        "proposals" => {
            let proposals = body["proposals"].as_array().unwrap_or(&empty);
            let mut section = GuideSection::new(&format!("Proposals · {}", proposals.len()));
            for p in proposals {
                section = section.bullet(&format!(
                    "{} [{} · {}] {}: {}",
                    style(str_field(p, "id")).dim(),
                    str_field(p, "status"),
                    str_field(p, "priority"),
                    str_field(p, "agent"),
                    str_field(p, "task"),
                ));
            }
            section.print();
        }
        "tasks" => {
            let tasks = body["tasks"].as_array().unwrap_or(&empty);
            let mut section = GuideSection::new(&format!("Tasks · {}", tasks.len()));
            for t in tasks {
                section = section.bullet(&format!(
                    "{} [{}] {}: {}",
                    style(str_field(t, "id")).dim(),
                    str_field(t, "status"),
                    str_field(t, "agent"),
                    str_field(t, "task"),
                ));
            }
            section.print();
        }
        "messages" => {
            let messages = body["messages"].as_array().unwrap_or(&empty);
            let mut section = GuideSection::new(&format!("Messages · {}", messages.len()));
            for m in messages {
                let to = m
                    .get("to")
                    .and_then(|v| v.as_str())
                    .map(|to| format!(" → {}", to))
                    .unwrap_or_default();
                section = section.bullet(&format!(
                    "[{}] {}{}: {}",
                    str_field(m, "type"),
                    str_field(m, "from"),
                    to,
                    str_field(m, "content"),
                ));
            }
            section.print();
        }
        "stats" => {
            for (label, key) in [
                ("Agents", "totalAgents"),
                ("Active", "activeAgents"),
                ("Pending proposals", "pendingProposals"),
                ("Completed tasks", "completedTasks"),
                ("Success rate", "successRate"),
            ] {
                print_status(label, &body[key].to_string());
            }
            print_status("Uptime", str_field(body, "uptime"));
        }
        _ => {
            print_success(&format!("{} request completed", cmd));
            GuideSection::new("Response")
                .text(&serde_json::to_string_pretty(body)?)
                .print();
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_commands_map_to_get_routes() {
        let plan = build_request_plan(&args(&["blindfold", "messages"])).expect("plan");
        assert_eq!(plan, RequestPlan::get("/communication"));
        let plan = build_request_plan(&args(&["blindfold", "stats"])).expect("plan");
        assert_eq!(plan.method, HttpMethod::Get);
        assert_eq!(plan.path, "/stats");
    }

    #[test]
    fn propose_builds_camel_case_body() {
        let plan = build_request_plan(&args(&[
            "blindfold",
            "propose",
            "--agent",
            "Explorer Agent",
            "--task",
            "Investigar tendencias",
            "--priority",
            "high",
        ]))
        .expect("plan");
        assert_eq!(plan.method, HttpMethod::Post);
        assert_eq!(plan.path, "/proposals");
        let body = plan.body.unwrap();
        assert_eq!(body["agentName"], "Explorer Agent");
        assert_eq!(body["priority"], "high");
        assert_eq!(body["expectedOutcome"], "");
    }

    #[test]
    fn propose_without_task_is_an_error() {
        let err = build_request_plan(&args(&["blindfold", "propose", "--agent", "Debugger"]))
            .unwrap_err();
        assert!(err.to_string().contains("--task"));
    }

    #[test]
    fn approve_and_reject_share_a_route() {
        let plan = build_request_plan(&args(&[
            "blindfold",
            "approve",
            "--api-url",
            "http://10.0.0.2:3100",
            "prop_1",
            "--by",
            "lead",
        ]))
        .expect("plan");
        assert_eq!(plan.path, "/proposals/approve");
        let body = plan.body.unwrap();
        assert_eq!(body["proposalId"], "prop_1");
        assert_eq!(body["approved"], true);
        assert_eq!(body["approvedBy"], "lead");

        let plan = build_request_plan(&args(&["blindfold", "reject", "prop_1"])).expect("plan");
        assert_eq!(plan.body.unwrap()["approved"], false);
    }

    #[test]
    fn complete_requires_task_id() {
        let err = build_request_plan(&args(&["blindfold", "complete", "--result", "done"]))
            .unwrap_err();
        assert!(err.to_string().contains("task id"));

        let plan = build_request_plan(&args(&["blindfold", "complete", "task_9", "--result", "ok"]))
            .expect("plan");
        assert_eq!(plan.body.unwrap()["taskId"], "task_9");
    }

    #[test]
    fn api_url_flag_overrides_default() {
        assert_eq!(parse_api_url(&args(&["blindfold", "agents"])), DEFAULT_API_URL);
        assert_eq!(
            parse_api_url(&args(&["blindfold", "agents", "--api-url", "http://h:1"])),
            "http://h:1"
        );
    }

    #[test]
    fn every_client_command_builds_a_plan() {
        for cmd in CLIENT_COMMANDS {
            let mut argv = args(&["blindfold", cmd]);
            match *cmd {
                "propose" => argv.extend(args(&["--agent", "Debugger", "--task", "t"])),
                "approve" | "reject" | "complete" => argv.push("id_1".to_string()),
                _ => {}
            }
            assert!(build_request_plan(&argv).is_ok(), "{} should build", cmd);
        }
    }
}
