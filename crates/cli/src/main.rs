//! CampusQ CLI - Command-line interface for the CampusQ daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "campusq")]
#[command(about = "CampusQ service queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "CAMPUSQ_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List departments and their queues
    Departments,

    /// Join a department queue
    Join {
        /// Department id (e.g., registrar)
        department: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Student id
        #[arg(short, long, env = "CAMPUSQ_STUDENT_ID")]
        student_id: String,
    },

    /// Leave a queue
    Leave {
        /// Entry id returned by `join`
        entry_id: String,
    },

    /// Show position and ETA of an entry
    Position { entry_id: String },

    /// Show every queue a student is in
    Mine {
        #[arg(env = "CAMPUSQ_STUDENT_ID")]
        student_id: String,
    },

    /// Show the waiting line of a department
    Ledger { department: String },

    /// Call the next waiting student
    CallNext { department: String },

    /// Mark an entry served
    Serve { department: String, entry_id: String },

    /// Skip an entry (moves it to the attention list)
    Skip { department: String, entry_id: String },

    /// Remove an entry from the queue
    Remove { department: String, entry_id: String },

    /// Toggle serving pause
    Pause { department: String },

    /// Per-department statistics
    Stats {
        /// Limit to one department
        department: Option<String>,
    },

    /// Institution-wide overview
    Overview,

    /// Drop every active entry of a department
    Clear { department: String },

    /// Clear and zero the served-today counter
    Reset { department: String },

    /// Set queue status
    SetStatus {
        department: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Paused,
    Closed,
}

impl StatusArg {
    fn as_str(self) -> &'static str {
        match self {
            StatusArg::Active => "active",
            StatusArg::Paused => "paused",
            StatusArg::Closed => "closed",
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct DepartmentRow {
    id: String,
    name: String,
    status: String,
    waiting: u64,
    serving: String,
    minutes: f64,
}

#[derive(Tabled)]
struct EntryRow {
    number: u64,
    entry_id: String,
    name: String,
    student_id: String,
    status: String,
}

#[derive(Tabled)]
struct MembershipRow {
    department: String,
    number: u64,
    position: u64,
    waiting: u64,
    eta: String,
    progress: String,
}

#[derive(Tabled)]
struct StatsRow {
    department: String,
    status: String,
    waiting: u64,
    avg_wait_min: String,
    served_today: u64,
    next: String,
    serving: String,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn count(value: &Value) -> u64 {
    value.as_u64().unwrap_or(0)
}

fn format_eta(seconds: u64) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

fn entry_rows(entries: &Value) -> Vec<EntryRow> {
    entries
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|e| EntryRow {
                    number: count(&e["queue_number"]),
                    entry_id: text(&e["id"]),
                    name: text(&e["subject_name"]),
                    student_id: text(&e["subject_external_id"]),
                    status: text(&e["status"]),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn print_position(view: &Value) {
    println!("  {} #{}", "Ticket:".bold(), view["queue_number"]);
    println!("  {} {}", "Status:".bold(), text(&view["status"]));
    println!(
        "  {} {} of {}",
        "Position:".bold(),
        view["position"],
        view["total_waiting"]
    );
    println!("  {} {}", "ETA:".bold(), format_eta(count(&view["eta_seconds"])));
    println!("  {} {}%", "Progress:".bold(), view["progress_percent"]);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Departments => {
            let result = call_rpc(url, "departments.list.v1", json!({})).await?;
            let rows: Vec<DepartmentRow> = result
                .as_array()
                .map(|departments| {
                    departments
                        .iter()
                        .map(|d| DepartmentRow {
                            id: text(&d["id"]),
                            name: text(&d["name"]),
                            status: text(&d["status"]),
                            waiting: count(&d["total_waiting"]),
                            serving: text(&d["serving_entry_id"]),
                            minutes: d["average_service_minutes"].as_f64().unwrap_or(0.0),
                        })
                        .collect()
                })
                .unwrap_or_default();

            println!("{}", Table::new(rows));
        }

        Commands::Join {
            department,
            name,
            student_id,
        } => {
            let params = json!({
                "department_id": department,
                "name": name,
                "external_id": student_id,
            });
            let result = call_rpc(url, "queue.join.v1", params).await?;

            println!("{}", "✓ Joined queue".green().bold());
            println!("  {} {}", "Entry:".bold(), text(&result["entry"]["id"]));
            print_position(&result["position"]);
        }

        Commands::Leave { entry_id } => {
            call_rpc(url, "queue.leave.v1", json!({ "entry_id": entry_id })).await?;
            println!("{}", format!("✓ Entry {} left the queue", entry_id).green().bold());
        }

        Commands::Position { entry_id } => {
            let view = call_rpc(url, "queue.position.v1", json!({ "entry_id": entry_id })).await?;
            println!("{}", format!("Entry {}", entry_id).cyan().bold());
            print_position(&view);
        }

        Commands::Mine { student_id } => {
            let result =
                call_rpc(url, "student.queues.v1", json!({ "external_id": student_id })).await?;
            let rows: Vec<MembershipRow> = result["memberships"]
                .as_array()
                .map(|memberships| {
                    memberships
                        .iter()
                        .map(|m| MembershipRow {
                            department: text(&m["department_name"]),
                            number: count(&m["queue_number"]),
                            position: count(&m["position"]),
                            waiting: count(&m["total_waiting"]),
                            eta: format_eta(count(&m["remaining_seconds"])),
                            progress: format!("{}%", m["progress_percent"]),
                        })
                        .collect()
                })
                .unwrap_or_default();

            if rows.is_empty() {
                println!("{}", "Not in any queue".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Ledger { department } => {
            let ledger =
                call_rpc(url, "queue.ledger.v1", json!({ "department_id": department })).await?;

            println!(
                "{} ({}{})",
                department.cyan().bold(),
                text(&ledger["status"]),
                if ledger["paused"].as_bool().unwrap_or(false) {
                    ", paused"
                } else {
                    ""
                }
            );
            if ledger["serving"].is_null() {
                println!("  {} -", "Serving:".bold());
            } else {
                println!(
                    "  {} #{} {}",
                    "Serving:".bold(),
                    ledger["serving"]["queue_number"],
                    text(&ledger["serving"]["subject_name"])
                );
            }
            println!("  {} {}", "Served today:".bold(), ledger["served_today"]);
            println!();
            println!("{}", Table::new(entry_rows(&ledger["waiting"])));

            let attention = entry_rows(&ledger["attention"]);
            if !attention.is_empty() {
                println!();
                println!("{}", "Needs attention".yellow().bold());
                println!("{}", Table::new(attention));
            }
        }

        Commands::CallNext { department } => {
            let outcome =
                call_rpc(url, "staff.call_next.v1", json!({ "department_id": department })).await?;

            match outcome["outcome"].as_str() {
                Some("called") => println!(
                    "{} #{} {} ({})",
                    "✓ Now serving".green().bold(),
                    outcome["entry"]["queue_number"],
                    text(&outcome["entry"]["subject_name"]),
                    text(&outcome["entry"]["id"])
                ),
                Some("already_serving") => println!(
                    "{} {}",
                    "○ Already serving".yellow(),
                    text(&outcome["entry_id"])
                ),
                Some("paused") => println!("{}", "○ Serving is paused".yellow()),
                Some("closed") => println!("{}", "○ Queue is closed".yellow()),
                Some("empty") => println!("{}", "○ Nobody is waiting".yellow()),
                _ => println!("{}", outcome),
            }
        }

        Commands::Serve {
            department,
            entry_id,
        } => {
            let params = json!({ "department_id": department, "entry_id": entry_id });
            call_rpc(url, "staff.serve.v1", params).await?;
            println!("{}", format!("✓ Entry {} served", entry_id).green().bold());
        }

        Commands::Skip {
            department,
            entry_id,
        } => {
            let params = json!({ "department_id": department, "entry_id": entry_id });
            call_rpc(url, "staff.skip.v1", params).await?;
            println!("{}", format!("✓ Entry {} skipped", entry_id).green().bold());
        }

        Commands::Remove {
            department,
            entry_id,
        } => {
            let params = json!({ "department_id": department, "entry_id": entry_id });
            call_rpc(url, "staff.remove.v1", params).await?;
            println!("{}", format!("✓ Entry {} removed", entry_id).green().bold());
        }

        Commands::Pause { department } => {
            let result =
                call_rpc(url, "staff.toggle_pause.v1", json!({ "department_id": department }))
                    .await?;
            if result["paused"].as_bool().unwrap_or(false) {
                println!("{}", format!("⏸ {} paused", department).yellow().bold());
            } else {
                println!("{}", format!("▶ {} resumed", department).green().bold());
            }
        }

        Commands::Stats { department } => {
            let result = call_rpc(url, "admin.stats.v1", json!({ "department_id": department })).await?;
            let rows: Vec<StatsRow> = result
                .as_array()
                .map(|stats| {
                    stats
                        .iter()
                        .map(|s| StatsRow {
                            department: text(&s["department_name"]),
                            status: text(&s["status"]),
                            waiting: count(&s["total_waiting"]),
                            avg_wait_min: format!(
                                "{:.1}",
                                s["avg_wait_minutes"].as_f64().unwrap_or(0.0)
                            ),
                            served_today: count(&s["served_today"]),
                            next: text(&s["next_entry_id"]),
                            serving: text(&s["serving_entry_id"]),
                        })
                        .collect()
                })
                .unwrap_or_default();

            println!("{}", Table::new(rows));
        }

        Commands::Overview => {
            println!("{}", "Overview".cyan().bold());
            println!();

            match call_rpc(url, "admin.overview.v1", json!({})).await {
                Ok(overview) => {
                    println!("  {} {}", "Institution:".bold(), text(&overview["institution_name"]));
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Waiting:".bold(), overview["total_waiting"]);
                    println!("  {} {}", "Served today:".bold(), overview["total_served_today"]);
                    println!("  {} {}", "Active queues:".bold(), overview["active_queues"]);
                    println!(
                        "  {} {:.1} min",
                        "Average wait:".bold(),
                        overview["average_wait_minutes"].as_f64().unwrap_or(0.0)
                    );

                    if let Some(top) = overview["top_departments"].as_array() {
                        if !top.is_empty() {
                            println!();
                            println!("  {}", "Busiest departments".bold());
                            for department in top {
                                println!(
                                    "  • {} ({} waiting)",
                                    text(&department["department_name"]),
                                    department["total_waiting"]
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Clear { department } => {
            let result =
                call_rpc(url, "admin.clear.v1", json!({ "department_id": department })).await?;
            println!(
                "{}",
                format!("✓ {} cleared ({} entries removed)", department, result["removed"])
                    .green()
                    .bold()
            );
        }

        Commands::Reset { department } => {
            let result =
                call_rpc(url, "admin.reset.v1", json!({ "department_id": department })).await?;
            println!(
                "{}",
                format!("✓ {} reset ({} entries removed)", department, result["removed"])
                    .green()
                    .bold()
            );
        }

        Commands::SetStatus { department, status } => {
            let params = json!({ "department_id": department, "status": status.as_str() });
            call_rpc(url, "admin.status.v1", params).await?;
            println!(
                "{}",
                format!("✓ {} is now {}", department, status.as_str()).green().bold()
            );
        }
    }

    Ok(())
}
