use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::output::Format;
use crate::store::db::SwitchboardDb;

pub fn register(
    db_path: Option<&Path>,
    name: &str,
    program: &str,
    model: &str,
    task: &str,
    format: Format,
) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let rec = db.register_agent(name, program, model, task)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "registered", "name": rec.name})
        ),
        Format::Pretty => {
            println!("Registered '{}'", rec.name.cyan().bold());
            println!("  {} {}", "program:".dimmed(), rec.program);
            println!("  {} {}", "model:".dimmed(), rec.model);
            if !rec.task.is_empty() {
                println!("  {} {}", "task:".dimmed(), rec.task);
            }
        }
        Format::Minimal => println!("{}", rec.name),
    }
    Ok(())
}

pub fn list(db_path: Option<&Path>, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let agents = db.list_agents()?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&agents)?),
        Format::Pretty => {
            if agents.is_empty() {
                println!("{}", "No agents registered.".dimmed());
            } else {
                for a in &agents {
                    println!(
                        "{} {} {}",
                        format!("[{}]", a.name).cyan().bold(),
                        a.program.dimmed(),
                        a.model.dimmed(),
                    );
                    if !a.task.is_empty() {
                        println!("  {} {}", "task:".dimmed(), a.task);
                    }
                    println!(
                        "  {} {}",
                        "last seen:".dimmed(),
                        a.last_seen.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
        Format::Minimal => {
            for a in &agents {
                println!("{}", a.name);
            }
        }
    }
    Ok(())
}
