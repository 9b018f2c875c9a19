use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::output::Format;
use crate::store::db::SwitchboardDb;
use crate::store::leases::LeaseOutcome;

pub fn lock(
    db_path: Option<&Path>,
    path: &str,
    agent: &str,
    reason: Option<&str>,
    ttl_secs: i64,
    format: Format,
) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let outcome = db.acquire_lease(path, agent, reason, ttl_secs)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&outcome)?),
        Format::Pretty => match &outcome {
            LeaseOutcome::Locked { path, expires_at } => {
                println!(
                    "Locked '{}' until {}",
                    path.green(),
                    expires_at.format("%H:%M:%S")
                );
            }
            LeaseOutcome::Conflict { path, holder } => {
                println!("Conflict: '{}' is held by '{}'", path.yellow(), holder.cyan());
            }
        },
        Format::Minimal => match &outcome {
            LeaseOutcome::Locked { .. } => println!("locked"),
            LeaseOutcome::Conflict { holder, .. } => println!("conflict {holder}"),
        },
    }
    Ok(())
}

pub fn unlock(db_path: Option<&Path>, path: &str, agent: &str, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    db.release_lease(path, agent)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "unlocked", "path": path})
        ),
        Format::Pretty => println!("Unlocked '{}'", path.green()),
        Format::Minimal => println!("ok"),
    }
    Ok(())
}

pub fn list(db_path: Option<&Path>, agent: Option<&str>, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let leases = db.list_leases(agent)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&leases)?),
        Format::Pretty => {
            if leases.is_empty() {
                println!("{}", "No live locks.".dimmed());
            } else {
                for l in &leases {
                    println!(
                        "{} {} {}",
                        l.path.green(),
                        format!("held by {}", l.holder).cyan(),
                        format!("until {}", l.expires_at.format("%H:%M:%S")).dimmed(),
                    );
                    if let Some(ref reason) = l.reason {
                        println!("  {} {}", "reason:".dimmed(), reason);
                    }
                }
            }
        }
        Format::Minimal => {
            for l in &leases {
                println!("{} {}", l.path, l.holder);
            }
        }
    }
    Ok(())
}
