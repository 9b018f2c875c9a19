use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::output::{Format, truncate};
use crate::store::db::SwitchboardDb;

pub fn remember(
    db_path: Option<&Path>,
    content: &str,
    tags: &[String],
    format: Format,
) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let mem = db.remember(content, tags)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "stored", "id": mem.id})
        ),
        Format::Pretty => println!("Stored {} {}", mem.id.cyan(), truncate(content, 60)),
        Format::Minimal => println!("{}", mem.id),
    }
    Ok(())
}

pub fn recall(db_path: Option<&Path>, query: &str, limit: u32, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let memories = db.recall(query, limit)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&memories)?),
        Format::Pretty => {
            if memories.is_empty() {
                println!("{}", "Nothing recalled.".dimmed());
            } else {
                for m in &memories {
                    println!("{} {}", format!("[{}]", m.id).dimmed(), m.content);
                    if !m.tags.is_empty() {
                        println!("  {} {}", "tags:".dimmed(), m.tags.join(", "));
                    }
                }
            }
        }
        Format::Minimal => {
            for m in &memories {
                println!("{} {}", m.id, truncate(&m.content, 60));
            }
        }
    }
    Ok(())
}

pub fn forget(db_path: Option<&Path>, id: &str, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    db.forget(id)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "forgotten", "id": id})
        ),
        Format::Pretty => println!("Forgot {}", id.cyan()),
        Format::Minimal => println!("ok"),
    }
    Ok(())
}
