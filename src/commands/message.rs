use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::output::{Format, truncate};
use crate::store::db::SwitchboardDb;

pub fn send(
    db_path: Option<&Path>,
    sender: &str,
    recipient: &str,
    subject: &str,
    body: &str,
    thread_id: Option<&str>,
    format: Format,
) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let msg = db.send_message(sender, recipient, subject, body, thread_id)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "sent", "id": msg.id})
        ),
        Format::Pretty => println!("Sent #{} to '{}': {}", msg.id, recipient.cyan(), subject),
        Format::Minimal => println!("{}", msg.id),
    }
    Ok(())
}

pub fn inbox(
    db_path: Option<&Path>,
    agent: &str,
    unread_only: bool,
    limit: u32,
    format: Format,
) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    let msgs = db.fetch_inbox(agent, unread_only, limit)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&msgs)?),
        Format::Pretty => {
            if msgs.is_empty() {
                println!("{}", "No messages.".dimmed());
            } else {
                for m in &msgs {
                    let state = if m.ack_at.is_some() {
                        "acked".green()
                    } else if m.read_at.is_some() {
                        "read".normal()
                    } else {
                        "unread".yellow()
                    };
                    println!(
                        "{} {} {} {}",
                        format!("#{}", m.id).dimmed(),
                        format!("{}:", m.sender).cyan(),
                        m.subject,
                        format!("[{state}]").dimmed(),
                    );
                    if !m.body.is_empty() {
                        println!("  {}", truncate(&m.body, 100).dimmed());
                    }
                }
            }
        }
        Format::Minimal => {
            for m in &msgs {
                println!("{} {} {}", m.id, m.sender, m.subject);
            }
        }
    }
    Ok(())
}

pub fn mark_read(db_path: Option<&Path>, id: i64, agent: &str, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    db.mark_read(id, agent)?;
    match format {
        Format::Json => println!("{}", serde_json::json!({"status": "read", "id": id})),
        Format::Pretty => println!("Marked #{id} read"),
        Format::Minimal => println!("ok"),
    }
    Ok(())
}

pub fn ack(db_path: Option<&Path>, id: i64, agent: &str, format: Format) -> Result<()> {
    let db = SwitchboardDb::from_env(db_path)?;
    db.ack_message(id, agent)?;
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({"status": "acknowledged", "id": id})
        ),
        Format::Pretty => println!("Acknowledged #{id}"),
        Format::Minimal => println!("ok"),
    }
    Ok(())
}
