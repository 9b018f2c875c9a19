use std::path::PathBuf;

use clap::{Parser, Subcommand};
use switchboard::error::{Result, SwitchboardError};
use switchboard::output::Format;
use switchboard::store::leases::DEFAULT_LEASE_TTL_SECS;
use switchboard::store::memory::DEFAULT_RECALL_LIMIT;
use switchboard::store::messages::DEFAULT_INBOX_LIMIT;

#[derive(Parser)]
#[command(
    name = "switchboard",
    version,
    about = "Local coordination hub for multi-agent workflows"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Database path (defaults to SWITCHBOARD_DB, then ~/.switchboard/switchboard.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-RPC gateway on stdin/stdout
    Serve,
    /// Register (or refresh) an agent
    Register {
        /// Agent name
        name: String,
        /// Agent program, e.g. claude-code or opencode
        #[arg(long, default_value = "unknown")]
        program: String,
        /// Model in use
        #[arg(long, default_value = "unknown")]
        model: String,
        /// Current task description
        #[arg(long, default_value = "")]
        task: String,
    },
    /// List registered agents
    Agents,
    /// Send a message to another agent
    Send {
        /// Recipient agent name
        to: String,
        /// Subject line
        subject: String,
        /// Sender name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        from: Option<String>,
        /// Message body
        #[arg(long, default_value = "")]
        body: String,
        /// Thread id for grouping related messages
        #[arg(long)]
        thread: Option<String>,
    },
    /// Fetch your inbox, newest first
    Inbox {
        /// Agent name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        agent: Option<String>,
        /// Include messages already read
        #[arg(long)]
        all: bool,
        /// Maximum number of messages
        #[arg(long, default_value_t = DEFAULT_INBOX_LIMIT)]
        limit: u32,
    },
    /// Mark a message as read
    MarkRead {
        /// Message id
        id: i64,
        /// Agent name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        agent: Option<String>,
    },
    /// Acknowledge a message
    Ack {
        /// Message id
        id: i64,
        /// Agent name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        agent: Option<String>,
    },
    /// Take an exclusive, expiring lease on a file path
    Lock {
        /// File path to lock
        path: String,
        /// Agent name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        agent: Option<String>,
        /// Why the lock is needed
        #[arg(long)]
        reason: Option<String>,
        /// Lease lifetime in seconds
        #[arg(long, default_value_t = DEFAULT_LEASE_TTL_SECS)]
        ttl: i64,
    },
    /// Release a file lease you hold
    Unlock {
        /// File path to unlock
        path: String,
        /// Agent name (falls back to SWITCHBOARD_AGENT)
        #[arg(long)]
        agent: Option<String>,
    },
    /// List live file leases
    Locks {
        /// Filter to one holder
        #[arg(long)]
        agent: Option<String>,
    },
    /// Store a note for later recall
    Remember {
        /// Text to store
        content: String,
        /// Tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Search stored notes by substring
    Recall {
        /// Search term
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = DEFAULT_RECALL_LIMIT)]
        limit: u32,
    },
    /// Delete a stored note
    Forget {
        /// Note id
        id: String,
    },
}

/// Resolve the acting agent: explicit flag first, then SWITCHBOARD_AGENT.
fn require_agent(flag: Option<String>) -> Result<String> {
    flag.or_else(switchboard::agent::resolve_agent)
        .ok_or_else(|| {
            SwitchboardError::InvalidArgument(
                "agent name required: pass --agent or set SWITCHBOARD_AGENT".into(),
            )
        })
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let db = cli.db.as_deref();
    match cli.command {
        Commands::Serve => switchboard::commands::serve::run(db),
        Commands::Register {
            name,
            program,
            model,
            task,
        } => switchboard::commands::registry::register(db, &name, &program, &model, &task, format),
        Commands::Agents => switchboard::commands::registry::list(db, format),
        Commands::Send {
            to,
            subject,
            from,
            body,
            thread,
        } => {
            let from = require_agent(from)?;
            switchboard::commands::message::send(
                db,
                &from,
                &to,
                &subject,
                &body,
                thread.as_deref(),
                format,
            )
        }
        Commands::Inbox { agent, all, limit } => {
            let agent = require_agent(agent)?;
            switchboard::commands::message::inbox(db, &agent, !all, limit, format)
        }
        Commands::MarkRead { id, agent } => {
            let agent = require_agent(agent)?;
            switchboard::commands::message::mark_read(db, id, &agent, format)
        }
        Commands::Ack { id, agent } => {
            let agent = require_agent(agent)?;
            switchboard::commands::message::ack(db, id, &agent, format)
        }
        Commands::Lock {
            path,
            agent,
            reason,
            ttl,
        } => {
            let agent = require_agent(agent)?;
            switchboard::commands::lease::lock(db, &path, &agent, reason.as_deref(), ttl, format)
        }
        Commands::Unlock { path, agent } => {
            let agent = require_agent(agent)?;
            switchboard::commands::lease::unlock(db, &path, &agent, format)
        }
        Commands::Locks { agent } => {
            switchboard::commands::lease::list(db, agent.as_deref(), format)
        }
        Commands::Remember { content, tags } => {
            switchboard::commands::memory::remember(db, &content, &tags, format)
        }
        Commands::Recall { query, limit } => {
            switchboard::commands::memory::recall(db, &query, limit, format)
        }
        Commands::Forget { id } => switchboard::commands::memory::forget(db, &id, format),
    }
}

fn main() {
    let cli = Cli::parse();
    let format = cli.format;
    if let Err(e) = run(cli) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
