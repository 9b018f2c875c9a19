use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::rpc::server;
use crate::store::db::SwitchboardDb;

/// Run the JSON-RPC gateway on stdio. Diagnostics go to stderr; stdout
/// carries nothing but response lines.
pub fn run(db_path: Option<&Path>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let resolved = crate::store::db::resolve_db_path(db_path)?;
    let db = SwitchboardDb::from_env(db_path)?;
    info!(db = %resolved.display(), "switchboard gateway listening on stdio");

    server::serve(&db)
}
