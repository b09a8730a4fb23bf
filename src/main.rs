//! Arcadia Zoo Manager
//!
//! An MCP server for zoo animal care.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arcadia::access::StaticIdentity;
use arcadia::build_info;
use arcadia::config::Config;
use arcadia::db::{self, Database};
use arcadia::mcp::ArcadiaService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the MCP channel
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arcadia=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env()?;
    eprintln!("Database path: {}", config.database_path.display());
    info!(
        role = config.caller.role.as_str(),
        user_id = ?config.caller.user_id,
        "Session identity"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = Database::new(&config.database_path)?;

    database.with_conn_mut(|conn| {
        if db::migrations::needs_migration(conn)? {
            info!("Applying schema migrations");
        }
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let rules = config.load_rules()?;

    let identity = Arc::new(StaticIdentity::new(config.caller));
    let service = ArcadiaService::new(config.database_path.clone(), database, identity, rules);

    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
