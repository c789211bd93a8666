//! Mobile Health Measurement (MHM)
//!
//! An MCP server for patient intake and medical diagnostic reports.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use mhm::build_info;
use mhm::config::AppConfig;
use mhm::db::Database;
use mhm::mcp::MhmService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mhm=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = AppConfig::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Report path: {}", config.report_output_path().display());
    match &config.smtp {
        Some(smtp) => eprintln!("Email delivery: {} as {}", smtp.host, smtp.username),
        None => eprintln!("Email delivery: disabled (SMTP_USER/SMTP_PASS not set)"),
    }

    // Open the database and bring the schema up to date
    let database = Database::open(&config.database_path)?;

    let service = MhmService::new(config, database);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
