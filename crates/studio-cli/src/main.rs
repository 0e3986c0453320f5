mod logger;
mod repl;

use clap::{Parser, ValueEnum};
use studio_client::prelude::*;

/// Terminal client for the SQL AI Studio backend.
///
/// Connects a database through the backend, then drops into an interactive
/// loop: plain input becomes a streamed chat turn, `:`-prefixed commands
/// drive the SQL buffer, execution, and CSV export.
#[derive(Parser, Debug)]
#[command(name = "studio-cli", version, about)]
struct Cli {
    /// Backend base URL; falls back to STUDIO_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Connect to the backend's bundled test database instead of supplying
    /// credentials.
    #[arg(long)]
    test_db: bool,

    /// Database engine (postgres, mysql, clickhouse, plsql).
    #[arg(long, default_value = "postgres")]
    engine: Engine,

    /// Database host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database port; the backend applies the engine default when omitted.
    #[arg(long)]
    port: Option<u16>,

    /// Database name.
    #[arg(long, default_value = "postgres")]
    database: String,

    /// Login user.
    #[arg(long, default_value = "postgres")]
    username: String,

    /// Login password.
    #[arg(long)]
    password: Option<String>,

    /// Require TLS for the backend's database connection.
    #[arg(long)]
    ssl: bool,

    /// How `:run` executes SQL.
    #[arg(long, value_enum, default_value_t = ExecMode::Endpoint)]
    exec: ExecMode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExecMode {
    /// The dedicated `/sql` execution endpoint.
    Endpoint,
    /// The assistant-prompt fallback that parses a Markdown table reply.
    Prompt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init();
    let cli = Cli::parse();

    let config = match &cli.base_url {
        Some(url) => StudioConfig::new(url),
        None => StudioConfig::from_env()?,
    };
    let client = StudioClient::new(config)?;

    let strategy: Box<dyn ExecutionStrategy> = match cli.exec {
        ExecMode::Endpoint => Box::new(SqlEndpoint),
        ExecMode::Prompt => Box::new(AssistantPrompt::default()),
    };

    let conversation = if cli.test_db {
        client.init_test_conversation().await?
    } else {
        let mut credentials =
            DatabaseCredentials::new(cli.engine, &cli.host, &cli.database, &cli.username);
        if let Some(port) = cli.port {
            credentials = credentials.port(port);
        }
        if let Some(password) = &cli.password {
            credentials = credentials.password(password);
        }
        if cli.ssl {
            credentials = credentials.ssl(true);
        }
        client.init_conversation(&credentials).await?
    };

    repl::run(&client, &conversation, strategy.as_ref()).await
}
