use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tunedesk::connector::api::serve;
use tunedesk::{Commands, Container, ContainerConfig, LlmMode, Router};

#[derive(Parser)]
#[command(name = "tunedesk")]
#[command(author, version, about = "Customer support assistant for an online music store", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// DuckDB file holding customers, invoices and the catalog
    #[arg(long, global = true, default_value = "~/.tunedesk/store.duckdb")]
    database: String,

    /// Use a throwaway in-memory store loaded with sample data
    #[arg(long, global = true)]
    memory: bool,

    /// How messages are understood
    #[arg(long, global = true, value_enum, default_value_t = LlmMode::Rules)]
    llm: LlmMode,

    /// Purchases older than this are not refunded
    #[arg(long, global = true)]
    refund_window_days: Option<i64>,

    /// Only refund whole invoices
    #[arg(long, global = true)]
    strict_invoices: bool,

    /// Trailing turns shown to the intent classifier
    #[arg(long, global = true, default_value = "6")]
    history_window: usize,

    /// Minutes a served session may sit idle before it is dropped
    #[arg(long, global = true, default_value = "30")]
    session_idle_minutes: u64,

    /// Most sessions kept at once when serving
    #[arg(long, global = true, default_value = "10000")]
    max_sessions: usize,

    /// Load the sample data into an empty store before running
    #[arg(long, global = true)]
    seed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ContainerConfig {
        database: PathBuf::from(expand_tilde(&cli.database)),
        memory: cli.memory,
        seed: cli.seed,
        llm: cli.llm,
        refund_window_days: cli.refund_window_days,
        strict_invoices: cli.strict_invoices,
        history_window: cli.history_window,
        session_idle_timeout: Duration::from_secs(cli.session_idle_minutes * 60),
        max_sessions: cli.max_sessions,
        ..ContainerConfig::default()
    };
    let container = Container::new(config).await?;

    if let Commands::Serve { port, public } = cli.command {
        let host = if public { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
        return serve(container.session_manager(), SocketAddr::from((host, port))).await;
    }

    let router = Router::new(&container);
    let output = router.route(cli.command).await?;
    println!("{}", output);

    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
