use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use config::{AppConfig, ConfigSource};

mod config;
mod enrich;
mod error;
mod ingest;
mod init;
mod llm;
mod output;
mod posts;
mod probe;
mod reddit;
mod server;
mod store;
mod subs;
mod telemetry;
mod trends;
mod util;
#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(name = "nichetrack", about = "Subreddit trend ingestion CLI and trigger server")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Init(init::InitCmd),
    Sub(subs::SubCmd),
    Posts(posts::PostsCmd),
    Trends(trends::TrendsCmd),
    Ingest(ingest::IngestCmd),
    Serve(server::ServeCmd),
    Probe(probe::ProbeCmd),
}

async fn connect(dsn: Option<String>) -> Result<PgPool> {
    let dsn = dsn
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("connecting to Postgres")?;
    Ok(pool)
}

impl Commands {
    // only these read the pipeline settings; the rest need just a DSN
    fn needs_config(&self) -> bool {
        matches!(self, Commands::Ingest(_) | Commands::Serve(_) | Commands::Probe(_))
    }
}

fn load_config(command: &Commands, src: &ConfigSource) -> Result<Option<AppConfig>> {
    if !command.needs_config() {
        return Ok(None);
    }
    AppConfig::from_source(src).map(Some).context("invalid configuration")
}

fn loaded(cfg: Option<AppConfig>) -> Result<AppConfig> {
    cfg.context("configuration was not loaded for this command")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and NICHETRACK_LOG_FORMAT
    telemetry::config::init_tracing();
    let cfg = load_config(&cli.command, &ConfigSource::from_env())?;

    match cli.command {
        // the probe talks to the LLM only, no database needed
        Commands::Probe(args) => probe::run(&loaded(cfg)?, args).await?,
        Commands::Init(args) => init::run(&connect(cli.dsn).await?, args).await?,
        Commands::Sub(args) => subs::run(&connect(cli.dsn).await?, args).await?,
        Commands::Posts(args) => posts::run(&connect(cli.dsn).await?, args).await?,
        Commands::Trends(args) => trends::run(&connect(cli.dsn).await?, args).await?,
        Commands::Ingest(args) => ingest::run(&connect(cli.dsn).await?, &loaded(cfg)?, args).await?,
        Commands::Serve(args) => server::serve(&connect(cli.dsn).await?, loaded(cfg)?, args).await?,
    }

    Ok(())
}
