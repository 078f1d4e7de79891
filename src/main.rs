use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tinybin::config::Config;
use tinybin::{commands, App};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server.
    Serve,
    /// Print live pastes, newest first.
    List {
        /// Order by size instead, largest first.
        #[arg(long)]
        top: bool,
        /// How many pastes to print.
        #[arg(short = 'n', long, default_value_t = commands::serve::LIST_LIMIT)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    info!("using config {}", config_path.display());
    let config = Config::load(&config_path).await?;

    let app = App::new(config).await?;

    match cli.command {
        Command::Serve => commands::serve::run(app).await,
        Command::List { top, count } => commands::list::run(app, top, count).await,
    }
}
