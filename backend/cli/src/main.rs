mod bootstrap;
mod repl;
mod terminal_output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use parley_config::ParleyConfig;
use parley_gateway::GatewayState;

use terminal_output::{note_info, note_success, note_warn, render_entry, render_tools};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley: a tool-routing chat agent")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.parley/config.yaml, or $PARLEY_CONFIG_DIR/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Chat interactively in the terminal
    Chat {
        /// Session to continue (a new one is minted if omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Print a session's history
    History { session_id: String },
    /// Delete a session's history
    Reset { session_id: String },
    /// List the registered tools
    Tools,
    /// Check whether a server is running
    Status,
    /// Write a default config file
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = bootstrap::resolve_config_path(cli.config);

    if let Commands::Init { force } = cli.command {
        return init(&config_path, force).await;
    }

    let config = parley_config::load_and_prepare(&config_path).await?;
    // The chat REPL keeps the console quiet unless asked otherwise.
    let level = match cli.command {
        Commands::Chat { .. } if std::env::var("RUST_LOG").is_err() => "warn",
        _ => config.logging.level.as_str(),
    };
    parley_logging::init_logger(config.logging.dir.as_deref(), level, config.logging.json);
    info!(path = %config_path.display(), "Configuration ready");

    match cli.command {
        Commands::Serve { port, bind } => serve(config, port, bind).await?,
        Commands::Chat { session } => {
            let service = bootstrap::build_service(&config)?;
            let session_id = session
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(parley_agent::mint_session_id);
            repl::run(service, session_id).await?;
        }
        Commands::History { session_id } => {
            let service = bootstrap::build_service(&config)?;
            let history = service.history(&session_id).await?;
            if history.history.is_empty() {
                note_info(&format!("No history for session {session_id}"));
            }
            for entry in &history.history {
                print!("{}", render_entry(entry));
            }
        }
        Commands::Reset { session_id } => {
            let service = bootstrap::build_service(&config)?;
            let reset = service.reset(&session_id).await?;
            note_success(&reset.status);
        }
        Commands::Tools => {
            let service = bootstrap::build_service(&config)?;
            print!("{}", render_tools(&service.tools()));
        }
        Commands::Status => status(&config).await?,
        Commands::Config => {
            let redacted = parley_config::redact(&config);
            print!("{}", serde_yaml::to_string(&redacted)?);
        }
        Commands::Init { force } => init(&config_path, force).await?,
    }

    Ok(())
}

async fn serve(config: ParleyConfig, port: Option<u16>, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {bind}:{port}"))?;

    if config.storage.backend == parley_config::StorageBackend::Memory {
        note_warn("Session history is kept in memory and lost on restart");
    }
    info!(provider = ?config.llm.provider, model = %config.llm.model, "Starting Parley");

    let service = bootstrap::build_service(&config)?;
    parley_gateway::start_server(addr, GatewayState::new(service)).await
}

async fn status(config: &ParleyConfig) -> Result<()> {
    let url = format!("http://127.0.0.1:{}/", config.server.port);
    match reqwest::get(&url).await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => note_warn(&format!("Parley is not running on port {}", config.server.port)),
    }
    Ok(())
}

async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    parley_config::write_config(&ParleyConfig::default(), path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
