//! Marina reservation server and admin CLI
//!
//! ## Commands
//!
//! - `serve`: run the HTTP API
//! - `seed`: load catways and reservations from JSON or RON files
//! - `check`: print catway and reservation totals
//! - `issue-token`: sign a bearer token for a role and subject
//!
//! Configuration comes from a RON file (`--config`, default
//! `config/marina.ron`); `MARINA_TOKEN_SECRET` and `MARINA_DB_PATH` override
//! the file. `RUST_LOG` overrides the configured log level.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use marina_db::Store;
use marina_seed::{SeedOptions, Seeder};
use marina_server::{handle_request, AppState, Config, Role, TokenSigner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Marina berth reservation server")]
struct Cli {
    /// RON configuration file
    #[arg(long, default_value = "config/marina.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// Load catways and reservations from files
    Seed {
        /// Catways file (.json or .ron)
        #[arg(long)]
        catways: PathBuf,
        /// Reservations file (.json or .ron)
        #[arg(long)]
        reservations: Option<PathBuf>,
        /// Remove every existing catway and reservation first
        #[arg(long)]
        replace: bool,
    },
    /// Print catway and reservation totals
    Check,
    /// Sign a bearer token
    IssueToken {
        /// admin or user
        #[arg(long, default_value = "user")]
        role: String,
        /// Who the token is for
        #[arg(long)]
        subject: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
                config.validate()?;
            }
            tokio::runtime::Runtime::new()
                .context("starting tokio runtime")?
                .block_on(serve(config))
        }
        Command::Seed {
            catways,
            reservations,
            replace,
        } => {
            let store = open_store(&config)?;
            let report = Seeder::new(&store, SeedOptions { replace })
                .seed_files(&catways, reservations.as_deref())?;
            println!(
                "catways: {} inserted, {} skipped",
                report.catways_inserted, report.catways_skipped
            );
            println!(
                "reservations: {} inserted, {} skipped",
                report.reservations_inserted, report.reservations_skipped
            );
            Ok(())
        }
        Command::Check => {
            let store = open_store(&config)?;
            let (catways, reservations) = store.counts()?;
            println!("catways: {}", catways);
            println!("reservations: {}", reservations);
            Ok(())
        }
        Command::IssueToken { role, subject } => {
            let role: Role = role
                .parse()
                .map_err(|_| anyhow::anyhow!("role must be 'admin' or 'user', got '{}'", role))?;
            let signer = TokenSigner::new(&config.token_secret, config.token_ttl_secs);
            println!("{}", signer.issue(role, &subject));
            Ok(())
        }
    }
}

fn open_store(config: &Config) -> Result<Store> {
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Store::open(&config.db_path).with_context(|| format!("opening {}", config.db_path))
}

async fn serve(config: Config) -> Result<()> {
    let addr = config.listen_addr()?;
    let store = Arc::new(open_store(&config)?);
    let state = Arc::new(AppState {
        store,
        signer: TokenSigner::new(&config.token_secret, config.token_ttl_secs),
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "marina server listening");

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(state.clone(), req));

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%remote_addr, error = %e, "connection error");
            }
        });
    }
}
