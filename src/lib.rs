use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use clap::{Parser, Subcommand};

pub mod common; // Shared entity types
pub mod config;
pub mod validation;
pub mod store;
pub mod collections;
pub mod auth;
pub mod api;
pub mod cli;

use config::{Config, LoggingConfig};

#[derive(Parser)]
#[command(name = "clinicnotes")]
#[command(about = "ClinicNotes - clinical documentation backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server (default)
    Start {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to a .toml or .json config file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Write the default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "clinicnotes.toml")]
        output: String,
    },
    /// Read the datastore and report missing or backfilled collections
    Check {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Generate a session token for API calls
    Token {
        /// User id placed in the token subject
        #[arg(short, long, default_value = "1")]
        user: String,
        /// Comma-separated roles
        #[arg(short, long, default_value = "clinician")]
        roles: String,
        /// Token lifetime in hours (overrides the config file)
        #[arg(short, long)]
        expiry_hours: Option<u64>,
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Install the global fmt subscriber
pub fn init_logging(logging: &LoggingConfig) {
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level);

    let result = if logging.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

async fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = Config::resolve(path).await?;
    if let Err(errors) = config.validate() {
        return Err(format!("Invalid configuration: {}", errors.join("; ")).into());
    }
    Ok(config)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { port, config }) => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(port) = port {
                config.server.port = port;
            }
            init_logging(&config.logging);
            start_server(config).await?;
        }
        Some(Commands::Init { output }) => {
            cli::run_init(&output).await?;
        }
        Some(Commands::Check { config }) => {
            let config = load_config(config.as_deref()).await?;
            init_logging(&config.logging);
            cli::run_check(&config).await?;
        }
        Some(Commands::Token { user, roles, expiry_hours, config }) => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(hours) = expiry_hours {
                config.auth.session_ttl_hours = hours;
            }
            cli::generate_token(&config, &user, &roles)?;
        }
        None => {
            let config = load_config(None).await?;
            init_logging(&config.logging);
            start_server(config).await?;
        }
    }

    Ok(())
}

async fn start_server(mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ClinicNotes...");

    if auth::ensure_secret(&mut config.auth)? {
        warn!("auth.jwt_secret is not set; using a random secret, sessions end on restart");
    }

    let store = Arc::new(store::Datastore::from_config(&config.storage).await?);
    // Seed or load now so a broken data directory fails at startup
    let db = store.read_db().await?;
    info!(
        path = %store.path().display(),
        patients = db.patients.len(),
        recordings = db.recordings.len(),
        "Datastore ready"
    );

    let state = api::AppState::new(store, &config);
    let app = api::router(state);

    let addr: std::net::SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("ClinicNotes listening on {}", addr);

    match (&config.server.tls_cert, &config.server.tls_key) {
        (Some(cert), Some(key)) if PathBuf::from(cert).exists() && PathBuf::from(key).exists() => {
            info!("TLS enabled using {} and {}", cert, key);
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            if config.server.tls_cert.is_some() {
                warn!("TLS files not found, starting in HTTP mode");
            }
            let listener = TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
