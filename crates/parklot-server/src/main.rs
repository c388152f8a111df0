//! Parklot Server
//!
//! HTTP server for parking lot management and spot reservations.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use parklot_core::config::{self, AdminCredentials};
use parklot_core::tracing_init::init_tracing;

use parklot_server::auth::{JwtManager, hash_password};
use parklot_server::lifecycle::BookingClock;
use parklot_server::routes::{AppState, build_router};
use parklot_server::storage::ParkingDatabase;
use parklot_server::sweeper;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "parklot-server")]
#[command(version, about = "Parklot server - parking lots, spots and reservations")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "PARKLOT_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Local UTC offset in minutes used to read booking times.
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Seconds between expiry sweeps.
    #[arg(long)]
    sweep_interval: Option<u64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if let Some(offset) = args.utc_offset_minutes {
        config.booking.utc_offset_minutes = offset;
    }
    if let Some(secs) = args.sweep_interval {
        config.booking.sweep_interval_secs = secs;
    }
    config.server.log_json |= args.log_json;

    init_tracing("parklot_server=info,tower_http=info", config.server.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting parklot-server"
    );
    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Using the default JWT secret; set PARKLOT_JWT_SECRET in production");
    }

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => config::database_path().context("Cannot determine data directory")?,
    };
    info!(path = %db_path.display(), "Opening parking database");
    let db = ParkingDatabase::open(&db_path).await?;

    if db.count_admins().await? == 0 {
        match &config.auth.bootstrap_admin {
            Some(admin) => bootstrap_admin(&db, admin).await?,
            None => warn!(
                "No admin account exists; set PARKLOT_ADMIN_USERNAME and PARKLOT_ADMIN_PASSWORD"
            ),
        }
    }

    let clock = BookingClock::new(config.booking.utc_offset_minutes)?;
    let state = AppState {
        db: db.clone(),
        jwt: Arc::new(JwtManager::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.session_ttl_secs,
        )),
        clock,
    };

    let sweep_task = sweeper::spawn(
        db.clone(),
        Duration::from_secs(config.booking.sweep_interval_secs),
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    sweep_task.abort();
    db.close().await;
    info!("Server stopped");
    Ok(())
}

/// Create the first admin account from configured credentials.
async fn bootstrap_admin(db: &ParkingDatabase, creds: &AdminCredentials) -> anyhow::Result<()> {
    let hash = hash_password(&creds.password).context("Failed to hash admin password")?;
    let admin = db.create_admin(&creds.username, &hash).await?;
    info!(admin_id = admin.id, username = %admin.username, "Bootstrap admin created");
    Ok(())
}
