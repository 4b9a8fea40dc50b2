use std::{env, net::SocketAddr, path::PathBuf};

use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backend::{build_router, db::initialize, graceful_shutdown, AppConfig};

/// The HTTP server for the personal finance tracker.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the SQLite database file. Created and initialized if it does
    /// not exist yet.
    #[arg(long, default_value = "finance.db")]
    database: PathBuf,

    /// The port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let jwt_secret =
        env::var("JWT_SECRET").expect("The environment variable 'JWT_SECRET' must be set.");

    let database_exists = args.database.is_file();
    let connection = Connection::open(&args.database).expect("Could not open database.");

    if !database_exists {
        tracing::info!("Creating new database at {:?}", args.database);
        initialize(&connection).expect("Could not initialize database.");
    }

    let app_config = AppConfig::new(connection, jwt_secret);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    tracing::info!("Server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(build_router().with_state(app_config).into_make_service())
        .await
        .unwrap();
}
