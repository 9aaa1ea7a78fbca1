use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use devpad_api::{AppStateInner, router};

/// Process-wide configuration, read from the environment exactly once at
/// startup. Defaults are development-grade.
struct Config {
    jwt_secret: String,
    db_path: PathBuf,
    host: String,
    port: u16,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("DEVPAD_JWT_SECRET")
                .unwrap_or_else(|_| "devpad-secret-key".into()),
            db_path: std::env::var("DEVPAD_DB_PATH")
                .unwrap_or_else(|_| "devpad.db".into())
                .into(),
            host: std::env::var("DEVPAD_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("DEVPAD_PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "devpad_server=debug,devpad_api=debug,devpad_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = devpad_db::Database::open(&config.db_path)?;

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("DevPad server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
