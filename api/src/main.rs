mod cors;
mod error;
mod handlers;
mod network;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use network::NetworkProbe;
use photo_click_capture::{Camera, SnapshotOptions, SystemCamera};
use photo_click_common::config::{Config, ConfigError};
use photo_click_common::store::{SnapshotStore, IMAGES_URL_PREFIX};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "config.toml";

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct AppState {
    store: SnapshotStore,
    camera: Arc<dyn Camera>,
    snapshot_options: SnapshotOptions,
    network: NetworkProbe,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn app(state: Arc<AppState>, cors_origins: Vec<String>) -> Router {
    let images = ServeDir::new(state.store.dir());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/network-info", get(handlers::network_info))
        .route("/snapshot", post(handlers::snapshot))
        .route("/photos", get(handlers::list_photos))
        .nest_service(IMAGES_URL_PREFIX, images)
        .layer(cors::cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

/// Config from the path given on the command line, else `default` when
/// present, else built-in defaults. Also returns the directory relative paths
/// resolve against.
fn load_config(arg: Option<PathBuf>, default: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let path = match arg {
        Some(path) => path,
        None if default.exists() => default.to_path_buf(),
        None => return Ok((Config::default(), PathBuf::from("."))),
    };

    let config = Config::load(&path)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

#[tokio::main]
async fn main() {
    let config_arg = std::env::args().nth(1).map(PathBuf::from);

    let (config, base_dir) = match load_config(config_arg, Path::new(DEFAULT_CONFIG)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let store = match config
        .images_dir(&base_dir)
        .map_err(|e| e.to_string())
        .and_then(|dir| SnapshotStore::open(dir).map_err(|e| e.to_string()))
    {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to prepare images directory: {e}");
            std::process::exit(1);
        }
    };

    let network = match NetworkProbe::new(&config.network) {
        Ok(probe) => probe,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    if config.api.cors_origins.is_empty() {
        warn!("no CORS origins configured; browsers on other origins will be refused");
    }

    info!(
        images_dir = %store.dir().display(),
        ffmpeg = config.capture.ffmpeg_bin,
        width = config.capture.width,
        height = config.capture.height,
        "snapshot store ready"
    );

    let state = Arc::new(AppState {
        store,
        camera: Arc::new(SystemCamera::new(&config.capture)),
        snapshot_options: SnapshotOptions::from(&config.capture),
        network,
    });

    let router = app(state, config.api.cors_origins.clone());

    let addr = format!("{}:{}", config.api.bind, config.api.port);
    info!(addr, "photo-click API server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
