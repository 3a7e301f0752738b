mod config;
mod error;
mod handlers;
mod presenter;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use catalog::db::CatalogDb;
use catalog::services::{ImageService, IngestObserver};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::SettingsStore;

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<ImageService>>,
    pub settings: SettingsStore,
    pub uploads_dir: PathBuf,
    pub observer: IngestObserver,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picshelf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings_path = app_settings::settings_file_path().context("no settings path available")?;
    let settings = SettingsStore::open(settings_path)?;

    let dirs = settings.store_dirs();
    std::fs::create_dir_all(&dirs.assets_dir).context("failed to create assets directory")?;
    std::fs::create_dir_all(&dirs.thumbnails_dir)
        .context("failed to create thumbnails directory")?;
    let uploads_dir = settings.uploads_dir();
    std::fs::create_dir_all(&uploads_dir).context("failed to create uploads directory")?;

    let default_thumbnail = dirs.thumbnails_dir.join("default-thumbnail.jpg");
    if !default_thumbnail.exists() {
        imaging::write_placeholder(&default_thumbnail, 150)
            .context("failed to write default thumbnail")?;
    }

    let catalog_path = settings.catalog_path();
    let db = CatalogDb::open(&catalog_path)
        .with_context(|| format!("failed to open catalog at {}", catalog_path.display()))?;
    tracing::info!(path = %catalog_path.display(), "catalog opened");

    // Advisory only: these callbacks log writes and never steer the pipeline.
    let observer = IngestObserver {
        on_asset_written: Some(Arc::new(|path: &Path| {
            tracing::info!(path = %path.display(), "asset written");
        })),
        on_thumbnail_written: Some(Arc::new(|path: &Path| {
            tracing::info!(path = %path.display(), "thumbnail written");
        })),
    };

    let state = AppState {
        service: Arc::new(Mutex::new(ImageService::new(db))),
        settings,
        uploads_dir,
        observer,
    };

    let app = Router::new()
        .route("/api/images", get(handlers::list_images))
        .route("/api/settings", get(handlers::get_settings))
        .route(
            "/api/settings/update-directories",
            post(handlers::update_directories),
        )
        .route("/add_image", post(handlers::add_image))
        .route("/api/convert", post(handlers::convert_image))
        .nest_service("/thumbnails", ServeDir::new(&dirs.thumbnails_dir))
        .nest_service("/assets", ServeDir::new(&dirs.assets_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3011".into());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("picshelf listening on http://{bind_address}");
    axum::serve(listener, app).await?;
    Ok(())
}
