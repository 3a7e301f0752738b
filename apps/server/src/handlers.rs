//! HTTP handlers for the picshelf API.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::extract::{Multipart, State};
use axum::Json;
use catalog::services::{AssetSource, ImageForm, IngestError};
use core_types::format_size;
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::error::{ApiError, Result};
use crate::presenter::{self, DisplayRecord};
use crate::AppState;

pub async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<DisplayRecord>>> {
    let service = state.service.clone();
    let records = task::spawn_blocking(move || {
        let service = service.lock().expect("service poisoned");
        service.list_images()
    })
    .await
    .map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))??;

    Ok(Json(presenter::present(records)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub root_directory: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub assets_dir: PathBuf,
}

pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let snapshot = state.settings.snapshot();
    let dirs = state.settings.store_dirs();
    Json(SettingsResponse {
        root_directory: snapshot.root_directory.unwrap_or_default(),
        thumbnails_dir: dirs.thumbnails_dir,
        assets_dir: dirs.assets_dir,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirectoriesRequest {
    #[serde(default)]
    pub root_directory: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDirectoriesResponse {
    pub success: bool,
    pub thumbnails_dir: PathBuf,
    pub assets_dir: PathBuf,
}

pub async fn update_directories(
    State(state): State<AppState>,
    Json(request): Json<UpdateDirectoriesRequest>,
) -> Result<Json<UpdateDirectoriesResponse>> {
    let root = request
        .root_directory
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("rootDirectory is required".into()))?;
    let root = PathBuf::from(root);

    let thumbnails_dir = root.join("thumbnails");
    let assets_dir = root.join("assets");
    std::fs::create_dir_all(&thumbnails_dir).context("failed to create thumbnails directory")?;
    std::fs::create_dir_all(&assets_dir).context("failed to create assets directory")?;

    state.settings.update_root(root)?;
    tracing::info!(
        thumbnails = %thumbnails_dir.display(),
        assets = %assets_dir.display(),
        "managed directories updated"
    );

    Ok(Json(UpdateDirectoriesResponse {
        success: true,
        thumbnails_dir,
        assets_dir,
    }))
}

pub async fn add_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DisplayRecord>> {
    let mut form = ImageForm::default();
    let mut use_existing = false;
    let mut staged: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "thumbnail" {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            staged = Some(stage_upload(&state.uploads_dir, &bytes).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            apply_text_field(&mut form, &mut use_existing, &name, value);
        }
    }

    let source = if use_existing {
        let filename = form.filename.clone().ok_or_else(|| {
            ApiError::Ingest(IngestError::Validation(
                "missing required field(s): filename".into(),
            ))
        })?;
        AssetSource::ExistingAsset(filename)
    } else {
        let staged = staged.ok_or_else(|| ApiError::BadRequest("no image uploaded".into()))?;
        AssetSource::UploadedTemp(staged)
    };

    let dirs = state.settings.store_dirs();
    let service = state.service.clone();
    let observer = state.observer.clone();
    let record = task::spawn_blocking(move || {
        let mut service = service.lock().expect("service poisoned");
        service.ingest(&form, source, &dirs, &observer)
    })
    .await
    .map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))??;

    Ok(Json(presenter::display_record(record)))
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub original_size: String,
    pub converted_size: String,
    pub original_size_bytes: u64,
    pub converted_size_bytes: u64,
    pub savings_percent: f64,
}

pub async fn convert_image(mut multipart: Multipart) -> Result<Json<ConvertResponse>> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut quality: u8 = 80;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
                image_bytes = Some(bytes.to_vec());
            }
            "quality" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
                quality = raw.trim().parse().map_err(|_| {
                    ApiError::BadRequest(format!("quality must be 0-100, got {raw:?}"))
                })?;
            }
            _ => {}
        }
    }

    let bytes = image_bytes.ok_or_else(|| ApiError::BadRequest("missing image part".into()))?;
    let original_size_bytes = bytes.len() as u64;

    let converted = task::spawn_blocking(move || imaging::reencode_preview(&bytes, quality))
        .await
        .map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))??;

    let converted_size_bytes = converted.len() as u64;
    let savings_percent = if original_size_bytes == 0 {
        0.0
    } else {
        let ratio = 1.0 - converted_size_bytes as f64 / original_size_bytes as f64;
        (ratio * 10_000.0).round() / 100.0
    };

    Ok(Json(ConvertResponse {
        original_size: format_size(original_size_bytes),
        converted_size: format_size(converted_size_bytes),
        original_size_bytes,
        converted_size_bytes,
        savings_percent,
    }))
}

fn apply_text_field(form: &mut ImageForm, use_existing: &mut bool, name: &str, value: String) {
    match name {
        "filename" => form.filename = Some(value),
        "url" => form.url = Some(value),
        "file_size" => form.file_size = Some(value),
        "rating" => form.rating = Some(value),
        "ranking" => form.ranking = Some(value),
        "tags" => form.tags = Some(value),
        "creation_time" => form.creation_time = Some(value),
        "person" => form.person = Some(value),
        "location" => form.location = Some(value),
        "type" => form.image_type = Some(value),
        "use_existing_file" => *use_existing = matches!(value.trim(), "true" | "1" | "on"),
        _ => tracing::debug!(field = name, "ignoring unknown form field"),
    }
}

/// Write an uploaded body into the staging directory under a unique name.
/// The pipeline relocates it into the asset store and removes the staging copy.
async fn stage_upload(uploads_dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|err| ApiError::Ingest(IngestError::Io(err)))?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let path = uploads_dir.join(format!("upload-{stamp}-{seq}"));

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| ApiError::Ingest(IngestError::Io(err)))?;
    Ok(path)
}
