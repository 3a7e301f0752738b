use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use imaging::ThumbnailSpec;
use thiserror::Error;

use crate::db::{CatalogDb, ImageRecord};

/// Timestamp format for `creation_time`, shared with callers.
pub const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Public route prefix under which derived thumbnails are served.
pub const THUMBNAIL_ROUTE: &str = "/thumbnails";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid image submission: {0}")]
    Validation(String),

    #[error("referenced asset not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("thumbnail generation failed: {0}")]
    Thumbnail(#[source] imaging::ImagingError),

    #[error("failed to persist image record: {0}")]
    Persist(#[source] anyhow::Error),
}

/// Raw submission fields, exactly as supplied by the caller. Presence and
/// parseability are checked by the pipeline, not the transport.
#[derive(Debug, Clone, Default)]
pub struct ImageForm {
    pub filename: Option<String>,
    pub url: Option<String>,
    pub file_size: Option<String>,
    pub rating: Option<String>,
    pub ranking: Option<String>,
    pub tags: Option<String>,
    pub creation_time: Option<String>,
    pub person: Option<String>,
    pub location: Option<String>,
    pub image_type: Option<String>,
}

/// Where the source image bytes come from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// A staged temporary upload: relocated into the asset store by
    /// copy-then-delete, since staging and store may sit on different devices.
    UploadedTemp(PathBuf),
    /// A file the caller asserts already lives in the managed asset directory.
    ExistingAsset(String),
}

/// Managed storage layout the pipeline writes into. Passed explicitly so the
/// pipeline carries no ambient directory state.
#[derive(Debug, Clone)]
pub struct StoreDirs {
    pub assets_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
}

/// Logging-only observation hooks. Advisory: they never feed back into the
/// pipeline's control flow.
#[derive(Clone, Default)]
pub struct IngestObserver {
    pub on_asset_written: Option<Arc<dyn Fn(&Path) + Send + Sync>>,
    pub on_thumbnail_written: Option<Arc<dyn Fn(&Path) + Send + Sync>>,
}

impl IngestObserver {
    fn asset_written(&self, path: &Path) {
        if let Some(cb) = &self.on_asset_written {
            cb(path);
        }
    }

    fn thumbnail_written(&self, path: &Path) {
        if let Some(cb) = &self.on_thumbnail_written {
            cb(path);
        }
    }
}

/// High-level catalog operations above the raw row bindings.
pub struct ImageService {
    pub db: CatalogDb,
}

impl ImageService {
    pub fn new(db: CatalogDb) -> Self {
        Self { db }
    }

    pub fn list_images(&self) -> anyhow::Result<Vec<ImageRecord>> {
        ImageRecord::load_all(&self.db)
    }

    pub fn count_images(&self) -> anyhow::Result<i64> {
        ImageRecord::count(&self.db)
    }

    /// Run the full ingestion pipeline: validate, place the asset, derive a
    /// thumbnail, and commit the metadata row.
    ///
    /// The row is inserted inside a transaction that only commits once the
    /// thumbnail exists and its path is recorded, so the thumbnail can carry
    /// the record id in its file name (distinct sources sharing a base name
    /// never overwrite each other's preview) and a thumbnail failure leaves
    /// no committed row behind. An asset copied into place before a later
    /// failure stays on disk, except when the final commit itself fails, in
    /// which case cleanup is attempted best-effort.
    pub fn ingest(
        &mut self,
        form: &ImageForm,
        source: AssetSource,
        dirs: &StoreDirs,
        observer: &IngestObserver,
    ) -> Result<ImageRecord, IngestError> {
        let mut missing = Vec::new();
        let filename = required(&form.filename, "filename", &mut missing);
        let url = required(&form.url, "url", &mut missing);
        let file_size_raw = required(&form.file_size, "file_size", &mut missing);
        let rating_raw = required(&form.rating, "rating", &mut missing);
        let ranking_raw = required(&form.ranking, "ranking", &mut missing);
        let image_type = required(&form.image_type, "type", &mut missing);
        if !missing.is_empty() {
            return Err(IngestError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let safe_filename = sanitize_filename(filename).ok_or_else(|| {
            IngestError::Validation(format!("filename {filename:?} has no usable base name"))
        })?;
        let dest_path = dirs.assets_dir.join(&safe_filename);

        let copied_asset = match &source {
            AssetSource::ExistingAsset(name) => {
                if sanitize_filename(name).as_deref() != Some(safe_filename.as_str()) {
                    return Err(IngestError::Validation(format!(
                        "existing asset name {name:?} does not match filename {safe_filename:?}"
                    )));
                }
                if !dest_path.exists() {
                    return Err(IngestError::NotFound(format!(
                        "no asset named {safe_filename} in {}",
                        dirs.assets_dir.display()
                    )));
                }
                false
            }
            AssetSource::UploadedTemp(staged) => {
                place_uploaded_asset(staged, &dirs.assets_dir, &dest_path)?;
                observer.asset_written(&dest_path);
                true
            }
        };

        let file_size = core_types::parse_size(file_size_raw)
            .map_err(|err| IngestError::Validation(err.to_string()))?;
        let rating = parse_float_field("rating", rating_raw)?;
        let ranking = parse_float_field("ranking", ranking_raw)?;
        let creation_time = match form.creation_time.as_deref() {
            Some(supplied) if !supplied.trim().is_empty() => supplied.to_string(),
            _ => Local::now().format(CREATION_TIME_FORMAT).to_string(),
        };

        let record = ImageRecord {
            id: 0,
            filename: safe_filename.clone(),
            url: url.to_string(),
            file_size: file_size as i64,
            rating,
            ranking,
            tags: Some(form.tags.clone().unwrap_or_default()),
            creation_time,
            person: form.person.clone().unwrap_or_default(),
            location: form.location.clone().unwrap_or_default(),
            image_type: image_type.to_string(),
            thumbnail_path: None,
        };

        let tx = self
            .db
            .transaction()
            .map_err(|err| IngestError::Persist(err.into()))?;
        let id = record.insert(&tx).map_err(IngestError::Persist)?;

        // Dropping the transaction on the error path rolls the insert back.
        let stem = format!("{}-{id}", file_stem(&safe_filename));
        let thumb_name = imaging::write_thumbnail(
            &dest_path,
            &dirs.thumbnails_dir,
            &stem,
            &ThumbnailSpec::default(),
        )
        .map_err(IngestError::Thumbnail)?;
        let thumb_file = dirs.thumbnails_dir.join(&thumb_name);
        observer.thumbnail_written(&thumb_file);

        let public_path = format!("{THUMBNAIL_ROUTE}/{thumb_name}");
        if let Err(err) = ImageRecord::set_thumbnail_path(&tx, id, &public_path) {
            drop(tx);
            cleanup_after_failed_persist(&thumb_file, copied_asset.then_some(&dest_path));
            return Err(IngestError::Persist(err));
        }
        if let Err(err) = tx.commit() {
            cleanup_after_failed_persist(&thumb_file, copied_asset.then_some(&dest_path));
            return Err(IngestError::Persist(err.into()));
        }

        Ok(ImageRecord {
            id,
            thumbnail_path: Some(public_path),
            ..record
        })
    }
}

fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name);
            ""
        }
    }
}

/// Reduce a caller-supplied name to its bare file name component.
fn sanitize_filename(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

fn parse_float_field(name: &str, raw: &str) -> Result<f64, IngestError> {
    raw.trim()
        .parse()
        .map_err(|_| IngestError::Validation(format!("{name} must be numeric, got {raw:?}")))
}

fn place_uploaded_asset(staged: &Path, assets_dir: &Path, dest: &Path) -> Result<(), IngestError> {
    fs::create_dir_all(assets_dir)?;
    fs::copy(staged, dest)?;
    fs::remove_file(staged)?;
    Ok(())
}

/// Best effort only: a failed cleanup is logged, never escalated.
fn cleanup_after_failed_persist(thumbnail: &Path, copied_asset: Option<&PathBuf>) {
    if let Err(err) = fs::remove_file(thumbnail) {
        tracing::warn!(
            path = %thumbnail.display(), %err,
            "failed to remove thumbnail after persist failure"
        );
    }
    if let Some(asset) = copied_asset {
        if let Err(err) = fs::remove_file(asset) {
            tracing::warn!(
                path = %asset.display(), %err,
                "failed to remove copied asset after persist failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn service() -> ImageService {
        ImageService::new(CatalogDb::in_memory().unwrap())
    }

    fn write_test_image(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 10, 200, 255]));
        img.save(path).unwrap();
    }

    fn form() -> ImageForm {
        ImageForm {
            filename: Some("sunset.png".into()),
            url: Some("http://example.com/sunset.png".into()),
            file_size: Some("1.5 MB".into()),
            rating: Some("8.5".into()),
            ranking: Some("1".into()),
            tags: Some("sunset,beach".into()),
            creation_time: Some("2024-09-10 16:02:00".into()),
            person: Some("John Doe".into()),
            location: Some("Hawaii".into()),
            image_type: Some("PNG".into()),
        }
    }

    fn dirs(root: &Path) -> StoreDirs {
        StoreDirs {
            assets_dir: root.join("assets"),
            thumbnails_dir: root.join("thumbnails"),
        }
    }

    #[test]
    fn ingest_uploaded_file_commits_one_record() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        write_test_image(&staged, 200, 100);
        let dirs = dirs(tmp.path());
        let mut service = service();

        let record = service
            .ingest(
                &form(),
                AssetSource::UploadedTemp(staged.clone()),
                &dirs,
                &IngestObserver::default(),
            )
            .expect("ingest");

        assert_eq!(record.filename, "sunset.png");
        assert_eq!(record.file_size, 1_572_864);
        assert_eq!(record.creation_time, "2024-09-10 16:02:00");
        assert_eq!(record.thumbnail_path.as_deref(), Some("/thumbnails/sunset-1.jpg"));
        assert!(dirs.assets_dir.join("sunset.png").exists());
        assert!(dirs.thumbnails_dir.join("sunset-1.jpg").exists());
        assert!(!staged.exists(), "staging copy must be removed");
        assert_eq!(service.count_images().unwrap(), 1);
    }

    #[test]
    fn filename_is_reduced_to_base_name() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        write_test_image(&staged, 64, 64);
        let dirs = dirs(tmp.path());
        let mut service = service();

        let form = ImageForm {
            filename: Some("../../etc/sunset.png".into()),
            ..form()
        };
        let record = service
            .ingest(
                &form,
                AssetSource::UploadedTemp(staged),
                &dirs,
                &IngestObserver::default(),
            )
            .expect("ingest");

        assert_eq!(record.filename, "sunset.png");
        assert!(dirs.assets_dir.join("sunset.png").exists());
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let tmp = tempdir().unwrap();
        let mut service = service();
        let form = ImageForm {
            filename: Some("a.png".into()),
            ..ImageForm::default()
        };

        let err = service
            .ingest(
                &form,
                AssetSource::ExistingAsset("a.png".into()),
                &dirs(tmp.path()),
                &IngestObserver::default(),
            )
            .unwrap_err();

        match err {
            IngestError::Validation(msg) => {
                for field in ["url", "file_size", "rating", "ranking", "type"] {
                    assert!(msg.contains(field), "expected {field} in {msg:?}");
                }
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(service.count_images().unwrap(), 0);
    }

    #[test]
    fn missing_existing_asset_is_not_found() {
        let tmp = tempdir().unwrap();
        let mut service = service();
        let form = ImageForm {
            filename: Some("ghost.png".into()),
            ..form()
        };

        let err = service
            .ingest(
                &form,
                AssetSource::ExistingAsset("ghost.png".into()),
                &dirs(tmp.path()),
                &IngestObserver::default(),
            )
            .unwrap_err();

        assert!(matches!(err, IngestError::NotFound(_)));
        assert_eq!(service.count_images().unwrap(), 0);
    }

    #[test]
    fn existing_asset_is_ingested_in_place() {
        let tmp = tempdir().unwrap();
        let dirs = dirs(tmp.path());
        fs::create_dir_all(&dirs.assets_dir).unwrap();
        write_test_image(&dirs.assets_dir.join("sunset.png"), 100, 200);
        let mut service = service();

        let record = service
            .ingest(
                &form(),
                AssetSource::ExistingAsset("sunset.png".into()),
                &dirs,
                &IngestObserver::default(),
            )
            .expect("ingest");

        assert_eq!(record.thumbnail_path.as_deref(), Some("/thumbnails/sunset-1.jpg"));
        assert!(dirs.assets_dir.join("sunset.png").exists());
        assert_eq!(service.count_images().unwrap(), 1);
    }

    #[test]
    fn thumbnail_failure_commits_nothing() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        fs::write(&staged, b"not an image").unwrap();
        let dirs = dirs(tmp.path());
        let mut service = service();

        let err = service
            .ingest(
                &form(),
                AssetSource::UploadedTemp(staged.clone()),
                &dirs,
                &IngestObserver::default(),
            )
            .unwrap_err();

        assert!(matches!(err, IngestError::Thumbnail(_)));
        assert_eq!(service.count_images().unwrap(), 0);
        // Accepted partial effect: the placed asset stays, the staging copy is gone.
        assert!(dirs.assets_dir.join("sunset.png").exists());
        assert!(!staged.exists());
        assert!(!dirs.thumbnails_dir.join("sunset-1.jpg").exists());
    }

    #[test]
    fn unparsable_size_is_a_validation_error() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        write_test_image(&staged, 64, 64);
        let mut service = service();

        let form = ImageForm {
            file_size: Some("abc".into()),
            ..form()
        };
        let err = service
            .ingest(
                &form,
                AssetSource::UploadedTemp(staged),
                &dirs(tmp.path()),
                &IngestObserver::default(),
            )
            .unwrap_err();

        assert!(matches!(err, IngestError::Validation(_)));
        assert_eq!(service.count_images().unwrap(), 0);
    }

    #[test]
    fn blank_creation_time_is_stamped() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        write_test_image(&staged, 64, 64);
        let mut service = service();

        let form = ImageForm {
            creation_time: None,
            ..form()
        };
        let record = service
            .ingest(
                &form,
                AssetSource::UploadedTemp(staged),
                &dirs(tmp.path()),
                &IngestObserver::default(),
            )
            .expect("ingest");

        // Shape check only: "YYYY-MM-DD HH:MM:SS".
        assert_eq!(record.creation_time.len(), 19);
        assert_eq!(&record.creation_time[4..5], "-");
        assert_eq!(&record.creation_time[10..11], " ");
    }

    #[test]
    fn equal_base_names_get_distinct_thumbnails() {
        let tmp = tempdir().unwrap();
        let dirs = dirs(tmp.path());
        let mut service = service();

        for _ in 0..2 {
            let staged = tmp.path().join("staged.png");
            write_test_image(&staged, 64, 64);
            service
                .ingest(
                    &form(),
                    AssetSource::UploadedTemp(staged),
                    &dirs,
                    &IngestObserver::default(),
                )
                .expect("ingest");
        }

        assert!(dirs.thumbnails_dir.join("sunset-1.jpg").exists());
        assert!(dirs.thumbnails_dir.join("sunset-2.jpg").exists());
    }

    #[test]
    fn observer_sees_asset_and_thumbnail_writes() {
        let tmp = tempdir().unwrap();
        let staged = tmp.path().join("staged.png");
        write_test_image(&staged, 64, 64);
        let mut service = service();

        let assets_seen = Arc::new(AtomicUsize::new(0));
        let thumbs_seen = Arc::new(AtomicUsize::new(0));
        let observer = IngestObserver {
            on_asset_written: Some({
                let seen = assets_seen.clone();
                Arc::new(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
            }),
            on_thumbnail_written: Some({
                let seen = thumbs_seen.clone();
                Arc::new(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
            }),
        };

        service
            .ingest(
                &form(),
                AssetSource::UploadedTemp(staged),
                &dirs(tmp.path()),
                &observer,
            )
            .expect("ingest");

        assert_eq!(assets_seen.load(Ordering::SeqCst), 1);
        assert_eq!(thumbs_seen.load(Ordering::SeqCst), 1);
    }
}
