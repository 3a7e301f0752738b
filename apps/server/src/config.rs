use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use app_settings::AppSettings;
use catalog::services::StoreDirs;

/// Process-wide handle on the persisted directory settings.
///
/// Reads are snapshots; the only mutation path is [`SettingsStore::update_root`],
/// which persists before returning. The ingestion pipeline itself never sees
/// this store, only an explicit [`StoreDirs`] taken from it.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Mutex<AppSettings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Load settings from `path`, filling in the platform default root (and
    /// persisting it) on first run.
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let mut settings = AppSettings::load_from(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        if settings.root_directory.is_none() {
            let root = app_settings::default_root().context("no platform data directory available")?;
            settings.set_root(root);
            settings
                .save_to(&path)
                .context("failed to persist default settings")?;
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(settings)),
            path,
        })
    }

    pub fn snapshot(&self) -> AppSettings {
        self.inner.lock().expect("settings poisoned").clone()
    }

    pub fn store_dirs(&self) -> StoreDirs {
        let guard = self.inner.lock().expect("settings poisoned");
        let root = guard
            .root_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        StoreDirs {
            assets_dir: guard.assets_dir.clone().unwrap_or_else(|| root.join("assets")),
            thumbnails_dir: guard
                .thumbnails_dir
                .clone()
                .unwrap_or_else(|| root.join("thumbnails")),
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        let guard = self.inner.lock().expect("settings poisoned");
        guard
            .root_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("uploads")
    }

    pub fn catalog_path(&self) -> PathBuf {
        let guard = self.inner.lock().expect("settings poisoned");
        guard
            .root_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("images.db")
    }

    /// Re-point the managed directories at a new root and persist the change.
    pub fn update_root(&self, root: PathBuf) -> anyhow::Result<AppSettings> {
        let mut guard = self.inner.lock().expect("settings poisoned");
        guard.set_root(root);
        guard
            .save_to(&self.path)
            .context("failed to persist updated directories")?;
        Ok(guard.clone())
    }
}
