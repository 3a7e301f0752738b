use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

/// Persisted layout of the managed storage directories.
///
/// `thumbnails_dir` and `assets_dir` conventionally live under
/// `root_directory`, but each is stored explicitly so the files can be
/// relocated independently if a user ever edits the settings by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    pub root_directory: Option<PathBuf>,
    pub thumbnails_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_file_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    /// Point all managed directories at `root`, using the conventional
    /// `thumbnails/` and `assets/` children.
    pub fn set_root(&mut self, root: PathBuf) {
        self.thumbnails_dir = Some(root.join("thumbnails"));
        self.assets_dir = Some(root.join("assets"));
        self.root_directory = Some(root);
    }
}

/// Platform config file holding the serialized settings.
pub fn settings_file_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("com", "Picshelf", "Picshelf")
        .ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = proj.config_dir().to_path_buf();
    std::fs::create_dir_all(&path)?;
    path.push("settings.json");
    Ok(path)
}

/// Platform data directory used as the default storage root.
pub fn default_root() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("com", "Picshelf", "Picshelf")
        .ok_or(AppSettingsError::MissingSettingsPath)?;
    Ok(proj.data_dir().to_path_buf())
}
