use crate::db::{query_all, query_one, DbHandle, DbResult};
use anyhow::Context;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// A cataloged image row. `file_size` is always the canonical byte count;
/// the human-readable form is derived at display time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub file_size: i64,
    pub rating: f64,
    pub ranking: f64,
    pub tags: Option<String>,
    pub creation_time: String,
    pub person: String,
    pub location: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub thumbnail_path: Option<String>,
}

impl ImageRecord {
    pub fn insert<H: DbHandle>(&self, db: &H) -> DbResult<i64> {
        db.execute(
            "INSERT INTO images (
                filename, url, file_size, rating, ranking, tags,
                creation_time, person, location, type, thumbnail_path
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                self.filename,
                self.url,
                self.file_size,
                self.rating,
                self.ranking,
                self.tags,
                self.creation_time,
                self.person,
                self.location,
                self.image_type,
                self.thumbnail_path
            ],
        )
        .with_context(|| format!("failed to insert image filename={}", self.filename))?;
        Ok(db.last_insert_rowid())
    }

    pub fn load<H: DbHandle>(db: &H, id: i64) -> DbResult<Self> {
        query_one(
            db,
            "SELECT id, filename, url, file_size, rating, ranking, tags,
                    creation_time, person, location, type, thumbnail_path
             FROM images WHERE id = ?1",
            params![id],
            ImageRecord::from_row,
        )
        .with_context(|| format!("failed to load image id={id}"))
    }

    /// All rows in stored (rowid) order; display ordering is the presenter's job.
    pub fn load_all<H: DbHandle>(db: &H) -> DbResult<Vec<Self>> {
        query_all(
            db,
            "SELECT id, filename, url, file_size, rating, ranking, tags,
                    creation_time, person, location, type, thumbnail_path
             FROM images
             ORDER BY id",
            [],
            ImageRecord::from_row,
        )
    }

    pub fn set_thumbnail_path<H: DbHandle>(db: &H, id: i64, thumbnail_path: &str) -> DbResult<()> {
        db.execute(
            "UPDATE images SET thumbnail_path = ?1 WHERE id = ?2",
            params![thumbnail_path, id],
        )
        .with_context(|| format!("failed to set thumbnail path for image id={id}"))?;
        Ok(())
    }

    pub fn count<H: DbHandle>(db: &H) -> DbResult<i64> {
        query_one(db, "SELECT COUNT(*) FROM images", [], |row| {
            Ok(row.get::<_, i64>(0)?)
        })
    }

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            url: row.get(2)?,
            file_size: row.get(3)?,
            rating: row.get(4)?,
            ranking: row.get(5)?,
            tags: row.get(6)?,
            creation_time: row.get(7)?,
            person: row.get(8)?,
            location: row.get(9)?,
            image_type: row.get(10)?,
            thumbnail_path: row.get(11)?,
        })
    }
}
