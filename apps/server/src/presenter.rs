//! Maps stored records into their display-ready shape.

use std::path::Path;

use catalog::db::ImageRecord;
use catalog::services::THUMBNAIL_ROUTE;
use core_types::format_size;
use serde::Serialize;

/// Served in place of a missing thumbnail.
pub const DEFAULT_THUMBNAIL: &str = "/thumbnails/default-thumbnail.jpg";

#[derive(Debug, Clone, Serialize)]
pub struct DisplayRecord {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub file_size: String,
    pub rating: f64,
    pub ranking: f64,
    pub tags: String,
    pub creation_time: String,
    pub person: String,
    pub location: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub thumbnail_path: String,
}

/// Format and sort records for display: `ranking` ascending, ties broken by
/// `rating` descending. The sort is stable, so full ties keep scan order.
pub fn present(records: Vec<ImageRecord>) -> Vec<DisplayRecord> {
    let mut out: Vec<DisplayRecord> = records.into_iter().map(display_record).collect();
    out.sort_by(|a, b| {
        a.ranking
            .total_cmp(&b.ranking)
            .then_with(|| b.rating.total_cmp(&a.rating))
    });
    out
}

pub fn display_record(record: ImageRecord) -> DisplayRecord {
    DisplayRecord {
        id: record.id,
        filename: record.filename,
        url: record.url,
        file_size: format_size(record.file_size.max(0) as u64),
        rating: record.rating,
        ranking: record.ranking,
        tags: record.tags.unwrap_or_default(),
        creation_time: record.creation_time,
        person: record.person,
        location: record.location,
        image_type: record.image_type,
        thumbnail_path: public_thumbnail_path(record.thumbnail_path.as_deref()),
    }
}

/// Strip a stored thumbnail path to its file name and re-anchor it under the
/// public thumbnail route; records without one get the stock placeholder.
fn public_thumbnail_path(stored: Option<&str>) -> String {
    let Some(stored) = stored else {
        return DEFAULT_THUMBNAIL.to_string();
    };
    let name = Path::new(stored)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(stored);
    format!("{THUMBNAIL_ROUTE}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, ranking: f64, rating: f64) -> ImageRecord {
        ImageRecord {
            id,
            filename: format!("img{id}.jpg"),
            url: "http://example.com/img.jpg".into(),
            file_size: 2048,
            rating,
            ranking,
            tags: None,
            creation_time: "2024-01-01 00:00:00".into(),
            person: String::new(),
            location: String::new(),
            image_type: "JPEG".into(),
            thumbnail_path: Some(format!("/thumbnails/img{id}-{id}.jpg")),
        }
    }

    #[test]
    fn ranking_orders_before_rating() {
        let shown = present(vec![record(1, 2.0, 9.0), record(2, 1.0, 5.0)]);
        let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 1]);
    }

    #[test]
    fn equal_ranking_breaks_ties_by_rating_descending() {
        let shown = present(vec![record(1, 1.0, 5.0), record(2, 1.0, 9.0)]);
        let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 1]);
    }

    #[test]
    fn full_ties_keep_scan_order() {
        let shown = present(vec![
            record(7, 1.0, 5.0),
            record(3, 1.0, 5.0),
            record(9, 1.0, 5.0),
        ]);
        let ids: Vec<_> = shown.iter().map(|r| r.id).collect();
        assert_eq!(ids, [7, 3, 9]);
    }

    #[test]
    fn file_size_is_humanized() {
        let shown = present(vec![record(1, 1.0, 5.0)]);
        assert_eq!(shown[0].file_size, "2.00 KB");
    }

    #[test]
    fn missing_thumbnail_falls_back_to_default() {
        let mut input = record(1, 1.0, 5.0);
        input.thumbnail_path = None;
        let shown = present(vec![input]);
        assert_eq!(shown[0].thumbnail_path, DEFAULT_THUMBNAIL);
    }

    #[test]
    fn stored_thumbnail_is_stripped_to_base_name() {
        let mut input = record(1, 1.0, 5.0);
        input.thumbnail_path = Some("/var/lib/picshelf/thumbnails/old-1.jpg".into());
        let shown = present(vec![input]);
        assert_eq!(shown[0].thumbnail_path, "/thumbnails/old-1.jpg");
    }

    #[test]
    fn null_tags_display_as_empty_string() {
        let shown = present(vec![record(1, 1.0, 5.0)]);
        assert_eq!(shown[0].tags, "");
    }
}
