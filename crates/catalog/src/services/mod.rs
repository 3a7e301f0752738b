pub mod image_service;

pub use image_service::{
    AssetSource, ImageForm, ImageService, IngestError, IngestObserver, StoreDirs,
    CREATION_TIME_FORMAT, THUMBNAIL_ROUTE,
};
