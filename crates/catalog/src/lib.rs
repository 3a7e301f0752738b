//! SQLite-backed image catalog: schema, row bindings, and the ingestion
//! pipeline that places assets, derives thumbnails, and commits records.

pub mod db;
pub mod schema;
pub mod services;
