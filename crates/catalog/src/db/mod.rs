//! Row bindings for the catalog SQLite schema.

use anyhow::Context;
use rusqlite::{Connection, Row, Transaction};

pub mod db;
pub mod images;

pub use db::CatalogDb;
pub use images::ImageRecord;

pub type DbResult<T> = anyhow::Result<T>;

/// Common trait allowing modules to operate over either a `Connection` or `Transaction`.
pub trait DbHandle {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize>;
    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>>;
    fn last_insert_rowid(&self) -> i64;
}

impl DbHandle for Connection {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize> {
        Connection::execute(self, sql, params)
    }

    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>> {
        Connection::prepare(self, sql)
    }

    fn last_insert_rowid(&self) -> i64 {
        Connection::last_insert_rowid(self)
    }
}

impl DbHandle for Transaction<'_> {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize> {
        (**self).execute(sql, params)
    }

    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>> {
        (**self).prepare(sql)
    }

    fn last_insert_rowid(&self) -> i64 {
        (**self).last_insert_rowid()
    }
}

/// Map a single row result to a typed value, returning an error when no rows are present.
pub fn query_one<T, H, P, F>(db: &H, sql: &str, params: P, map: F) -> DbResult<T>
where
    H: DbHandle + ?Sized,
    P: rusqlite::Params,
    F: FnOnce(&Row) -> DbResult<T>,
{
    let mut stmt = db.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let row = rows.next()?.context("query returned no rows")?;
    map(row)
}

/// Collect all rows from a query into a vector.
pub fn query_all<T, H, P, F>(db: &H, sql: &str, params: P, mut map: F) -> DbResult<Vec<T>>
where
    H: DbHandle + ?Sized,
    P: rusqlite::Params,
    F: FnMut(&Row) -> DbResult<T>,
{
    let mut stmt = db.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}
