use std::fs;
use std::path::Path;

use rusqlite::{Connection, Transaction};

use crate::db::{DbHandle, DbResult};
use crate::schema::initialize_schema;

#[derive(Debug)]
pub struct CatalogDb {
    conn: Connection,
}

impl CatalogDb {
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> rusqlite::Result<Transaction<'_>> {
        self.conn.transaction()
    }
}

impl DbHandle for CatalogDb {
    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<usize> {
        self.conn.execute(sql, params)
    }

    fn prepare<'a>(&'a self, sql: &str) -> rusqlite::Result<rusqlite::Statement<'a>> {
        self.conn.prepare(sql)
    }

    fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}
