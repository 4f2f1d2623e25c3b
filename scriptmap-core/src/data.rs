use rusqlite::{Connection, Result, params};
use scriptmap_scanner::ScriptSink;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use rusqlite::Error as StoreError;

pub const DEFAULT_DATABASE_PATH: &str = "jsdatabase.db";

pub struct Database {
    conn: Connection,
}

/// One stored fact: `script_url` was embedded in `page_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReference {
    pub id: i64,
    pub page_url: String,
    pub script_url: String,
}

/// Every reference to one script URL, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGroup {
    pub script_url: String,
    pub ids: Vec<i64>,
    pub page_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageScript {
    pub id: i64,
    pub script_url: String,
}

impl Database {
    /// Deletes the database file along with any WAL sidecar files.
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                fs::remove_file(&sidecar)?;
            }
        }
        debug!("Removed database {}", path.display());
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database { conn };
        db.ensure_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Creates the `scripts` table and its indexes when absent.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS scripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_url TEXT,
                script_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_scripts_page_url ON scripts(page_url);
            CREATE INDEX IF NOT EXISTS idx_scripts_script_url ON scripts(script_url);
            ",
        )?;
        Ok(())
    }

    /// Appends a reference. Repeated pairs are stored again.
    pub fn insert_script(&self, page_url: &str, script_url: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scripts (page_url, script_url) VALUES (?1, ?2)",
            params![page_url, script_url],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Removes every reference and returns how many were removed.
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM scripts", [])?;
        debug!("Deleted {} script references", removed);
        Ok(removed)
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM scripts", [], |row| row.get(0))
    }

    /// One group per distinct script URL, ordered by script URL.
    pub fn scripts_grouped(&self) -> Result<Vec<ScriptGroup>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, page_url, script_url FROM scripts ORDER BY script_url, id")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ScriptReference {
                    id: row.get(0)?,
                    page_url: row.get(1)?,
                    script_url: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        // GROUP_CONCAT has no ordering guarantee and cannot carry URLs with commas
        let mut groups: Vec<ScriptGroup> = Vec::new();
        for row in rows {
            match groups.last_mut() {
                Some(group) if group.script_url == row.script_url => {
                    group.ids.push(row.id);
                    group.page_urls.push(row.page_url);
                }
                _ => groups.push(ScriptGroup {
                    script_url: row.script_url,
                    ids: vec![row.id],
                    page_urls: vec![row.page_url],
                }),
            }
        }

        Ok(groups)
    }

    pub fn scripts_by_page(&self, page_url: &str) -> Result<Vec<PageScript>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, script_url FROM scripts WHERE page_url = ?1 ORDER BY id")?;

        let scripts = stmt
            .query_map(params![page_url], |row| {
                Ok(PageScript {
                    id: row.get(0)?,
                    script_url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(scripts)
    }
}

impl ScriptSink for Database {
    type Error = rusqlite::Error;

    fn record(&mut self, page_url: &str, script_url: &str) -> Result<i64> {
        self.insert_script(page_url, script_url)
    }
}
