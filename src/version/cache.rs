use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::config::FETCH_TIMEOUT_MS;
use crate::version::checker::VersionStorer;
use crate::version::error::CacheError;
use crate::version::types::PackageVersions;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: fetching_since column
    &["ALTER TABLE packages ADD COLUMN fetching_since INTEGER"],
    // v2: not_found column
    &["ALTER TABLE packages ADD COLUMN not_found INTEGER NOT NULL DEFAULT 0"],
];

/// SQLite-backed store of registry metadata shared by every open manifest
pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL UNIQUE,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_updated_at ON packages(updated_at);

            CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, version)
            );
            CREATE INDEX IF NOT EXISTS idx_package_id ON versions(package_id);

            CREATE TABLE IF NOT EXISTS dist_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                version TEXT NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, tag_name)
            );
            CREATE INDEX IF NOT EXISTS idx_dist_tags_package_id ON dist_tags(package_id);
            "#,
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Insert the package row if missing and return its id
    fn upsert_package(
        conn: &Connection,
        package_name: &str,
        updated_at: i64,
    ) -> Result<i64, CacheError> {
        conn.execute(
            r#"
            INSERT INTO packages (package_name, updated_at)
            VALUES (?1, ?2)
            ON CONFLICT(package_name) DO NOTHING
            "#,
            (package_name, updated_at),
        )?;

        let package_id = conn.query_row(
            "SELECT id FROM packages WHERE package_name = ?1",
            [package_name],
            |row| row.get(0),
        )?;

        Ok(package_id)
    }
}

impl VersionStorer for Cache {
    fn get_versions(&self, package_name: &str) -> Result<Vec<String>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT v.version FROM versions v
            JOIN packages p ON v.package_id = p.id
            WHERE p.package_name = ?1
            ORDER BY v.id
            "#,
        )?;

        let versions = stmt
            .query_map([package_name], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(versions)
    }

    fn get_dist_tags(&self, package_name: &str) -> Result<HashMap<String, String>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT dt.tag_name, dt.version FROM dist_tags dt
            JOIN packages p ON dt.package_id = p.id
            WHERE p.package_name = ?1
            "#,
        )?;

        let tags = stmt
            .query_map([package_name], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, String>, _>>()?;

        Ok(tags)
    }

    fn is_not_found(&self, package_name: &str) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;
        let not_found = conn
            .query_row(
                "SELECT not_found FROM packages WHERE package_name = ?1",
                [package_name],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;

        Ok(not_found.unwrap_or(false))
    }

    fn replace_package(
        &self,
        package_name: &str,
        package: &PackageVersions,
    ) -> Result<(), CacheError> {
        debug!(
            "Saving {} versions and {} dist tags for {}",
            package.versions.len(),
            package.dist_tags.len(),
            package_name
        );

        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let package_id = Self::upsert_package(&tx, package_name, now)?;
        tx.execute(
            "UPDATE packages SET updated_at = ?1, not_found = 0 WHERE id = ?2",
            (now, package_id),
        )?;

        // Unpublished versions disappear from the registry, so replace wholesale
        tx.execute("DELETE FROM versions WHERE package_id = ?1", [package_id])?;
        tx.execute("DELETE FROM dist_tags WHERE package_id = ?1", [package_id])?;

        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO versions (package_id, version) VALUES (?1, ?2)")?;
            for version in &package.versions {
                stmt.execute((package_id, version))?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO dist_tags (package_id, tag_name, version) VALUES (?1, ?2, ?3)",
            )?;
            for (tag_name, version) in &package.dist_tags {
                stmt.execute((package_id, tag_name, version))?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;

        let package_id = Self::upsert_package(&conn, package_name, now)?;
        conn.execute(
            "UPDATE packages SET not_found = 1, updated_at = ?1 WHERE id = ?2",
            (now, package_id),
        )?;

        Ok(())
    }

    fn get_packages_needing_refresh(
        &self,
        refresh_interval: i64,
    ) -> Result<Vec<String>, CacheError> {
        let threshold = Self::current_timestamp_ms() - refresh_interval;

        let conn = self.lock_conn()?;
        // Packages marked as not found are never refreshed in the background
        let mut stmt = conn.prepare(
            "SELECT package_name FROM packages WHERE updated_at < ?1 AND not_found = 0",
        )?;

        let packages = stmt
            .query_map([threshold], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(packages)
    }

    fn try_start_fetch(&self, package_name: &str) -> Result<bool, CacheError> {
        let now = Self::current_timestamp_ms();
        let timeout_threshold = now - FETCH_TIMEOUT_MS;

        let conn = self.lock_conn()?;

        // Claim the row if nobody is fetching it, or the previous fetch timed out
        let rows_affected = conn.execute(
            r#"
            UPDATE packages
            SET fetching_since = ?1
            WHERE package_name = ?2
              AND (fetching_since IS NULL OR fetching_since < ?3)
            "#,
            (now, package_name, timeout_threshold),
        )?;

        if rows_affected > 0 {
            return Ok(true);
        }

        // Only the first inserter of a new package may proceed
        let rows_inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO packages (package_name, updated_at, fetching_since)
            VALUES (?1, ?2, ?3)
            "#,
            (package_name, now, now),
        )?;

        Ok(rows_inserted > 0)
    }

    fn finish_fetch(&self, package_name: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            "UPDATE packages SET fetching_since = NULL WHERE package_name = ?1",
            [package_name],
        )?;

        Ok(())
    }
}
