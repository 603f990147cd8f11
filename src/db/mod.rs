pub mod models;

use models::{FileRecord, NewUser, Stats, User};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Email already registered.")]
    DuplicateEmail,
    #[error("No user with id {0}")]
    UnknownUser(i64),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Cannot prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// One-way digest used for stored passwords: SHA-256, lowercase hex.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Account and file-record store.
///
/// Only the path is kept; every operation opens its own connection and drops
/// it on return.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Self { path };
        db.migrate()?;
        tracing::debug!(path = %db.path.display(), "database ready");
        Ok(db)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS users (
                userid INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                date_of_birth TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                fileid INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(userid)
            );
            ",
        )?;
        Ok(())
    }

    // ── Users ──

    pub fn register(&self, new_user: &NewUser) -> Result<User> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT INTO users (first_name, last_name, date_of_birth, email, password)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_user.first_name,
                new_user.last_name,
                new_user.date_of_birth,
                new_user.email,
                hash_password(&new_user.password),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                tracing::info!(email = %new_user.email, "sign-up rejected: email taken");
                return Err(AccountError::DuplicateEmail);
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        let user = conn.query_row(
            "SELECT userid, first_name, last_name, date_of_birth, email, password
             FROM users WHERE userid = ?1",
            params![id],
            user_from_row,
        )?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Looks up the row matching both email and password digest.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                "SELECT userid, first_name, last_name, date_of_birth, email, password
                 FROM users WHERE email = ?1 AND password = ?2",
                params![email, hash_password(password)],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    // ── Files ──

    pub fn record_file(&self, user_id: i64, file_name: &str, file_path: &str) -> Result<FileRecord> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT INTO files (user_id, file_name, file_path) VALUES (?1, ?2, ?3)",
            params![user_id, file_name, file_path],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                return Err(AccountError::UnknownUser(user_id));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(FileRecord {
            id: conn.last_insert_rowid(),
            user_id,
            file_name: file_name.to_string(),
            file_path: file_path.to_string(),
        })
    }

    /// `(file_name, file_path)` pairs for a user, oldest first.
    pub fn list_files(&self, user_id: i64) -> Result<Vec<(String, String)>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT file_name, file_path FROM files WHERE user_id = ?1 ORDER BY fileid ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns the number of rows removed; zero when nothing matched.
    pub fn delete_file(&self, user_id: i64, file_name: &str) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM files WHERE user_id = ?1 AND file_name = ?2",
            params![user_id, file_name],
        )?;
        Ok(removed)
    }

    pub fn stats(&self) -> Result<Stats> {
        let conn = self.connect()?;
        let users = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let files = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(Stats { users, files })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
    })
}
