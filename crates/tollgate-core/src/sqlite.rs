// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! SQLite-backed credential store and token registry.
//!
//! Tables:
//! - `users`: id, name, email (unique), password_hash, created_at
//! - `tokens`: id, value (unique), kind, revoked, expired, owner_id, created_at
//!
//! A single connection is guarded by a mutex, so every statement is
//! serialized. Multi-statement sequences that must not interleave for one
//! user are serialized by the session layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, params};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{CredentialStore, TokenRegistry};
use crate::types::{NewUser, TokenKind, TokenRecord, User, UserId};

/// Default time a statement waits on a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        value TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL,
        revoked INTEGER NOT NULL DEFAULT 0,
        expired INTEGER NOT NULL DEFAULT 0,
        owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tokens_owner ON tokens(owner_id);";

// =============================================================================
// SqliteStore
// =============================================================================

/// SQLite implementation of [`CredentialStore`] and [`TokenRegistry`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL mode for concurrent readers and crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), "Opened token registry database");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Returns the database file path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const TOKEN_COLUMNS: &str = "id, value, kind, revoked, expired, owner_id, created_at";

struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    created_at: i64,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: UserId::new(self.id),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: timestamp("users", self.created_at)?,
        })
    }
}

struct TokenRow {
    id: i64,
    value: String,
    kind: String,
    revoked: bool,
    expired: bool,
    owner_id: i64,
    created_at: i64,
}

impl TokenRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            value: row.get(1)?,
            kind: row.get(2)?,
            revoked: row.get(3)?,
            expired: row.get(4)?,
            owner_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<TokenRecord> {
        let kind = self
            .kind
            .parse::<TokenKind>()
            .map_err(|e| StoreError::corrupted_row("tokens", e))?;

        Ok(TokenRecord {
            id: self.id,
            value: self.value,
            kind,
            revoked: self.revoked,
            expired: self.expired,
            owner: UserId::new(self.owner_id),
            created_at: timestamp("tokens", self.created_at)?,
        })
    }
}

fn timestamp(table: &'static str, secs: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::corrupted_row(table, format!("invalid timestamp {secs}")))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

// =============================================================================
// CredentialStore
// =============================================================================

impl CredentialStore for SqliteStore {
    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let created_at = Utc::now().trunc_subsecs(0);

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user.name, user.email, user.password_hash, created_at.timestamp()],
        );

        match result {
            Ok(_) => Ok(User {
                id: UserId::new(conn.last_insert_rowid()),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                created_at,
            }),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::duplicate_email(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            UserRow::from_row,
        );

        match row {
            Ok(row) => row.into_user().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.get()],
            UserRow::from_row,
        );

        match row {
            Ok(row) => row.into_user().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt
            .query_map([], UserRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    fn ping(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

// =============================================================================
// TokenRegistry
// =============================================================================

impl TokenRegistry for SqliteStore {
    fn record(&self, value: &str, kind: TokenKind, owner: UserId) -> StoreResult<TokenRecord> {
        let created_at = Utc::now().trunc_subsecs(0);

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO tokens (value, kind, revoked, expired, owner_id, created_at)
             VALUES (?1, ?2, 0, 0, ?3, ?4)",
            params![value, kind.as_str(), owner.get(), created_at.timestamp()],
        );

        match result {
            Ok(_) => Ok(TokenRecord {
                id: conn.last_insert_rowid(),
                value: value.to_string(),
                kind,
                revoked: false,
                expired: false,
                owner,
                created_at,
            }),
            Err(e) if is_foreign_key_violation(&e) => Err(StoreError::OwnerNotFound {
                user_id: owner.get(),
            }),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::DuplicateToken),
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_value(&self, value: &str) -> StoreResult<Option<TokenRecord>> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE value = ?1"),
            params![value],
            TokenRow::from_row,
        );

        match row {
            Ok(row) => row.into_record().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn all_for_owner(&self, owner: UserId) -> StoreResult<Vec<TokenRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE owner_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![owner.get()], TokenRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(TokenRow::into_record).collect()
    }

    fn invalidate_all_for_owner(&self, owner: UserId) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE tokens SET revoked = 1, expired = 1
             WHERE owner_id = ?1 AND (revoked = 0 OR expired = 0)",
            params![owner.get()],
        )?;

        debug!(user_id = %owner, changed, "Invalidated tokens for owner");
        Ok(changed)
    }

    fn revoke(&self, value: &str) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE tokens SET revoked = 1, expired = 1 WHERE value = ?1",
            params![value],
        )?;
        Ok(changed > 0)
    }

    fn purge_invalidated(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM tokens WHERE revoked = 1 AND expired = 1", [])?;

        info!(removed, "Purged invalidated tokens");
        Ok(removed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn ann(store: &SqliteStore) -> User {
        store
            .create_user(NewUser::new("Ann", "ann@x.com", "$argon2id$hash"))
            .unwrap()
    }

    #[test]
    fn test_create_and_find_user() {
        let store = store();
        let user = ann(&store);

        let by_email = store.find_user_by_email("ann@x.com").unwrap().unwrap();
        assert_eq!(by_email, user);

        let by_id = store.find_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id.email, "ann@x.com");
        assert_eq!(by_id.name, "Ann");
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = store();
        ann(&store);

        let err = store
            .create_user(NewUser::new("Other", "ann@x.com", "h"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail { .. }));
    }

    #[test]
    fn test_email_lookup_is_case_sensitive() {
        let store = store();
        ann(&store);

        assert!(store.find_user_by_email("ANN@x.com").unwrap().is_none());
        assert!(
            store
                .create_user(NewUser::new("Ann", "ANN@x.com", "h"))
                .is_ok()
        );
    }

    #[test]
    fn test_missing_user() {
        let store = store();
        assert!(store.find_user_by_email("nobody@x.com").unwrap().is_none());
        assert!(store.find_user_by_id(UserId::new(99)).unwrap().is_none());
    }

    #[test]
    fn test_list_users_ordered() {
        let store = store();
        ann(&store);
        store
            .create_user(NewUser::new("Bob", "bob@x.com", "h"))
            .unwrap();

        let users = store.list_users().unwrap();
        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["ann@x.com", "bob@x.com"]);
    }

    #[test]
    fn test_record_and_find_token() {
        let store = store();
        let user = ann(&store);

        let record = store.record("tok-1", TokenKind::Access, user.id).unwrap();
        assert!(record.is_usable());

        let found = store.find_by_value("tok-1").unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.find_by_value("tok-2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let store = store();
        let user = ann(&store);

        store.record("tok-1", TokenKind::Access, user.id).unwrap();
        let err = store
            .record("tok-1", TokenKind::Refresh, user.id)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateToken));
    }

    #[test]
    fn test_record_requires_existing_owner() {
        let store = store();
        let err = store
            .record("tok-1", TokenKind::Access, UserId::new(42))
            .unwrap_err();
        assert!(matches!(err, StoreError::OwnerNotFound { user_id: 42 }));
    }

    #[test]
    fn test_invalidate_all_for_owner() {
        let store = store();
        let user = ann(&store);
        let bob = store
            .create_user(NewUser::new("Bob", "bob@x.com", "h"))
            .unwrap();

        store.record("a-1", TokenKind::Access, user.id).unwrap();
        store.record("a-2", TokenKind::Refresh, user.id).unwrap();
        store.record("b-1", TokenKind::Access, bob.id).unwrap();

        assert_eq!(store.invalidate_all_for_owner(user.id).unwrap(), 2);
        // Already invalidated rows are not counted again.
        assert_eq!(store.invalidate_all_for_owner(user.id).unwrap(), 0);

        let tokens = store.all_for_owner(user.id).unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.revoked && t.expired));

        assert!(store.find_by_value("b-1").unwrap().unwrap().is_usable());
    }

    #[test]
    fn test_revoke_single_token() {
        let store = store();
        let user = ann(&store);
        store.record("a-1", TokenKind::Access, user.id).unwrap();
        store.record("a-2", TokenKind::Access, user.id).unwrap();

        assert!(store.revoke("a-1").unwrap());
        assert!(!store.revoke("missing").unwrap());

        assert!(!store.find_by_value("a-1").unwrap().unwrap().is_usable());
        assert!(store.find_by_value("a-2").unwrap().unwrap().is_usable());
    }

    #[test]
    fn test_purge_invalidated() {
        let store = store();
        let user = ann(&store);
        store.record("old", TokenKind::Access, user.id).unwrap();
        store.invalidate_all_for_owner(user.id).unwrap();
        store.record("new", TokenKind::Access, user.id).unwrap();

        assert_eq!(store.purge_invalidated().unwrap(), 1);
        let remaining = store.all_for_owner(user.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].value, "new");
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.db");

        {
            let store = SqliteStore::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
            let user = ann(&store);
            store.record("tok", TokenKind::Refresh, user.id).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let reopened = SqliteStore::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        let record = reopened.find_by_value("tok").unwrap().unwrap();
        assert_eq!(record.kind, TokenKind::Refresh);
        reopened.ping().unwrap();
    }
}
