//! DuckDB credential store implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use duckdb::{params, Connection};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Role, StoredCredential, User, UserCredential, UserDetail, UserId};
use crate::ports::CredentialStore;
use crate::services::{MigrationResult, MigrationService, PasswordHasher};

/// Maximum number of retries when the database file is locked at open time
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Database(e.to_string())
    }
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Check if an insert failed because the primary key is taken
fn is_duplicate_key_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("primary key") || lower.contains("unique constraint")
}

/// DuckDB-backed credential store
///
/// All statements run on tokio's blocking pool against a single connection.
/// Identity uniqueness is enforced by the `sys_users` primary key, so two
/// concurrent registrations of one identity cannot both be inserted.
pub struct DuckDbCredentialStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
    hasher: PasswordHasher,
}

impl DuckDbCredentialStore {
    /// Open (or create) the database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database file.
    pub fn new(db_path: &Path, hasher: PasswordHasher) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                        hasher,
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (nothing is persisted)
    pub fn open_in_memory(hasher: PasswordHasher) -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
            hasher,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // IMPORTANT: Disable extension autoloading to avoid macOS code signing issues
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            info!(applied = result.applied.len(), "Database schema upgraded");
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::unavailable(format!("Database task failed: {}", e)))?
    }
}

/// Raw `sys_users` columns for an active user
struct UserRow {
    user_id: String,
    role: String,
    password_hash: String,
    phone: Option<String>,
}

impl UserRow {
    fn user(&self) -> Result<User> {
        let id = UserId::parse(&self.user_id)
            .map_err(|e| Error::database(format!("Corrupt user_id column: {}", e)))?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| Error::database(format!("Corrupt role column: {}", e)))?;
        Ok(User::new(id, role))
    }
}

fn find_active_user(conn: &Connection, id: &UserId) -> Result<UserRow> {
    let row = conn.query_row(
        "SELECT user_id, role, password_hash, phone
         FROM sys_users WHERE user_id = ? AND NOT deleted",
        [id.as_str()],
        |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                role: row.get(1)?,
                password_hash: row.get(2)?,
                phone: row.get(3)?,
            })
        },
    );

    match row {
        Ok(row) => Ok(row),
        Err(duckdb::Error::QueryReturnedNoRows) => {
            Err(Error::not_found(format!("User {} not found", id)))
        }
        Err(e) => Err(e.into()),
    }
}

fn identity_taken(conn: &Connection, id: &UserId) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sys_users WHERE user_id = ?",
        [id.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[async_trait]
impl CredentialStore for DuckDbCredentialStore {
    async fn create_user(&self, credential: UserCredential) -> Result<()> {
        let UserCredential { user, password, phone } = credential;

        // Fast path: skip the expensive hash when the identity is obviously taken
        let id = user.id.clone();
        if self.with_conn(move |conn| identity_taken(conn, &id)).await? {
            return Err(Error::already_exists(format!("User {} already exists", user.id)));
        }

        let password_hash = self.hasher.hash(&password).await?;
        drop(password);

        let created = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sys_users (user_id, role, password_hash, phone) VALUES (?, ?, ?, ?)",
                params![user.id.as_str(), user.role.as_str(), password_hash, phone],
            )
            .map_err(|e| {
                let msg = e.to_string();
                if is_duplicate_key_error(&msg) {
                    Error::already_exists(format!("User {} already exists", user.id))
                } else {
                    Error::Database(msg)
                }
            })?;
            Ok(())
        })
        .await?;

        debug!(user = %created.id, role = %created.role, "Created user record");
        Ok(())
    }

    async fn get_credential(&self, id: &UserId) -> Result<StoredCredential> {
        let id = id.clone();
        let row = self.with_conn(move |conn| find_active_user(conn, &id)).await?;
        let user = row.user()?;
        Ok(StoredCredential {
            user,
            password_hash: row.password_hash,
        })
    }

    async fn get_detail(&self, id: &UserId) -> Result<UserDetail> {
        let id = id.clone();
        let row = self.with_conn(move |conn| find_active_user(conn, &id)).await?;
        let user = row.user()?;
        Ok(UserDetail {
            user,
            phone: row.phone,
        })
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let matched = conn.execute(
                "UPDATE sys_users
                 SET deleted = TRUE, deleted_at = COALESCE(deleted_at, current_timestamp)
                 WHERE user_id = ?",
                [id.as_str()],
            )?;
            if matched == 0 {
                return Err(Error::not_found(format!("User {} not found", id)));
            }
            debug!(user = %id, "Soft deleted user record");
            Ok(())
        })
        .await
    }

    async fn verify_secret(&self, plaintext: &SecretString, hashed: &str) -> Result<bool> {
        self.hasher.verify(plaintext, hashed).await
    }
}
