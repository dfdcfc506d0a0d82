/*!
 * SQLite handle for the speech cache.
 *
 * One connection is shared behind a mutex. Async callers go through
 * `execute_async`, which moves the closure onto tokio's blocking pool.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

const CACHE_FILENAME: &str = "speech_cache.db";
const APP_DIRNAME: &str = "mdcraft";
const IN_MEMORY: &str = ":memory:";

/// Shared SQLite connection
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection").field("db_path", &self.db_path).finish()
    }
}

impl DatabaseConnection {
    /// Open the cache in the per-user data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the cache at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }

        info!("Opening speech cache at: {:?}", db_path);
        let conn = Connection::open(&db_path).with_context(|| format!("Failed to open speech cache: {:?}", db_path))?;
        Self::from_connection(conn, db_path)
    }

    /// Private in-memory cache, gone when the last clone is dropped
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory speech cache");
        let conn = Connection::open_in_memory().context("Failed to create in-memory speech cache")?;
        Self::from_connection(conn, PathBuf::from(IN_MEMORY))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/mdcraft/speech_cache.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the speech cache"))?;

        Ok(base_dir.join(APP_DIRNAME).join(CACHE_FILENAME))
    }

    /// Location of the database file, `:memory:` for in-memory caches
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }

    /// Run `f` on the blocking pool with exclusive access to the connection
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || f(&connection.lock()))
            .await
            .context("Speech cache task panicked")?
    }

    /// Give freed pages back to the file system
    pub async fn vacuum(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }
        self.execute_async(|conn| {
            conn.execute_batch("VACUUM;")?;
            Ok(())
        })
        .await
    }
}
