//! Command implementations.

pub mod ask;
pub mod chat;
pub mod departments;
pub mod history;
pub mod rules;

pub use self::ask::execute_ask;
pub use self::chat::execute_chat;
pub use self::departments::execute_departments;
pub use self::history::execute_history;
pub use self::rules::execute_rules;

use crate::config::StoreSettings;
use crate::error::Result;
use civic_store::SqliteStore;
use tracing::debug;

/// Open the configured SQLite database, creating its directory if needed.
pub fn open_sqlite(settings: &StoreSettings) -> Result<SqliteStore> {
    let path = settings.sqlite_path()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!("Opening session database at {}", path.display());
    Ok(SqliteStore::new(&path)?)
}
