pub mod import;
pub mod nodes;
pub mod parse_changes;
pub mod process;
pub mod status;

use anyhow::Result;
use rusqlite::Connection;

use crate::cli::StoreArgs;
use crate::store::open_store;
use crate::util::ensure_directory;

/// Opens the store, creating its parent directory on first use.
fn open_store_at(args: &StoreArgs) -> Result<Connection> {
    let db_path = args.resolved_db_path();
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    open_store(&db_path)
}
