use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store::{node_type_counts, store_counts};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    info!(data_root = %args.store.data_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let schema_version = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .unwrap_or_default();

    let counts = store_counts(&connection)?;
    info!(
        path = %db_path.display(),
        schema_version = %schema_version,
        laws = counts.laws,
        laws_with_content = counts.laws_with_content,
        processed_laws = counts.processed_laws,
        nodes = counts.nodes,
        orphan_nodes = counts.orphan_nodes,
        "database status"
    );

    for (node_type, count) in node_type_counts(&connection)? {
        info!(node_type = %node_type, count, "nodes by type");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StoreArgs;
    use crate::commands::open_store_at;

    #[test]
    fn missing_database_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = StatusArgs {
            store: StoreArgs {
                data_root: dir.path().join("absent"),
                db_path: None,
            },
        };
        run(args.clone()).unwrap();
        assert!(!args.store.resolved_db_path().exists());
    }

    #[test]
    fn reports_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreArgs {
            data_root: dir.path().to_path_buf(),
            db_path: None,
        };
        drop(open_store_at(&store).unwrap());

        run(StatusArgs { store }).unwrap();
    }
}
