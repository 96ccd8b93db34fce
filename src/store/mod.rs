//! SQLite persistence for laws and their processed node trees.

use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::law_tree::{LawNode, NodeType};
use crate::model::{LawContent, LawExport};
use crate::util::{now_utc_string, sha256_bytes};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn open_store(path: &Path) -> Result<Connection> {
    let connection = Connection::open(path)
        .with_context(|| format!("failed to open database: {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS laws (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              unique_id INTEGER NOT NULL UNIQUE,
              caption TEXT NOT NULL DEFAULT '',
              content_structure TEXT,
              content_text TEXT,
              content_sha256 TEXT,
              content_fetched_at TEXT,
              processed_at TEXT,
              processed_sha256 TEXT
            );

            CREATE TABLE IF NOT EXISTS law_nodes (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              law_id INTEGER NOT NULL,
              path TEXT NOT NULL,
              p_id INTEGER,
              caption TEXT,
              text_markdown TEXT,
              node_type TEXT NOT NULL,
              type INTEGER,
              field_type INTEGER,
              has_in_links INTEGER NOT NULL DEFAULT 0,
              sort_order INTEGER NOT NULL,
              level INTEGER NOT NULL,
              is_orphaned INTEGER NOT NULL DEFAULT 0,
              UNIQUE(law_id, path),
              FOREIGN KEY(law_id) REFERENCES laws(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_law_nodes_law_order ON law_nodes(law_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_law_nodes_law_type ON law_nodes(law_id, node_type);
            ",
        )
        .context("failed to initialize schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}

/// A stored law with its raw content blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawRecord {
    pub id: i64,
    pub unique_id: i64,
    pub caption: String,
    pub content_structure: Option<String>,
    pub content_text: Option<String>,
    pub content_sha256: Option<String>,
    pub processed_sha256: Option<String>,
}

impl LawRecord {
    pub fn content(&self) -> Result<LawContent> {
        let (Some(structure), Some(text)) = (&self.content_structure, &self.content_text) else {
            bail!("law {} has no fetched content", self.unique_id);
        };
        let content = LawContent::from_json(structure, text)
            .with_context(|| format!("failed to decode content of law {}", self.unique_id))?;
        Ok(content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub law_id: i64,
    pub content_changed: bool,
}

/// Hash over both blobs; `None` when either is missing.
pub fn content_sha256(structure: Option<&str>, text: Option<&str>) -> Option<String> {
    let (structure, text) = (structure?, text?);
    let mut buffer = Vec::with_capacity(structure.len() + text.len() + 1);
    buffer.extend_from_slice(structure.as_bytes());
    buffer.push(b'\n');
    buffer.extend_from_slice(text.as_bytes());
    Some(sha256_bytes(&buffer))
}

pub fn upsert_law(connection: &Connection, law: &LawExport, fetched_at: &str) -> Result<UpsertOutcome> {
    let structure = law
        .content_structure
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize content_structure")?;
    let text = law
        .content_text
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize content_text")?;
    let sha256 = content_sha256(structure.as_deref(), text.as_deref());

    let previous: Option<Option<String>> = connection
        .query_row(
            "SELECT content_sha256 FROM laws WHERE unique_id = ?1",
            [law.unique_id],
            |row| row.get(0),
        )
        .optional()?;

    connection
        .execute(
            "
            INSERT INTO laws(unique_id, caption, content_structure, content_text, content_sha256, content_fetched_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(unique_id) DO UPDATE SET
              caption=excluded.caption,
              content_structure=excluded.content_structure,
              content_text=excluded.content_text,
              content_sha256=excluded.content_sha256,
              content_fetched_at=excluded.content_fetched_at
            ",
            params![law.unique_id, &law.caption, structure, text, sha256, fetched_at],
        )
        .with_context(|| format!("failed to upsert law {}", law.unique_id))?;

    let law_id: i64 = connection.query_row(
        "SELECT id FROM laws WHERE unique_id = ?1",
        [law.unique_id],
        |row| row.get(0),
    )?;

    Ok(UpsertOutcome {
        law_id,
        content_changed: previous.is_none_or(|previous| previous != sha256),
    })
}

pub fn load_law(connection: &Connection, law_id: i64) -> Result<Option<LawRecord>> {
    let record = connection
        .query_row(
            "
            SELECT id, unique_id, caption, content_structure, content_text, content_sha256, processed_sha256
            FROM laws
            WHERE id = ?1
            ",
            [law_id],
            |row| {
                Ok(LawRecord {
                    id: row.get(0)?,
                    unique_id: row.get(1)?,
                    caption: row.get(2)?,
                    content_structure: row.get(3)?,
                    content_text: row.get(4)?,
                    content_sha256: row.get(5)?,
                    processed_sha256: row.get(6)?,
                })
            },
        )
        .optional()
        .with_context(|| format!("failed to load law {law_id}"))?;
    Ok(record)
}

/// Ids of laws with both content blobs, in id order.
///
/// An explicit `law_id` is selected regardless of its processing state.
/// Otherwise only laws never processed, or whose content changed since, are
/// selected unless `force` is set.
pub fn select_laws_for_processing(
    connection: &Connection,
    law_id: Option<i64>,
    force: bool,
    limit: usize,
) -> Result<Vec<i64>> {
    let mut statement = connection.prepare(
        "
        SELECT id
        FROM laws
        WHERE content_structure IS NOT NULL
          AND content_text IS NOT NULL
          AND (?1 IS NULL OR id = ?1)
          AND (
            ?1 IS NOT NULL
            OR ?2 = 1
            OR processed_at IS NULL
            OR processed_sha256 IS NULL
            OR processed_sha256 <> content_sha256
          )
        ORDER BY id
        LIMIT ?3
        ",
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = statement.query_map(params![law_id, force, limit], |row| row.get(0))?;
    let ids = rows
        .collect::<rusqlite::Result<Vec<i64>>>()
        .context("failed to select laws for processing")?;
    Ok(ids)
}

/// Replaces every node of `law_id` and stamps the processing time and
/// content hash, all in one transaction.
pub fn replace_law_nodes(
    connection: &mut Connection,
    law_id: i64,
    nodes: &[LawNode],
    content_sha256: Option<&str>,
) -> Result<usize> {
    let tx = connection.transaction()?;

    let removed = tx
        .execute("DELETE FROM law_nodes WHERE law_id = ?1", [law_id])
        .with_context(|| format!("failed to delete nodes of law {law_id}"))?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO law_nodes(
              law_id, path, p_id, caption, text_markdown, node_type, type, field_type,
              has_in_links, sort_order, level, is_orphaned
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )?;

        for node in nodes {
            statement
                .execute(params![
                    law_id,
                    &node.path,
                    node.source_paragraph_id,
                    &node.caption,
                    &node.text,
                    node.node_type.as_str(),
                    node.type_code,
                    node.field_type,
                    node.has_in_links,
                    node.sort_order,
                    node.level,
                    node.is_orphaned,
                ])
                .with_context(|| format!("failed to insert node {} of law {law_id}", node.path))?;
        }
    }

    tx.execute(
        "UPDATE laws SET processed_at = ?2, processed_sha256 = ?3 WHERE id = ?1",
        params![law_id, now_utc_string(), content_sha256],
    )?;

    tx.commit()
        .with_context(|| format!("failed to commit nodes of law {law_id}"))?;

    debug!(law_id, removed, inserted = nodes.len(), "law nodes replaced");
    Ok(nodes.len())
}

pub fn load_law_nodes(
    connection: &Connection,
    law_id: i64,
    node_type: Option<NodeType>,
) -> Result<Vec<LawNode>> {
    let mut statement = connection.prepare(
        "
        SELECT path, p_id, caption, text_markdown, node_type, type, field_type,
               has_in_links, sort_order, level, is_orphaned
        FROM law_nodes
        WHERE law_id = ?1
          AND (?2 IS NULL OR node_type = ?2)
        ORDER BY sort_order
        ",
    )?;

    let rows = statement.query_map(
        params![law_id, node_type.map(NodeType::as_str)],
        |row| {
            let node_type: String = row.get(4)?;
            Ok(LawNode {
                path: row.get(0)?,
                source_paragraph_id: row.get(1)?,
                caption: row.get(2)?,
                text: row.get(3)?,
                node_type: NodeType::parse(&node_type).unwrap_or(NodeType::Unknown),
                type_code: row.get(5)?,
                field_type: row.get(6)?,
                has_in_links: row.get(7)?,
                sort_order: row.get(8)?,
                level: row.get(9)?,
                is_orphaned: row.get(10)?,
            })
        },
    )?;

    let nodes = rows
        .collect::<rusqlite::Result<Vec<LawNode>>>()
        .with_context(|| format!("failed to load nodes of law {law_id}"))?;
    Ok(nodes)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub laws: i64,
    pub laws_with_content: i64,
    pub processed_laws: i64,
    pub nodes: i64,
    pub orphan_nodes: i64,
}

pub fn store_counts(connection: &Connection) -> Result<StoreCounts> {
    Ok(StoreCounts {
        laws: query_count(connection, "SELECT COUNT(*) FROM laws")?,
        laws_with_content: query_count(
            connection,
            "SELECT COUNT(*) FROM laws WHERE content_structure IS NOT NULL AND content_text IS NOT NULL",
        )?,
        processed_laws: query_count(
            connection,
            "SELECT COUNT(*) FROM laws WHERE processed_at IS NOT NULL",
        )?,
        nodes: query_count(connection, "SELECT COUNT(*) FROM law_nodes")?,
        orphan_nodes: query_count(
            connection,
            "SELECT COUNT(*) FROM law_nodes WHERE is_orphaned = 1",
        )?,
    })
}

pub fn node_type_counts(connection: &Connection) -> Result<Vec<(String, i64)>> {
    let mut statement = connection.prepare(
        "SELECT node_type, COUNT(*) FROM law_nodes GROUP BY node_type ORDER BY node_type",
    )?;
    let rows = statement.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let counts = rows
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()
        .context("failed to count nodes by type")?;
    Ok(counts)
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to run count query: {sql}"))?;
    Ok(count)
}
