use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::open_store_at;
use crate::cli::ProcessArgs;
use crate::law_tree::{LawTreeProcessor, ProcessStats};
use crate::model::{FailedLaw, ProcessCounts, ProcessPaths, ProcessRunManifest};
use crate::store::{
    DB_SCHEMA_VERSION, LawRecord, load_law, replace_law_nodes, select_laws_for_processing,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: ProcessArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.store.manifest_dir();
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("process_run_{}.json", utc_compact_string(started_ts)))
    });
    let db_path = args.store.resolved_db_path();

    info!(db_path = %db_path.display(), run_id = %run_id, "starting law tree processing");

    let mut connection = open_store_at(&args.store)?;
    let processor = LawTreeProcessor::new().context("failed to build law tree processor")?;

    let law_ids = select_laws_for_processing(&connection, args.law_id, args.force, args.limit)?;
    let mut counts = ProcessCounts {
        laws_selected: law_ids.len(),
        ..ProcessCounts::default()
    };
    let mut failed_laws = Vec::new();

    if law_ids.is_empty() {
        info!("no laws found to process");
    }

    for law_id in law_ids {
        counts.laws_processed += 1;

        let record = match load_law(&connection, law_id)
            .and_then(|record| record.ok_or_else(|| anyhow!("law {law_id} disappeared")))
        {
            Ok(record) => record,
            Err(err) => {
                record_failure(&mut counts, &mut failed_laws, law_id, None, &err);
                continue;
            }
        };

        match process_law(&mut connection, &processor, &record) {
            Ok((written, stats)) => {
                counts.laws_succeeded += 1;
                add_law_stats(&mut counts, &stats, written);
                info!(
                    law_id,
                    unique_id = record.unique_id,
                    nodes = written,
                    orphans = stats.orphan_nodes,
                    split = stats.split_nodes,
                    "processed law"
                );
            }
            Err(err) => {
                record_failure(&mut counts, &mut failed_laws, law_id, Some(record.unique_id), &err);
            }
        }
    }

    let manifest = ProcessRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: if counts.laws_failed == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        command: render_process_command(&args),
        paths: ProcessPaths {
            data_root: args.store.data_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        failed_laws,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote process run manifest");
    info!(
        processed = manifest.counts.laws_processed,
        succeeded = manifest.counts.laws_succeeded,
        failed = manifest.counts.laws_failed,
        nodes = manifest.counts.nodes_written,
        "law tree processing completed"
    );

    Ok(())
}

fn process_law(
    connection: &mut Connection,
    processor: &LawTreeProcessor,
    record: &LawRecord,
) -> Result<(usize, ProcessStats)> {
    if record.processed_sha256.is_some() && record.processed_sha256 != record.content_sha256 {
        debug!(law_id = record.id, "content changed since last processing");
    }

    let content = record.content()?;
    let processed = processor.process(&content);
    let written = replace_law_nodes(
        connection,
        record.id,
        &processed.nodes,
        record.content_sha256.as_deref(),
    )?;
    Ok((written, processed.stats))
}

fn record_failure(
    counts: &mut ProcessCounts,
    failed_laws: &mut Vec<FailedLaw>,
    law_id: i64,
    unique_id: Option<i64>,
    err: &anyhow::Error,
) {
    counts.laws_failed += 1;
    let reason = format!("{err:#}");
    warn!(law_id, unique_id = ?unique_id, reason = %reason, "failed to process law");
    failed_laws.push(FailedLaw {
        law_id,
        unique_id,
        reason,
    });
}

fn add_law_stats(counts: &mut ProcessCounts, stats: &ProcessStats, written: usize) {
    counts.nodes_written += written;
    counts.structural_nodes += stats.structural_nodes;
    counts.orphan_nodes += stats.orphan_nodes;
    counts.split_nodes += stats.split_nodes;
    counts.missing_identifier_count += stats.missing_identifier;
    counts.markdown_fallback_count += stats.markdown_fallbacks;
    counts.path_collision_count += stats.path_collisions;
}

fn render_process_command(args: &ProcessArgs) -> String {
    let mut command = vec![
        "bglex".to_string(),
        "process".to_string(),
        "--data-root".to_string(),
        args.store.data_root.display().to_string(),
        "--limit".to_string(),
        args.limit.to_string(),
    ];

    if let Some(db_path) = &args.store.db_path {
        command.push("--db-path".to_string());
        command.push(db_path.display().to_string());
    }
    if let Some(law_id) = args.law_id {
        command.push("--law-id".to_string());
        command.push(law_id.to_string());
    }
    if args.force {
        command.push("--force".to_string());
    }

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use serde_json::{Value, json};

    use super::*;
    use crate::cli::StoreArgs;
    use crate::model::LawExport;
    use crate::store::{load_law_nodes, upsert_law};

    fn args(data_root: PathBuf, manifest_path: PathBuf) -> ProcessArgs {
        ProcessArgs {
            store: StoreArgs {
                data_root,
                db_path: None,
            },
            limit: 50,
            force: false,
            law_id: None,
            manifest_path: Some(manifest_path),
        }
    }

    #[test]
    fn render_process_command_includes_selection_flags() {
        let mut args = args(PathBuf::from(".cache/bglex"), PathBuf::from("m.json"));
        args.law_id = Some(12);
        args.force = true;

        let command = render_process_command(&args);
        assert!(command.starts_with("bglex process --data-root .cache/bglex --limit 50"));
        assert!(command.contains("--law-id 12"));
        assert!(command.ends_with("--force"));
    }

    #[test]
    fn law_stats_accumulate_into_counts() {
        let mut counts = ProcessCounts::default();
        let stats = ProcessStats {
            structural_nodes: 3,
            orphan_nodes: 1,
            split_nodes: 2,
            missing_identifier: 1,
            markdown_fallbacks: 1,
            path_collisions: 1,
            ..ProcessStats::default()
        };
        add_law_stats(&mut counts, &stats, 6);
        add_law_stats(&mut counts, &stats, 6);

        assert_eq!(counts.nodes_written, 12);
        assert_eq!(counts.structural_nodes, 6);
        assert_eq!(counts.missing_identifier_count, 2);
        assert_eq!(counts.path_collision_count, 2);
    }

    #[test]
    fn batch_counts_failures_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("run.json");
        let args = args(dir.path().join("data"), manifest_path.clone());

        let connection = open_store_at(&args.store).unwrap();
        let broken = LawExport {
            unique_id: 1,
            caption: "Повреден".to_string(),
            content_structure: Some(json!({ "not": "a forest" })),
            content_text: Some(json!({ "paragraphs": [] })),
        };
        let valid = LawExport {
            unique_id: 2,
            caption: "Закон".to_string(),
            content_structure: Some(json!([{ "pId": 1, "caption": "Чл. 1" }])),
            content_text: Some(json!({ "paragraphs": [{ "pId": 1, "text": "<p>(1) А. (2) Б.</p>" }] })),
        };
        let broken_id = upsert_law(&connection, &broken, "t").unwrap().law_id;
        let valid_id = upsert_law(&connection, &valid, "t").unwrap().law_id;
        drop(connection);

        run(args.clone()).unwrap();

        let manifest: Value = serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["status"], "completed_with_failures");
        assert_eq!(manifest["counts"]["laws_selected"], 2);
        assert_eq!(manifest["counts"]["laws_succeeded"], 1);
        assert_eq!(manifest["counts"]["laws_failed"], 1);
        assert_eq!(manifest["counts"]["nodes_written"], 3);
        assert_eq!(manifest["failed_laws"][0]["law_id"], broken_id);
        assert_eq!(manifest["failed_laws"][0]["unique_id"], 1);

        let connection = open_store_at(&args.store).unwrap();
        let paths: Vec<String> = load_law_nodes(&connection, valid_id, None)
            .unwrap()
            .into_iter()
            .map(|node| node.path)
            .collect();
        assert_eq!(paths, vec!["ЧЛ1", "ЧЛ1/АЛ1", "ЧЛ1/АЛ2"]);

        // The valid law is now up to date, the broken one is retried.
        assert_eq!(
            select_laws_for_processing(&connection, None, false, 50).unwrap(),
            vec![broken_id]
        );
    }
}
