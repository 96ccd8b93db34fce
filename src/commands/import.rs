use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::open_store_at;
use crate::cli::ImportArgs;
use crate::model::{LawExport, LawExportFile};
use crate::store::upsert_law;
use crate::util::now_utc_string;

pub fn run(args: ImportArgs) -> Result<()> {
    let mut connection = open_store_at(&args.store)?;
    let fetched_at = now_utc_string();

    let mut imported = 0_usize;
    let mut changed = 0_usize;

    for file in &args.files {
        let laws = read_export_file(file)?;

        let tx = connection.transaction()?;
        let mut file_changed = 0_usize;
        for law in &laws {
            let outcome = upsert_law(&tx, law, &fetched_at)?;
            debug!(
                law_id = outcome.law_id,
                unique_id = law.unique_id,
                changed = outcome.content_changed,
                "law upserted"
            );
            if outcome.content_changed {
                file_changed += 1;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to commit import of {}", file.display()))?;

        info!(
            path = %file.display(),
            laws = laws.len(),
            changed = file_changed,
            "imported law export"
        );
        imported += laws.len();
        changed += file_changed;
    }

    info!(
        db_path = %args.store.resolved_db_path().display(),
        imported,
        changed,
        unchanged = imported - changed,
        "import completed"
    );

    Ok(())
}

fn read_export_file(path: &Path) -> Result<Vec<LawExport>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: LawExportFile = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse law export {}", path.display()))?;
    Ok(file.into_laws())
}
