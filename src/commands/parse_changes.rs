use std::fmt::Write as _;

use anyhow::{Context, Result};
use tracing::info;

use crate::amendments::{AmendmentDocument, AmendmentParser};
use crate::cli::ParseChangesArgs;
use crate::util::truncate_chars;

const CONTENT_PREVIEW_CHARS: usize = 300;
const MOTIVES_PREVIEW_CHARS: usize = 200;
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn run(args: ParseChangesArgs) -> Result<()> {
    let parser = AmendmentParser::new().context("failed to build amendment parser")?;
    let document = parser
        .parse_file(&args.file)
        .with_context(|| format!("failed to parse amendment document {}", args.file.display()))?;

    info!(
        path = %args.file.display(),
        amendments = document.amendments.len(),
        "parsed amendment document"
    );

    if args.json {
        let rendered = serde_json::to_string_pretty(&document)
            .context("failed to serialize amendment document")?;
        println!("{rendered}");
    } else {
        print!("{}", render_document(&document));
    }

    Ok(())
}

fn render_document(document: &AmendmentDocument) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Amendment law:");
    let _ = writeln!(out, "   {}", document.law_name.as_deref().unwrap_or("-"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Target law:");
    let _ = writeln!(out, "   {}", document.target_law_name.as_deref().unwrap_or("-"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Found {} amendments (§ paragraphs):", document.amendments.len());

    for amendment in &document.amendments {
        let _ = writeln!(out);
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "§ {}", amendment.paragraph_number);
        let _ = writeln!(out, "{RULE}");

        if !amendment.targets.is_empty() {
            let _ = writeln!(out, "Target paths:");
            for target in &amendment.targets {
                let _ = writeln!(out, "   → {}", target.path);
            }
        }

        let _ = writeln!(out, "Content:");
        let _ = writeln!(out, "{}", truncate_chars(&amendment.content, CONTENT_PREVIEW_CHARS));

        if let Some(motives) = &amendment.motives {
            let _ = writeln!(out, "Motives:");
            let _ = writeln!(out, "{}", truncate_chars(motives, MOTIVES_PREVIEW_CHARS));
        }
    }

    out
}
