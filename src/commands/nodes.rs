use anyhow::{Result, bail};
use tracing::info;

use super::open_store_at;
use crate::cli::NodesArgs;
use crate::law_tree::LawNode;
use crate::store::{load_law, load_law_nodes};
use crate::util::truncate_chars;

pub fn run(args: NodesArgs) -> Result<()> {
    let connection = open_store_at(&args.store)?;

    let Some(law) = load_law(&connection, args.law_id)? else {
        bail!("law {} not found", args.law_id);
    };

    let nodes = load_law_nodes(&connection, law.id, args.node_type)?;
    info!(
        law_id = law.id,
        unique_id = law.unique_id,
        caption = %law.caption,
        nodes = nodes.len(),
        "loaded law nodes"
    );

    for node in &nodes {
        println!("{}", render_node_line(node, args.preview_chars));
    }

    Ok(())
}

fn render_node_line(node: &LawNode, preview_chars: usize) -> String {
    let indent = "  ".repeat(usize::try_from(node.level).unwrap_or(0));
    let orphan = if node.is_orphaned { " (orphan)" } else { "" };
    let preview = node
        .text
        .as_deref()
        .map(|text| truncate_chars(&text.replace('\n', " "), preview_chars))
        .unwrap_or_default();

    format!(
        "{indent}{} [{}]{orphan} {preview}",
        node.path,
        node.node_type.as_str()
    )
    .trim_end()
    .to_string()
}
