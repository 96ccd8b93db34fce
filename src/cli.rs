use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::law_tree::NodeType;

#[derive(Parser, Debug)]
#[command(
    name = "bglex",
    version,
    about = "Bulgarian law tree processing and amendment reference parsing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load law exports (structure + text blobs) into the store.
    Import(ImportArgs),
    /// Build node trees for stored laws.
    Process(ProcessArgs),
    /// Parse an amendment law and list the targets of each §.
    ParseChanges(ParseChangesArgs),
    /// Print the stored nodes of one law.
    Nodes(NodesArgs),
    Status(StatusArgs),
}

/// Location of the SQLite store and run manifests.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/bglex")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_root.join("bglex.sqlite"))
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.data_root.join("manifests")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[arg(long)]
    pub law_id: Option<i64>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ParseChangesArgs {
    pub file: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NodesArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub law_id: i64,

    #[arg(long, value_parser = parse_node_type)]
    pub node_type: Option<NodeType>,

    #[arg(long, default_value_t = 120)]
    pub preview_chars: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

fn parse_node_type(value: &str) -> Result<NodeType, String> {
    NodeType::parse(value).ok_or_else(|| {
        let known: Vec<&str> = NodeType::ALL.iter().map(|node_type| node_type.as_str()).collect();
        format!("unknown node type '{value}', expected one of: {}", known.join(", "))
    })
}
