use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// One captioned entry of a law's `content_structure` forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructureNode {
    #[serde(rename = "pId", default)]
    pub p_id: Option<i64>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "children_or_empty")]
    pub children: Vec<StructureNode>,
}

/// `children` that is null or not an array counts as no children.
fn children_or_empty<'de, D>(deserializer: D) -> Result<Vec<StructureNode>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| StructureNode::deserialize(item).map_err(D::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentText {
    #[serde(default)]
    pub paragraphs: Vec<TextParagraph>,
}

/// A `content_text` paragraph; `text` holds an HTML fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextParagraph {
    #[serde(rename = "pId", default)]
    pub p_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "type", default)]
    pub type_code: Option<i64>,
    #[serde(rename = "fieldType", default)]
    pub field_type: Option<i64>,
    #[serde(rename = "hasInLinks", default)]
    pub has_in_links: Option<bool>,
}

/// The two blobs the core consumes for one law.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LawContent {
    pub structure: Vec<StructureNode>,
    pub text: ContentText,
}

impl LawContent {
    pub fn from_json(structure: &str, text: &str) -> CoreResult<Self> {
        let structure = serde_json::from_str(structure).map_err(|source| {
            CoreError::MalformedContent {
                what: "content_structure",
                source,
            }
        })?;
        let text = serde_json::from_str(text).map_err(|source| CoreError::MalformedContent {
            what: "content_text",
            source,
        })?;

        Ok(Self { structure, text })
    }
}

/// A law as exported by the source API, accepted by `import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawExport {
    pub unique_id: i64,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub content_structure: Option<serde_json::Value>,
    #[serde(default)]
    pub content_text: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LawExportFile {
    Many(Vec<LawExport>),
    One(LawExport),
}

impl LawExportFile {
    pub fn into_laws(self) -> Vec<LawExport> {
        match self {
            Self::Many(laws) => laws,
            Self::One(law) => vec![law],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessPaths {
    pub data_root: String,
    pub manifest_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessCounts {
    pub laws_selected: usize,
    pub laws_processed: usize,
    pub laws_succeeded: usize,
    pub laws_failed: usize,
    pub nodes_written: usize,
    pub structural_nodes: usize,
    pub orphan_nodes: usize,
    pub split_nodes: usize,
    pub missing_identifier_count: usize,
    pub markdown_fallback_count: usize,
    pub path_collision_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedLaw {
    pub law_id: i64,
    pub unique_id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: ProcessPaths,
    pub counts: ProcessCounts,
    pub failed_laws: Vec<FailedLaw>,
}
