use serde::Serialize;

/// Parsed "ЗАКОН за изменение и допълнение" document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmendmentDocument {
    pub law_name: Option<String>,
    pub target_law_name: Option<String>,
    pub amendments: Vec<Amendment>,
}

/// One § of an amendment law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amendment {
    pub paragraph_number: u32,
    pub content: String,
    pub motives: Option<String>,
    pub targets: Vec<Target>,
}

/// A structural address inside the amended law.
///
/// Components hold their rendered labels (`чл. 151`, `ал. 1`, `буква "б"`);
/// `path` joins the present ones with " > ".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Target {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    pub path: String,
}
