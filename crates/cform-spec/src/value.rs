use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical aggregated representation of a form's state, keyed by submit
/// name in document order. Rebuilt fresh on every collection pass.
pub type FormDocument = IndexMap<String, FieldValue>;

/// One table row: cell values keyed by column id, in header-column order.
pub type Row = IndexMap<String, CellValue>;

/// A single pending upload, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileDescriptor {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub base64: String,
}

/// A table cell: plain text, or a list for checkbox-typed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    List(Vec<String>),
}

/// Normalized value shapes a field may contribute to a [`FormDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Files(Vec<FileDescriptor>),
    Rows(Vec<Row>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}
