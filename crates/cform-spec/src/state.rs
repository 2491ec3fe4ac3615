use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Visibility annotation written by the trigger and read back by the
/// evaluator. `Unknown` means no condition has run for the group yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Shown,
    Hidden,
    #[default]
    Unknown,
}

impl Visibility {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Visibility::Hidden)
    }
}

/// A label placed along a range widget's track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RangeLabel {
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
}

/// Range widget metadata. Installing this is a setup-only operation and
/// plays no part in per-submission normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RangeOptions {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<RangeLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn default_min() -> f64 {
    1.0
}

fn default_max() -> f64 {
    10.0
}

fn default_step() -> f64 {
    1.0
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            step: default_step(),
            labels: Vec::new(),
            value: None,
        }
    }
}

/// A file selected for upload but not yet transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PendingFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Current raw UI state of a single field. This stands in for the widget
/// the excluded UI layer would own.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldState {
    /// Raw values: text content, selected option values, or checked values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub visibility: Visibility,
    /// Option table (display label to option key), ordered as presented.
    /// Used by select/radio/checkbox population and autocomplete reverse
    /// lookup.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
    /// Table body cells in header-column order, table fields only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
    /// Image-data payload of a signature canvas; `None` means unsigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeOptions>,
}

impl FieldState {
    pub fn first_value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }
}

/// Runtime state for one form tree. Field ids are unique per document, so a
/// single flat map covers nested forms as well. Owning the option tables
/// and pending-upload lists here keeps all cross-call state on the form's
/// lifecycle instead of process-wide registries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormState {
    #[serde(default)]
    pub fields: IndexMap<String, FieldState>,
    /// Pending uploads keyed by field submit name; only files selected
    /// since the last reset appear here.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub uploads: IndexMap<String, Vec<PendingFile>>,
}

impl FormState {
    pub fn field(&self, id: &str) -> Option<&FieldState> {
        self.fields.get(id)
    }

    pub fn field_mut(&mut self, id: &str) -> &mut FieldState {
        self.fields.entry(id.to_string()).or_default()
    }

    pub fn visibility_of(&self, id: &str) -> Visibility {
        self.fields
            .get(id)
            .map(|field| field.visibility)
            .unwrap_or_default()
    }

    pub fn set_visibility(&mut self, id: &str, visibility: Visibility) {
        self.field_mut(id).visibility = visibility;
    }

    pub fn pending_files(&self, name: &str) -> &[PendingFile] {
        self.uploads.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push_pending_file(&mut self, name: &str, file: PendingFile) {
        self.uploads.entry(name.to_string()).or_default().push(file);
    }

    pub fn clear_pending_files(&mut self, name: &str) {
        self.uploads.shift_remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_defaults_to_unknown() {
        let state = FormState::default();
        assert_eq!(state.visibility_of("missing"), Visibility::Unknown);
        assert!(!state.visibility_of("missing").is_hidden());
    }

    #[test]
    fn pending_files_accumulate_per_name() {
        let mut state = FormState::default();
        state.push_pending_file(
            "docs",
            PendingFile {
                file_name: "a.txt".into(),
                content: b"hello".to_vec(),
            },
        );
        state.push_pending_file(
            "docs",
            PendingFile {
                file_name: "b.txt".into(),
                content: b"world".to_vec(),
            },
        );
        assert_eq!(state.pending_files("docs").len(), 2);
        state.clear_pending_files("docs");
        assert!(state.pending_files("docs").is_empty());
    }
}
