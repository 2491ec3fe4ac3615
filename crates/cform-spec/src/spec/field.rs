use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Semantic field types understood by the normalizer.
///
/// Anything else deserializes as [`FieldType::Unknown`]; unknown fields are
/// logged and omitted from the aggregated document, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Tel,
    Email,
    Password,
    Url,
    Hidden,
    Date,
    Time,
    Datetime,
    Range,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Signature,
    File,
    Table,
    Autocomplete,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Scalar types whose normalized value is the raw string content.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Textarea
                | FieldType::Number
                | FieldType::Tel
                | FieldType::Email
                | FieldType::Password
                | FieldType::Url
                | FieldType::Hidden
                | FieldType::Date
                | FieldType::Time
                | FieldType::Datetime
                | FieldType::Range
        )
    }

    /// Types contributed to the document by their own additive layer rather
    /// than the base serialization pass.
    pub fn has_own_layer(&self) -> bool {
        matches!(
            self,
            FieldType::Signature | FieldType::File | FieldType::Table | FieldType::Autocomplete
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Tel => "tel",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Url => "url",
            FieldType::Hidden => "hidden",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::Range => "range",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Signature => "signature",
            FieldType::File => "file",
            FieldType::Table => "table",
            FieldType::Autocomplete => "autocomplete",
            FieldType::Unknown => "unknown",
        }
    }
}

/// Column kind within a table field. Checkbox columns carry `,`-joined
/// selections that split into lists during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    #[default]
    Text,
    Checkbox,
}

/// A header column of a table field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    pub id: String,
    #[serde(default)]
    pub kind: ColumnKind,
}

impl ColumnSpec {
    /// Structural columns that never contribute row data.
    pub fn is_reserved(&self) -> bool {
        self.id == "row-index" || self.id == "row-delete"
    }
}

/// A single named input unit within a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    /// Unique identifier within the form document.
    pub id: String,
    /// Submit name; defaults to the id. A trailing `[]` marks the field as
    /// list-accumulating in the aggregated document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Default value; multi-valued defaults are `|`-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// When false, the field's key is stripped from the outgoing document.
    #[serde(default = "default_true")]
    pub post_data: bool,
    /// Header columns, table fields only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnSpec>,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    /// The name this field submits under.
    pub fn submit_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Submit name with any trailing list marker stripped; this is the key
    /// used in the aggregated document.
    pub fn base_name(&self) -> &str {
        self.submit_name()
            .strip_suffix("[]")
            .unwrap_or(self.submit_name())
    }

    pub fn is_list_marked(&self) -> bool {
        self.submit_name().ends_with("[]")
    }

    /// Default values, split on the `|` multi-value separator.
    pub fn default_values(&self) -> Vec<String> {
        match &self.default {
            Some(default) if !default.is_empty() => {
                default.split('|').map(|part| part.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_deserializes_to_catch_all() {
        let kind: FieldType = serde_json::from_str(r#""stepper""#).expect("json");
        assert_eq!(kind, FieldType::Unknown);
    }

    #[test]
    fn list_marker_is_stripped_from_base_name() {
        let field = FieldSpec {
            id: "tags".into(),
            name: Some("tags[]".into()),
            kind: FieldType::Checkbox,
            default: None,
            post_data: true,
            columns: vec![],
        };
        assert!(field.is_list_marked());
        assert_eq!(field.base_name(), "tags");
        assert_eq!(field.submit_name(), "tags[]");
    }

    #[test]
    fn defaults_split_on_pipe() {
        let field = FieldSpec {
            id: "color".into(),
            name: None,
            kind: FieldType::Multiselect,
            default: Some("red|blue".into()),
            post_data: true,
            columns: vec![],
        };
        assert_eq!(field.default_values(), vec!["red", "blue"]);
    }
}
