use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldSpec;

/// Effect a condition applies to its target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Target is visible iff the condition evaluates true.
    Show,
    /// Target is visible iff the condition evaluates false.
    Hide,
}

/// A visibility condition attached to a field group.
///
/// The expression is newline-separated text; each line may embed
/// `{fieldName}` placeholders and lines combine with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionSpec {
    /// Field id of the group the effect applies to.
    pub target: String,
    pub kind: ConditionKind,
    pub expression: String,
}

/// Request-derived entries a form may ask to have merged into its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MetaField {
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "link_to_page")]
    LinkToPage,
    #[serde(rename = "user_agent")]
    UserAgent,
    #[serde(rename = "sender_IP")]
    SenderIp,
    #[serde(rename = "form_ID")]
    FormId,
}

/// Top-level form definition. Forms may nest; nested forms aggregate first
/// and merge as a base layer under the outer form's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<MetaField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<FormSpec>,
}

impl FormSpec {
    /// Look up a field by id anywhere in the form tree.
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.id == id)
            .or_else(|| self.forms.iter().find_map(|form| form.field(id)))
    }

    /// Look up a field by submit name, matching both `name` and `name[]`
    /// spellings anywhere in the form tree.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.submit_name() == name || field.base_name() == name)
            .or_else(|| self.forms.iter().find_map(|form| form.field_by_name(name)))
    }

    /// All fields in document order, nested forms included.
    pub fn all_fields(&self) -> Vec<&FieldSpec> {
        let mut fields: Vec<&FieldSpec> = Vec::new();
        for form in &self.forms {
            fields.extend(form.all_fields());
        }
        fields.extend(self.fields.iter());
        fields
    }

    /// All conditions in document order, nested forms included.
    pub fn all_conditions(&self) -> Vec<&ConditionSpec> {
        let mut conditions: Vec<&ConditionSpec> = Vec::new();
        for form in &self.forms {
            conditions.extend(form.all_conditions());
        }
        conditions.extend(self.conditions.iter());
        conditions
    }
}
