use chrono::Local;
use tracing::{debug, warn};

use crate::normalize::normalize_field;
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::{FormSpec, MetaField};
use crate::state::FormState;
use crate::value::{FieldValue, FormDocument};

/// Flags controlling document post-processing.
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    /// Blank the values of fields whose group is currently hidden.
    pub exclude_hidden_fields: bool,
    /// Emit a debug line with the finished document.
    pub log: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            exclude_hidden_fields: true,
            log: false,
        }
    }
}

/// Request-scoped inputs for the meta layer. Supplied by the caller; the
/// engine never reaches for ambient process state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

/// Re-enables temporarily-enabled fields when dropped, so disabled state is
/// restored on every exit path.
pub(crate) struct EnabledScope<'a> {
    state: &'a mut FormState,
    re_disable: Vec<String>,
}

impl<'a> EnabledScope<'a> {
    pub(crate) fn new(state: &'a mut FormState) -> Self {
        let re_disable: Vec<String> = state
            .fields
            .iter()
            .filter(|(_, field)| field.disabled)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &re_disable {
            state.field_mut(id).disabled = false;
        }
        Self { state, re_disable }
    }

    pub(crate) fn state(&self) -> &FormState {
        self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut FormState {
        self.state
    }
}

impl Drop for EnabledScope<'_> {
    fn drop(&mut self) {
        for id in &self.re_disable {
            self.state.field_mut(id).disabled = true;
        }
    }
}

/// Walk the form tree and build one aggregated document.
///
/// Disabled fields are enabled for the duration of collection and restored
/// afterwards. Nested forms are aggregated first and merged as a base
/// layer; the outer form's type-specific layers and serialized fields land
/// on top. Traversal is sequential in document order.
pub fn collect_document(
    spec: &FormSpec,
    state: &mut FormState,
    ctx: &RequestContext,
    options: &CollectOptions,
) -> FormDocument {
    let scope = EnabledScope::new(state);
    let mut document = collect_layers(spec, scope.state(), ctx, true);
    drop(scope);

    post_filter(spec, state, options, &mut document);

    if options.log {
        debug!(
            form = %spec.id,
            exclude_hidden = options.exclude_hidden_fields,
            document = %serde_json::to_string(&document).unwrap_or_default(),
            "collected form data"
        );
    }
    document
}

fn collect_layers(
    spec: &FormSpec,
    state: &FormState,
    ctx: &RequestContext,
    top_level: bool,
) -> FormDocument {
    let mut document = FormDocument::new();

    // Meta layer first, overridable by everything that follows.
    if top_level {
        merge_meta(spec, ctx, &mut document);
    }

    // Nested documents form the base layer, in document order.
    for form in &spec.forms {
        for (name, value) in collect_layers(form, state, ctx, false) {
            document.insert(name, value);
        }
    }

    // Type-specific additive layers.
    for field in &spec.fields {
        if !field.kind.has_own_layer() {
            continue;
        }
        if let Some(value) = normalize_field(field, state) {
            document.insert(field.base_name().to_string(), value);
        }
    }

    // Base serialized fields with the name-collision policy.
    let autocomplete_names: Vec<&str> = spec
        .fields
        .iter()
        .filter(|field| field.kind == FieldType::Autocomplete)
        .map(|field| field.base_name())
        .collect();
    for field in &spec.fields {
        for (name, value) in serialize_field(field, state) {
            merge_entry(&mut document, &autocomplete_names, name, value);
        }
    }

    document
}

/// Flat `(name, value)` entries a field contributes to the base pass.
/// Layer-owned and unknown types contribute nothing here.
fn serialize_field(field: &FieldSpec, state: &FormState) -> Vec<(String, String)> {
    let name = field.submit_name().to_string();
    match field.kind {
        kind if kind.is_scalar() => {
            let value = state
                .field(&field.id)
                .map(|field_state| field_state.first_value().to_string())
                .unwrap_or_default();
            vec![(name, value)]
        }
        FieldType::Select => {
            let value = state
                .field(&field.id)
                .and_then(|field_state| field_state.values.last().cloned())
                .unwrap_or_default();
            vec![(name, value)]
        }
        FieldType::Multiselect | FieldType::Radio | FieldType::Checkbox => state
            .field(&field.id)
            .map(|field_state| {
                field_state
                    .values
                    .iter()
                    .map(|value| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn merge_entry(
    document: &mut FormDocument,
    autocomplete_names: &[&str],
    name: String,
    value: String,
) {
    // Autocomplete keys are owned by their layer and never overwritten.
    let base = name.strip_suffix("[]").unwrap_or(&name);
    if autocomplete_names.contains(&base) {
        return;
    }

    if name.ends_with("[]") {
        // List-marked names always accumulate.
        append_coerced(document, base.to_string(), value);
    } else if document.contains_key(&name) {
        // A plain name repeated across entries coerces into an array.
        append_coerced(document, name, value);
    } else {
        document.insert(name, FieldValue::Text(value));
    }
}

fn append_coerced(document: &mut FormDocument, key: String, value: String) {
    match document.get_mut(&key) {
        None => {
            document.insert(key, FieldValue::List(vec![value]));
        }
        Some(slot) => match slot {
            FieldValue::List(items) => items.push(value),
            FieldValue::Text(existing) => {
                let first = std::mem::take(existing);
                *slot = FieldValue::List(vec![first, value]);
            }
            _ => warn!(key = %key, "cannot append serialized value to a layer-owned key"),
        },
    }
}

fn merge_meta(spec: &FormSpec, ctx: &RequestContext, document: &mut FormDocument) {
    let now = Local::now();
    for meta in &spec.meta {
        match meta {
            MetaField::Date => {
                document.insert(
                    "date".into(),
                    FieldValue::Text(now.format("%Y-%m-%d").to_string()),
                );
            }
            MetaField::Time => {
                document.insert(
                    "time".into(),
                    FieldValue::Text(now.format("%H:%M:%S").to_string()),
                );
            }
            MetaField::LinkToPage => {
                document.insert(
                    "link_to_page".into(),
                    FieldValue::Text(ctx.page_url.clone().unwrap_or_default()),
                );
            }
            MetaField::UserAgent => {
                document.insert(
                    "user_agent".into(),
                    FieldValue::Text(ctx.user_agent.clone().unwrap_or_default()),
                );
            }
            MetaField::SenderIp => {
                document.insert(
                    "client_ip".into(),
                    FieldValue::Text(ctx.client_ip.clone().unwrap_or_default()),
                );
            }
            MetaField::FormId => {
                document.insert("form_id".into(), FieldValue::Text(spec.id.clone()));
            }
        }
    }
}

/// Blank hidden-field values and drop not-for-transmission keys, per the
/// caller's flags.
fn post_filter(
    spec: &FormSpec,
    state: &FormState,
    options: &CollectOptions,
    document: &mut FormDocument,
) {
    let keys: Vec<String> = document.keys().cloned().collect();
    for key in keys {
        let Some(field) = spec.field_by_name(&key).or_else(|| spec.field(&key)) else {
            continue;
        };

        if options.exclude_hidden_fields && state.visibility_of(&field.id).is_hidden() {
            document.insert(key.clone(), FieldValue::Text(String::new()));
        }

        if !field.post_data {
            document.shift_remove(&key);
        }
    }
}
