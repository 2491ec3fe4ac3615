use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use tracing::warn;

use crate::aggregate::EnabledScope;
use crate::condition::BLANK_SIGNATURE;
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::FormSpec;
use crate::state::{FormState, PendingFile, RangeOptions};
use crate::value::{CellValue, FieldValue};

/// Write a normalized value back into a field's UI state.
///
/// Shape mismatches are logged and skipped, mirroring the collection-side
/// policy of never propagating per-field faults.
pub fn populate_field(field: &FieldSpec, state: &mut FormState, value: &FieldValue) {
    match field.kind {
        kind if kind.is_scalar() => match value {
            FieldValue::Text(text) => {
                state.field_mut(&field.id).values = vec![text.clone()];
            }
            _ => shape_mismatch(field, "string"),
        },
        FieldType::Select => match value {
            FieldValue::Text(text) => {
                state.field_mut(&field.id).values = vec![text.clone()];
            }
            // A non-multiple select receiving an array keeps the last value.
            FieldValue::List(items) => match items.last() {
                Some(last) => state.field_mut(&field.id).values = vec![last.clone()],
                None => shape_mismatch(field, "non-empty array"),
            },
            _ => shape_mismatch(field, "string or array"),
        },
        FieldType::Multiselect => match value {
            FieldValue::List(items) => {
                state.field_mut(&field.id).values = items.clone();
            }
            FieldValue::Text(text) => {
                state.field_mut(&field.id).values = vec![text.clone()];
            }
            _ => shape_mismatch(field, "string or array"),
        },
        FieldType::Radio | FieldType::Checkbox => match value {
            FieldValue::List(items) => {
                let field_state = state.field_mut(&field.id);
                if field_state.options.is_empty() {
                    field_state.values = items.clone();
                } else {
                    // Check options in presentation order, like ticking the
                    // matching inputs in a group.
                    field_state.values = field_state
                        .options
                        .values()
                        .filter(|key| items.contains(key))
                        .cloned()
                        .collect();
                }
            }
            _ => shape_mismatch(field, "array"),
        },
        FieldType::Table => match value {
            FieldValue::Rows(rows) => {
                let cells: Vec<Vec<String>> = rows
                    .iter()
                    .map(|row| {
                        field
                            .columns
                            .iter()
                            .map(|column| match row.get(&column.id) {
                                Some(CellValue::Text(text)) => text.clone(),
                                Some(CellValue::List(items)) => items.join(","),
                                None => String::new(),
                            })
                            .collect()
                    })
                    .collect();
                state.field_mut(&field.id).rows = cells;
            }
            _ => shape_mismatch(field, "array of rows"),
        },
        FieldType::Signature => match value {
            FieldValue::Text(text) => {
                state.field_mut(&field.id).signature = Some(text.clone());
            }
            _ => shape_mismatch(field, "string"),
        },
        FieldType::File => match value {
            FieldValue::Files(files) => {
                let name = field.submit_name().to_string();
                state.clear_pending_files(&name);
                for descriptor in files {
                    match STANDARD.decode(&descriptor.base64) {
                        Ok(content) => state.push_pending_file(
                            &name,
                            PendingFile {
                                file_name: descriptor.file_name.clone(),
                                content,
                            },
                        ),
                        Err(err) => {
                            warn!(
                                field = %field.id,
                                file = %descriptor.file_name,
                                error = %err,
                                "skipping file with undecodable content"
                            );
                        }
                    }
                }
            }
            _ => shape_mismatch(field, "array of file descriptors"),
        },
        FieldType::Autocomplete => match value {
            FieldValue::Text(key) => {
                let field_state = state.field_mut(&field.id);
                // Display the label for a known key; otherwise show the raw
                // text as typed.
                let displayed = field_state
                    .options
                    .iter()
                    .find(|(_, option_key)| *option_key == key)
                    .map(|(label, _)| label.clone())
                    .unwrap_or_else(|| key.clone());
                field_state.values = vec![displayed];
            }
            _ => shape_mismatch(field, "string"),
        },
        _ => {
            warn!(field = %field.id, kind = field.kind.label(), "cannot populate unrecognized field type");
        }
    }
}

fn shape_mismatch(field: &FieldSpec, expected: &str) {
    warn!(
        field = %field.id,
        kind = field.kind.label(),
        expected,
        "populate value has wrong shape; field left unchanged"
    );
}

/// Populate a form from a document keyed by field id (falling back to
/// submit name). Disabled fields are enabled for the duration and restored
/// afterwards. Unknown keys are logged and skipped.
pub fn populate_form(
    spec: &FormSpec,
    state: &mut FormState,
    data: &IndexMap<String, FieldValue>,
) {
    let mut scope = EnabledScope::new(state);
    for (key, value) in data {
        let Some(field) = spec.field(key).or_else(|| spec.field_by_name(key)) else {
            warn!(key = %key, "populate key does not match any field");
            continue;
        };
        let field = field.clone();
        populate_field(&field, scope.state_mut(), value);
    }
}

/// Install an option table (display label to option key) for
/// select/radio/checkbox/autocomplete fields, then apply the field's
/// defaults. This is the setup-only counterpart of value population.
pub fn set_field_options(
    field: &FieldSpec,
    state: &mut FormState,
    options: IndexMap<String, String>,
) {
    let defaults = field.default_values();
    let field_state = state.field_mut(&field.id);
    field_state.options = options;

    match field.kind {
        FieldType::Multiselect | FieldType::Radio | FieldType::Checkbox => {
            field_state.values = field_state
                .options
                .values()
                .filter(|key| defaults.contains(key))
                .cloned()
                .collect();
        }
        FieldType::Select => {
            let chosen = defaults
                .first()
                .filter(|default| field_state.options.values().any(|key| key == *default))
                .cloned()
                .or_else(|| field_state.options.values().next().cloned());
            field_state.values = chosen.into_iter().collect();
        }
        FieldType::Autocomplete => {
            field_state.values.clear();
        }
        _ => {
            warn!(field = %field.id, kind = field.kind.label(), "field type does not carry an option table");
        }
    }
}

/// Install range widget metadata. Setup-only; normalization reads only the
/// current position.
pub fn set_range_options(field: &FieldSpec, state: &mut FormState, options: RangeOptions) {
    if field.kind != FieldType::Range {
        warn!(field = %field.id, kind = field.kind.label(), "range options on a non-range field");
        return;
    }
    let field_state = state.field_mut(&field.id);
    if let Some(value) = &options.value {
        field_state.values = vec![value.clone()];
    }
    field_state.range = Some(options);
}

/// Restore a form to its authored defaults: default values for inputs,
/// cleared pending uploads, blank signatures.
pub fn reset_form(spec: &FormSpec, state: &mut FormState) {
    for field in spec.all_fields() {
        let defaults = field.default_values();
        match field.kind {
            FieldType::Radio | FieldType::Checkbox | FieldType::Multiselect => {
                let field_state = state.field_mut(&field.id);
                if field_state.options.is_empty() {
                    field_state.values = defaults;
                } else {
                    field_state.values = field_state
                        .options
                        .values()
                        .filter(|key| defaults.contains(key))
                        .cloned()
                        .collect();
                }
            }
            FieldType::Select => {
                let field_state = state.field_mut(&field.id);
                let chosen = defaults
                    .first()
                    .cloned()
                    .or_else(|| field_state.options.values().next().cloned());
                field_state.values = chosen.into_iter().collect();
            }
            FieldType::File => {
                state.clear_pending_files(field.submit_name());
                state.field_mut(&field.id).values.clear();
            }
            FieldType::Signature => {
                state.field_mut(&field.id).signature = Some(BLANK_SIGNATURE.to_string());
            }
            FieldType::Table => {
                state.field_mut(&field.id).rows.clear();
            }
            _ => {
                let field_state = state.field_mut(&field.id);
                field_state.values = vec![defaults.first().cloned().unwrap_or_default()];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, kind: FieldType) -> FieldSpec {
        FieldSpec {
            id: id.into(),
            name: None,
            kind,
            default: None,
            post_data: true,
            columns: vec![],
        }
    }

    #[test]
    fn select_array_on_single_select_keeps_last() {
        let mut state = FormState::default();
        populate_field(
            &field("pick", FieldType::Select),
            &mut state,
            &FieldValue::List(vec!["a".into(), "b".into()]),
        );
        assert_eq!(state.field("pick").expect("state").values, vec!["b"]);
    }

    #[test]
    fn wrong_shape_leaves_field_unchanged() {
        let mut state = FormState::default();
        state.field_mut("note").values = vec!["before".into()];
        populate_field(
            &field("note", FieldType::Text),
            &mut state,
            &FieldValue::List(vec!["x".into()]),
        );
        assert_eq!(state.field("note").expect("state").values, vec!["before"]);
    }

    #[test]
    fn checkbox_populate_respects_option_order() {
        let mut state = FormState::default();
        state.field_mut("opts").options = IndexMap::from([
            ("One".to_string(), "1".to_string()),
            ("Two".to_string(), "2".to_string()),
            ("Three".to_string(), "3".to_string()),
        ]);
        populate_field(
            &field("opts", FieldType::Checkbox),
            &mut state,
            &FieldValue::List(vec!["3".into(), "1".into()]),
        );
        assert_eq!(state.field("opts").expect("state").values, vec!["1", "3"]);
    }

    #[test]
    fn select_options_apply_default_or_first() {
        let mut state = FormState::default();
        let options = IndexMap::from([
            ("Support".to_string(), "support".to_string()),
            ("Sales".to_string(), "sales".to_string()),
        ]);

        let mut spec = field("reason", FieldType::Select);
        spec.default = Some("sales".into());
        set_field_options(&spec, &mut state, options.clone());
        assert_eq!(state.field("reason").expect("state").values, vec!["sales"]);

        spec.default = None;
        set_field_options(&spec, &mut state, options);
        assert_eq!(state.field("reason").expect("state").values, vec!["support"]);
    }

    #[test]
    fn range_options_seed_the_current_position() {
        let mut state = FormState::default();
        let spec = field("score", FieldType::Range);
        set_range_options(
            &spec,
            &mut state,
            RangeOptions {
                value: Some("5".into()),
                ..RangeOptions::default()
            },
        );
        let field_state = state.field("score").expect("state");
        assert_eq!(field_state.values, vec!["5"]);
        assert_eq!(field_state.range.as_ref().expect("range").max, 10.0);
    }

    #[test]
    fn reset_restores_defaults_and_clears_uploads() {
        let spec: FormSpec = serde_json::from_value(serde_json::json!({
            "id": "f",
            "fields": [
                { "id": "name", "type": "text", "default": "anon" },
                { "id": "docs", "type": "file" },
                { "id": "sig", "type": "signature" }
            ],
            "forms": [
                {
                    "id": "inner",
                    "fields": [{ "id": "note", "type": "textarea", "default": "hello" }]
                }
            ]
        }))
        .expect("spec");
        let mut state = FormState::default();
        state.field_mut("name").values = vec!["typed".into()];
        state.field_mut("note").values = vec!["edited".into()];
        state.push_pending_file(
            "docs",
            PendingFile {
                file_name: "a.txt".into(),
                content: vec![1, 2, 3],
            },
        );
        state.field_mut("sig").signature = Some("data:image/png;base64,AAAA".into());

        reset_form(&spec, &mut state);

        assert_eq!(state.field("name").expect("state").values, vec!["anon"]);
        assert_eq!(state.field("note").expect("state").values, vec!["hello"]);
        assert!(state.pending_files("docs").is_empty());
        assert_eq!(
            state.field("sig").expect("state").signature.as_deref(),
            Some(BLANK_SIGNATURE)
        );
    }
}
