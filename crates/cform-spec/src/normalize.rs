use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::spec::field::{ColumnKind, FieldSpec, FieldType};
use crate::state::{FieldState, FormState};
use crate::value::{CellValue, FieldValue, FileDescriptor, Row};

/// Convert a field's raw UI state into one of the canonical document value
/// shapes. Returns `None` when the field contributes nothing: unsigned
/// signatures and unrecognized field types.
pub fn normalize_field(field: &FieldSpec, state: &FormState) -> Option<FieldValue> {
    let empty = FieldState::default();
    let field_state = state.field(&field.id).unwrap_or(&empty);

    match field.kind {
        kind if kind.is_scalar() => Some(FieldValue::Text(field_state.first_value().to_string())),
        FieldType::Multiselect => Some(FieldValue::List(field_state.values.clone())),
        // A single select holding several stored values keeps the last one.
        FieldType::Select => Some(FieldValue::Text(
            field_state.values.last().cloned().unwrap_or_default(),
        )),
        FieldType::Radio | FieldType::Checkbox => Some(FieldValue::List(field_state.values.clone())),
        FieldType::Table => Some(FieldValue::Rows(normalize_table(field, field_state))),
        FieldType::Signature => field_state
            .signature
            .as_ref()
            .map(|payload| FieldValue::Text(payload.clone())),
        FieldType::File => Some(FieldValue::Files(normalize_files(field, state))),
        FieldType::Autocomplete => Some(FieldValue::Text(resolve_autocomplete(field_state))),
        _ => {
            warn!(
                field = %field.id,
                kind = field.kind.label(),
                "field type is not recognized; omitting from document"
            );
            None
        }
    }
}

/// Rows are read in header-column order; reserved structural columns are
/// skipped and checkbox-typed columns split on `,`.
fn normalize_table(field: &FieldSpec, state: &FieldState) -> Vec<Row> {
    state
        .rows
        .iter()
        .map(|cells| {
            let mut row = Row::new();
            for (index, column) in field.columns.iter().enumerate() {
                if column.is_reserved() {
                    continue;
                }
                let cell = cells.get(index).map(String::as_str).unwrap_or("");
                let value = match column.kind {
                    ColumnKind::Checkbox => CellValue::List(
                        cell.split(',').map(|part| part.trim().to_string()).collect(),
                    ),
                    ColumnKind::Text => CellValue::Text(cell.to_string()),
                };
                row.insert(column.id.clone(), value);
            }
            row
        })
        .collect()
}

fn normalize_files(field: &FieldSpec, state: &FormState) -> Vec<FileDescriptor> {
    state
        .pending_files(field.submit_name())
        .iter()
        .map(|file| FileDescriptor {
            file_name: file.file_name.clone(),
            base64: STANDARD.encode(&file.content),
        })
        .collect()
}

/// Autocomplete fields display a label; the submitted value is the option
/// key found by reverse lookup. A missing match yields the empty string.
fn resolve_autocomplete(state: &FieldState) -> String {
    let displayed = state.first_value();
    state.options.get(displayed).cloned().unwrap_or_default()
}
