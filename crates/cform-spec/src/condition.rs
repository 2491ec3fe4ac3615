use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::aggregate::{CollectOptions, RequestContext, collect_document};
use crate::expr::evaluate_str;
use crate::spec::field::FieldType;
use crate::spec::form::FormSpec;
use crate::state::FormState;
use crate::value::{FieldValue, FormDocument};

/// Image-data payload of an untouched signature canvas. A signature field
/// compares against this constant to decide whether it was signed.
pub const BLANK_SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAABmJLR0QA/wD/AP+gvaeTAAAACXBIWXMAAAsTAAALEwEAmpwYAAAAB3RJTUUH5gIRESAmxMFZvQAAAB1pVFh0Q29tbWVudAAAAAAAQ3JlYXRlZCB3aXRoIEdJTVBkLmUHAAAAC0lEQVQI12NgAAIAAAUAAeImBZsAAAAASUVORK5CYII=";

/// Outcome of one condition evaluation, with both expression forms kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionResult {
    /// Expression after placeholder substitution.
    pub substituted: String,
    /// Expression after hidden-line replacement, before substitution.
    pub effective: String,
    pub result: bool,
}

#[derive(Debug, Error)]
enum SubstituteError {
    #[error("field '{0}' has no substitutable value")]
    UnsupportedShape(String),
}

pub(crate) fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{.*?\}").expect("valid placeholder pattern"))
}

pub(crate) fn placeholder_name(raw: &str) -> &str {
    raw.trim_matches(|c| c == '{' || c == '}').trim()
}

/// Evaluate a newline-separated condition expression against the form's
/// current state.
///
/// Lines combine with logical AND. A line referencing any currently-hidden
/// field short-circuits to `true` for that line; remaining placeholders are
/// substituted with type-aware literal encodings of the aggregated values,
/// and the result is evaluated by the safe expression parser. Every failure
/// along the way degrades to `true` (fail-open visibility).
pub fn evaluate_condition(
    expression: &str,
    spec: &FormSpec,
    state: &mut FormState,
    ctx: &RequestContext,
) -> ConditionResult {
    // Hidden fields stay in the document here: visibility is itself an
    // input to the hidden-line replacement below.
    let document = collect_document(
        spec,
        state,
        ctx,
        &CollectOptions {
            exclude_hidden_fields: false,
            log: false,
        },
    );

    let effective = build_effective(expression, spec, state);

    match substitute(&effective, spec, &document) {
        Ok(substituted) => {
            let result = match evaluate_str(&substituted) {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        expression = %substituted,
                        error = %err,
                        "condition evaluation failed; defaulting to true"
                    );
                    true
                }
            };
            ConditionResult {
                substituted,
                effective,
                result,
            }
        }
        Err(err) => {
            warn!(
                expression = %effective,
                error = %err,
                "condition substitution failed; defaulting to true"
            );
            ConditionResult {
                substituted: effective.clone(),
                effective,
                result: true,
            }
        }
    }
}

/// Replace every line referencing a hidden field with `true`, parenthesize
/// the rest, and join with AND.
fn build_effective(expression: &str, spec: &FormSpec, state: &FormState) -> String {
    let lines: Vec<String> = expression
        .split('\n')
        .map(|line| {
            let has_hidden_field = placeholder_regex()
                .find_iter(line)
                .filter_map(|found| spec.field_by_name(placeholder_name(found.as_str())))
                .any(|field| state.visibility_of(&field.id).is_hidden());
            if has_hidden_field {
                "true".to_string()
            } else {
                format!("({})", line)
            }
        })
        .collect();
    lines.join(" && ")
}

fn substitute(
    effective: &str,
    spec: &FormSpec,
    document: &FormDocument,
) -> Result<String, SubstituteError> {
    let mut substituted = effective.to_string();
    let matches: Vec<String> = placeholder_regex()
        .find_iter(effective)
        .map(|found| found.as_str().to_string())
        .collect();

    for placeholder in matches {
        let name = placeholder_name(&placeholder);
        let Some(field) = spec.field_by_name(name) else {
            // Unknown reference: leave the placeholder in place; the parser
            // rejects it and the evaluation falls open.
            continue;
        };
        let value = document.get(field.base_name());
        let replacement = match field.kind {
            FieldType::Select | FieldType::Multiselect => match value {
                Some(FieldValue::List(items)) => quoted_array_encoding(items),
                Some(FieldValue::Text(text)) => format!("\"[\\\"{}\\\"]\"", text),
                _ => return Err(SubstituteError::UnsupportedShape(name.to_string())),
            },
            FieldType::Checkbox => match value {
                Some(FieldValue::List(items)) => quoted_array_encoding(items),
                _ => "\"[\\\"\\\"]\"".to_string(),
            },
            FieldType::Radio => match value {
                Some(FieldValue::List(items)) => {
                    // Brackets and quotes stripped from the JSON encoding,
                    // matching the authored comparison format.
                    let stripped: String = serde_json::to_string(items)
                        .unwrap_or_default()
                        .chars()
                        .filter(|c| !matches!(c, '[' | ']' | '"'))
                        .collect();
                    format!("\"{}\"", stripped)
                }
                _ => "\"\"".to_string(),
            },
            FieldType::Signature => {
                let payload = value.and_then(FieldValue::as_text).unwrap_or(BLANK_SIGNATURE);
                format!("\"{}\" !== \"{}\"", payload, BLANK_SIGNATURE)
            }
            _ => match value {
                Some(FieldValue::Text(text)) => format!("\"{}\"", escape_text(text)),
                _ => return Err(SubstituteError::UnsupportedShape(name.to_string())),
            },
        };
        substituted = substituted.replace(&placeholder, &replacement);
    }

    Ok(substituted)
}

/// JSON-encode a string array and escape its quotes for embedding inside a
/// double-quoted literal, e.g. `["a","b"]` becomes `"[\"a\",\"b\"]"`.
fn quoted_array_encoding(items: &[String]) -> String {
    let encoded = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
    format!("\"{}\"", encoded.replace('"', "\\\""))
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '"' | '\n' | '\r' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            other => escaped.push(other),
        }
    }
    escaped
}
