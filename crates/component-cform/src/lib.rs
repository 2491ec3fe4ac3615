use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use cform_spec::{
    CollectOptions, FormSpec, FormState, RequestContext, TriggerEngine, TriggerOutcome,
    evaluate_condition, populate_form, reset_form,
};

const DEFAULT_SPEC: &str = include_str!("../../cform-spec/tests/fixtures/contact_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse populate data: {0}")]
    DataParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
}

fn load_form_spec(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);

    serde_json::from_str(spec_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(config_json)?;
    if spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn parse_context(ctx_json: &str) -> Value {
    serde_json::from_str(ctx_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn parse_state(state_json: &str) -> FormState {
    serde_json::from_str(state_json).unwrap_or_default()
}

fn request_context(ctx: &Value) -> RequestContext {
    let text = |key: &str| {
        ctx.get(key)
            .and_then(Value::as_str)
            .map(|value| value.to_string())
    };
    RequestContext {
        page_url: text("page_url"),
        user_agent: text("user_agent"),
        client_ip: text("client_ip"),
    }
}

fn collect_options(ctx: &Value) -> CollectOptions {
    CollectOptions {
        exclude_hidden_fields: ctx
            .get("exclude_hidden_fields")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        log: false,
    }
}

fn outcome_value(outcome: &TriggerOutcome) -> Result<Value, ComponentError> {
    Ok(json!({
        "target": outcome.target,
        "kind": serde_json::to_value(outcome.kind).map_err(ComponentError::JsonEncode)?,
        "visible": outcome.visible,
        "changed": outcome.changed,
        "result": outcome.condition.result,
        "substituted": outcome.condition.substituted,
    }))
}

fn state_response(state: &FormState, outcomes: &[TriggerOutcome]) -> Result<Value, ComponentError> {
    let outcomes: Vec<Value> = outcomes
        .iter()
        .map(outcome_value)
        .collect::<Result<_, _>>()?;
    Ok(json!({
        "outcomes": outcomes,
        "state": serde_json::to_value(state).map_err(ComponentError::JsonEncode)?,
    }))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|spec| serde_json::to_value(spec).map_err(ComponentError::JsonEncode)),
    )
}

/// Aggregate the form's current state into one submission document.
pub fn collect(form_id: &str, config_json: &str, state_json: &str, ctx_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let ctx = parse_context(ctx_json);
        let mut state = parse_state(state_json);
        let document = cform_spec::collect_document(
            &spec,
            &mut state,
            &request_context(&ctx),
            &collect_options(&ctx),
        );
        Ok(json!({
            "document": serde_json::to_value(&document).map_err(ComponentError::JsonEncode)?,
        }))
    }))
}

/// Evaluate one condition expression against the current state.
pub fn evaluate(
    form_id: &str,
    config_json: &str,
    state_json: &str,
    ctx_json: &str,
    expression: &str,
) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let ctx = parse_context(ctx_json);
        let mut state = parse_state(state_json);
        let result = evaluate_condition(expression, &spec, &mut state, &request_context(&ctx));
        json!({
            "result": result.result,
            "substituted": result.substituted,
            "effective": result.effective,
        })
    }))
}

/// Run every authored condition and return the outcomes plus the updated
/// state with its visibility annotations.
pub fn run_conditions(form_id: &str, config_json: &str, state_json: &str, ctx_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let ctx = parse_context(ctx_json);
        let mut state = parse_state(state_json);
        let mut engine = TriggerEngine::new(&spec);
        let outcomes = engine.run_all(&spec, &mut state, &request_context(&ctx));
        state_response(&state, &outcomes)
    }))
}

/// Re-evaluate only the conditions referencing the changed field, cascading
/// through any visibility flips.
pub fn process_event(
    form_id: &str,
    config_json: &str,
    state_json: &str,
    ctx_json: &str,
    changed_field: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let ctx = parse_context(ctx_json);
        let mut state = parse_state(state_json);
        let mut engine = TriggerEngine::new(&spec);
        let outcomes = engine.process_event(changed_field, &spec, &mut state, &request_context(&ctx));
        state_response(&state, &outcomes)
    }))
}

/// Write a document of values back into the form state.
pub fn populate(form_id: &str, config_json: &str, state_json: &str, data_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let mut state = parse_state(state_json);
        let data = serde_json::from_str(data_json).map_err(ComponentError::DataParse)?;
        populate_form(&spec, &mut state, &data);
        Ok(json!({
            "state": serde_json::to_value(&state).map_err(ComponentError::JsonEncode)?,
        }))
    }))
}

/// Restore the form state to its authored defaults.
pub fn reset(form_id: &str, config_json: &str, state_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let mut state = parse_state(state_json);
        reset_form(&spec, &mut state);
        Ok(json!({
            "state": serde_json::to_value(&state).map_err(ComponentError::JsonEncode)?,
        }))
    }))
}
