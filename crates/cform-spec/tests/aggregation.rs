use serde_json::json;

use cform_spec::{
    CollectOptions, FieldValue, FormSpec, FormState, RequestContext, Visibility, collect_document,
};

fn parse_form(value: serde_json::Value) -> FormSpec {
    serde_json::from_value(value).expect("form spec")
}

#[test]
fn list_marked_names_accumulate_into_arrays() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [{ "id": "tags", "name": "tags[]", "type": "checkbox" }]
    }));
    let mut state = FormState::default();
    state.field_mut("tags").values = vec!["x".into(), "y".into()];

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert_eq!(
        document["tags"],
        FieldValue::List(vec!["x".into(), "y".into()])
    );
}

#[test]
fn repeated_plain_names_coerce_into_arrays() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [
            { "id": "first", "name": "contact", "type": "text" },
            { "id": "second", "name": "contact", "type": "text" }
        ]
    }));
    let mut state = FormState::default();
    state.field_mut("first").values = vec!["a".into()];
    state.field_mut("second").values = vec!["b".into()];

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert_eq!(
        document["contact"],
        FieldValue::List(vec!["a".into(), "b".into()])
    );
}

#[test]
fn hidden_fields_are_blanked_not_removed() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [
            { "id": "shown", "type": "text" },
            { "id": "tucked", "type": "text" }
        ]
    }));
    let mut state = FormState::default();
    state.field_mut("shown").values = vec!["keep".into()];
    state.field_mut("tucked").values = vec!["drop".into()];
    state.set_visibility("tucked", Visibility::Hidden);

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert_eq!(document["shown"], FieldValue::Text("keep".into()));
    assert_eq!(document["tucked"], FieldValue::Text(String::new()));

    let unfiltered = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions {
            exclude_hidden_fields: false,
            log: false,
        },
    );
    assert_eq!(unfiltered["tucked"], FieldValue::Text("drop".into()));
}

#[test]
fn not_for_transmission_fields_are_dropped() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [
            { "id": "kept", "type": "text" },
            { "id": "local_only", "type": "text", "post_data": false }
        ]
    }));
    let mut state = FormState::default();
    state.field_mut("kept").values = vec!["v".into()];
    state.field_mut("local_only").values = vec!["w".into()];

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert!(document.contains_key("kept"));
    assert!(!document.contains_key("local_only"));
}

#[test]
fn outer_fields_override_nested_form_entries() {
    let spec = parse_form(json!({
        "id": "outer",
        "fields": [{ "id": "outer_title", "name": "title", "type": "text" }],
        "forms": [{
            "id": "inner",
            "fields": [{ "id": "inner_title", "name": "title", "type": "text" }]
        }]
    }));
    let mut state = FormState::default();
    state.field_mut("outer_title").values = vec!["outer wins".into()];
    state.field_mut("inner_title").values = vec!["inner".into()];

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    // The nested document is the base layer; the outer field repeats the
    // name, so the entries coerce into an array with the outer value last.
    assert_eq!(
        document["title"],
        FieldValue::List(vec!["inner".into(), "outer wins".into()])
    );
}

#[test]
fn autocomplete_layer_is_never_overwritten() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [
            { "id": "city", "type": "autocomplete" },
            { "id": "shadow", "name": "city", "type": "text" }
        ]
    }));
    let mut state = FormState::default();
    let city = state.field_mut("city");
    city.values = vec!["Tel Aviv".into()];
    city.options
        .insert("Tel Aviv".to_string(), "TLV".to_string());
    state.field_mut("shadow").values = vec!["typed over".into()];

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert_eq!(document["city"], FieldValue::Text("TLV".into()));
}

#[test]
fn unsigned_signature_contributes_no_entry() {
    let spec = parse_form(json!({
        "id": "f",
        "fields": [{ "id": "sig", "type": "signature" }]
    }));
    let mut state = FormState::default();

    let document = collect_document(
        &spec,
        &mut state,
        &RequestContext::default(),
        &CollectOptions::default(),
    );

    assert!(!document.contains_key("sig"));
}
