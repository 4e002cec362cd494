//! JSON import/export of whole documents and configuration loading

use blocky_data::serialize::{from_json, from_json_str, to_json, to_json_string};
use blocky_data::{
    ApplyOptions, AttrValue, Delta, DocNode, DocumentError, State, StateConfig, DEFAULT_CONFIG_NAME,
};
use serde_json::{json, Map};
use std::fs;

fn sample_document() -> DocNode {
    let mut bold = Map::new();
    bold.insert("bold".into(), json!(true));
    let mut image = Map::new();
    image.insert("image".into(), json!("cat.png"));

    DocNode::document()
        .with_attribute("title", "Notes")
        .with_child(
            DocNode::text_block(
                "h",
                Delta::new()
                    .insert("Hello ")
                    .insert_with("world", bold.into_iter().collect()),
            )
            .with_attribute("textType", "heading1"),
        )
        .with_child(
            DocNode::block("List", "list")
                .with_attribute("ordered", false)
                .with_child(DocNode::text_block("i1", "one"))
                .with_child(
                    DocNode::element("figure")
                        .with_child(DocNode::block("Image", "img"))
                        .with_attribute("caption", Delta::new().insert("A cat")),
                ),
        )
        .with_child(DocNode::text_block(
            "embed",
            Delta::new().insert("see ").insert_embed(image, None),
        ))
}

#[test]
fn test_round_trip_preserves_tree() {
    let node = sample_document();
    let back = from_json(to_json(&node)).unwrap();
    assert_eq!(back, node);

    let text = to_json_string(&node).unwrap();
    assert_eq!(from_json_str(&text).unwrap(), node);
}

#[test]
fn test_state_load_and_export() {
    let json = to_json(&sample_document());
    let state = State::from_json(json.clone(), StateConfig::default()).unwrap();

    assert_eq!(state.version(), 0);
    assert_eq!(state.document().body().len(), 3);
    assert!(state.document().find_block("img").is_some());
    assert_eq!(state.to_json(), json);
}

#[test]
fn test_loaded_document_accepts_changesets() -> anyhow::Result<()> {
    let text = r#"{
        "nodeName": "document",
        "children": [
            { "nodeName": "Text", "id": "a", "textContent": [{ "insert": "Hi" }] }
        ]
    }"#;
    let mut state = State::from_json_str(text, StateConfig::default())?;
    let block = state
        .document()
        .find_block("a")
        .ok_or_else(|| anyhow::anyhow!("block a not loaded"))?;

    let mut changeset = state.changeset();
    changeset.text_edit(block, "textContent", |d| d.retain(2).insert("!"))?;
    state.apply(changeset, ApplyOptions::new())?;

    let exported = serde_json::to_value(state.to_json())?;
    assert_eq!(exported["children"][0]["textContent"], json!([{ "insert": "Hi!" }]));
    Ok(())
}

#[test]
fn test_load_rejects_duplicate_ids() {
    let text = r#"{
        "nodeName": "document",
        "children": [
            { "nodeName": "Text", "id": "a" },
            { "nodeName": "Text", "id": "a" }
        ]
    }"#;
    assert_eq!(
        State::from_json_str(text, StateConfig::default()).unwrap_err(),
        DocumentError::DuplicateId("a".into())
    );
}

#[test]
fn test_load_requires_document_root() {
    let text = r#"{ "nodeName": "Text", "id": "a" }"#;
    assert!(matches!(
        State::from_json_str(text, StateConfig::default()),
        Err(DocumentError::InvalidStructure(_))
    ));
}

#[test]
fn test_plain_json_attribute_stays_json() {
    let text = r#"{ "nodeName": "Image", "id": "i", "attributes": { "meta": { "t": "other" } } }"#;
    let node = from_json_str(text).unwrap();
    assert_eq!(node.attribute("meta"), Some(&AttrValue::Json(json!({ "t": "other" }))));
}

#[test]
fn test_config_load_from_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join(DEFAULT_CONFIG_NAME),
        r#"{ "documentName": "journal", "maxDeferredChangesets": 5 }"#,
    )?;

    let config = StateConfig::load(dir.path())?;
    assert_eq!(config.document_name, "journal");
    assert_eq!(config.max_deferred_changesets, 5);

    let mut state = State::new(config);
    let expected_prefix = format!("Blk-{}-", blocky_common::get_document_seed("journal"));
    assert!(state.new_block_id().starts_with(&expected_prefix));
    Ok(())
}
