//! Changeset application against a live document
//!
//! This tests:
//! - Action ordering and the sequencing law
//! - Abort-remaining failure semantics
//! - Cursor recomputation after structural and text edits
//! - Block levels and the block id index

use blocky_data::{
    ApplyOptions, CursorPoint, CursorState, Delta, DocNode, DocumentError, NodeKey, State,
    TEXT_CONTENT,
};
use serde_json::json;

fn insert_blocks(state: &mut State, blocks: Vec<DocNode>) -> Vec<NodeKey> {
    let root = state.document().root();
    let keys: Vec<NodeKey> = blocks.into_iter().map(|node| state.create_node(node)).collect();

    let mut changeset = state.changeset();
    for &key in &keys {
        changeset.append_child(root, key);
    }
    state.apply(changeset, ApplyOptions::new()).unwrap();
    keys
}

fn text_blocks(ids: &[&str]) -> Vec<DocNode> {
    ids.iter().map(|id| DocNode::text_block(*id, *id)).collect()
}

#[test]
fn test_heading_scenario_export() {
    let mut state = State::default();
    let root = state.document().root();

    let block = state.create_text_block("Hello");
    let mut changeset = state.changeset();
    changeset.insert_child_at(root, 0, block);
    state.apply(changeset, ApplyOptions::new()).unwrap();

    let mut changeset = state.changeset();
    changeset.set_attribute(block, "textType", "heading1").unwrap();
    state.apply(changeset, ApplyOptions::new()).unwrap();

    let json = serde_json::to_value(state.to_json()).unwrap();
    let body = json["children"].as_array().unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["nodeName"], "Text");
    assert_eq!(body[0]["attributes"]["textType"], "heading1");
    assert_eq!(body[0]["textContent"], json!([{ "insert": "Hello" }]));
}

#[test]
fn test_block_levels() {
    let mut state = State::default();
    let nested = DocNode::block("List", "l0").with_child(
        DocNode::block("List", "l1").with_child(DocNode::text_block("t2", "deep")),
    );
    insert_blocks(&mut state, vec![nested]);

    let doc = state.document();
    let level = |id: &str| doc.block_level(doc.find_block(id).unwrap()).unwrap();
    assert_eq!(level("l0"), 0);
    assert_eq!(level("l1"), 1);
    assert_eq!(level("t2"), 2);
}

#[test]
fn test_generic_elements_do_not_count_as_levels() {
    let mut state = State::default();
    let nested = DocNode::block("Quote", "q").with_child(
        DocNode::element("div").with_child(DocNode::text_block("t", "x")),
    );
    insert_blocks(&mut state, vec![nested]);

    let doc = state.document();
    assert_eq!(doc.block_level(doc.find_block("t").unwrap()).unwrap(), 1);
}

#[test]
fn test_insert_before_cursor_shifts_with_refresh() {
    let mut state = State::default();
    insert_blocks(&mut state, text_blocks(&["a", "b"]));
    let root = state.document().root();
    state.set_cursor(Some(CursorState::collapsed(vec![1], 1)));

    let new_block = state.create_text_block("");
    let mut changeset = state.changeset();
    changeset.insert_child_at(root, 0, new_block);
    state
        .apply(changeset, ApplyOptions::new().refresh_cursor(true))
        .unwrap();

    assert_eq!(state.cursor(), Some(&CursorState::collapsed(vec![2], 1)));
}

#[test]
fn test_insert_before_cursor_without_refresh_keeps_cursor() {
    let mut state = State::default();
    insert_blocks(&mut state, text_blocks(&["a", "b"]));
    let root = state.document().root();
    state.set_cursor(Some(CursorState::collapsed(vec![1], 1)));

    let new_block = state.create_text_block("");
    let mut changeset = state.changeset();
    changeset.insert_child_at(root, 0, new_block);
    state.apply(changeset, ApplyOptions::new()).unwrap();

    assert_eq!(state.cursor(), Some(&CursorState::collapsed(vec![1], 1)));
}

#[test]
fn test_removed_cursor_block_collapses_to_parent() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, text_blocks(&["a", "b", "c"]));
    let root = state.document().root();
    state.set_cursor(Some(CursorState::open(
        CursorPoint::new(vec![1], 1),
        CursorPoint::new(vec![2], 1),
    )));

    let mut changeset = state.changeset();
    changeset.remove_child(root, keys[1]).set_refresh_cursor(true);
    state.apply(changeset, ApplyOptions::new()).unwrap();

    assert_eq!(
        state.cursor(),
        Some(&CursorState::open(
            CursorPoint::new(vec![], 0),
            CursorPoint::new(vec![1], 1),
        ))
    );
}

#[test]
fn test_sequencing_law() {
    let mut combined = State::default();
    let root = combined.document().root();
    let a = combined.create_node(DocNode::text_block("A", "first"));
    let b = combined.create_node(DocNode::text_block("B", "second"));
    let mut changeset = combined.changeset();
    changeset.insert_child_at(root, 0, a).insert_child_at(root, 1, b);
    combined.apply(changeset, ApplyOptions::new()).unwrap();

    let mut split = State::default();
    let root = split.document().root();
    let a = split.create_node(DocNode::text_block("A", "first"));
    let b = split.create_node(DocNode::text_block("B", "second"));
    let mut changeset = split.changeset();
    changeset.insert_child_at(root, 0, a);
    split.apply(changeset, ApplyOptions::new()).unwrap();
    let mut changeset = split.changeset();
    changeset.insert_child_at(root, 1, b);
    split.apply(changeset, ApplyOptions::new()).unwrap();

    assert_eq!(combined.to_json(), split.to_json());
    assert_eq!(combined.version(), 1);
    assert_eq!(split.version(), 2);
}

#[test]
fn test_delete_past_end_leaves_text_unchanged() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, vec![DocNode::text_block("t", "abc")]);

    let mut changeset = state.changeset();
    changeset
        .text_edit(keys[0], TEXT_CONTENT, |d| d.retain(1).delete(5))
        .unwrap();
    let err = state.apply(changeset, ApplyOptions::new()).unwrap_err();

    assert_eq!(
        err,
        DocumentError::DeltaOutOfRange {
            required: 6,
            available: 3
        }
    );
    assert_eq!(state.document().text(keys[0]), Some(&Delta::new().insert("abc")));
}

#[test]
fn test_oversized_retain_is_out_of_range() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, vec![DocNode::text_block("t", "abc")]);

    let mut changeset = state.changeset();
    changeset
        .text_edit(keys[0], TEXT_CONTENT, |d| d.retain(usize::MAX).delete(1))
        .unwrap();
    let err = state.apply(changeset, ApplyOptions::new()).unwrap_err();

    assert_eq!(
        err,
        DocumentError::DeltaOutOfRange {
            required: usize::MAX,
            available: 3
        }
    );
    assert_eq!(state.document().text(keys[0]), Some(&Delta::new().insert("abc")));
}

#[test]
fn test_edit_inside_surrogate_pair_is_rejected() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, vec![DocNode::text_block("t", "😀")]);
    state.set_cursor(Some(CursorState::collapsed(vec![0], 2)));

    let mut changeset = state.changeset();
    changeset
        .text_edit(keys[0], TEXT_CONTENT, |d| d.delete(1))
        .unwrap();
    let err = state
        .apply(changeset, ApplyOptions::new().refresh_cursor(true))
        .unwrap_err();

    assert_eq!(err, DocumentError::SurrogateSplit { offset: 1 });
    assert_eq!(state.document().text(keys[0]), Some(&Delta::new().insert("😀")));
    assert_eq!(state.cursor(), Some(&CursorState::collapsed(vec![0], 2)));
}

#[test]
fn test_stale_reference_aborts_remaining_actions() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, text_blocks(&["a", "b"]));
    let root = state.document().root();

    let mut changeset = state.changeset();
    changeset.remove_child(root, keys[1]);
    state.apply(changeset, ApplyOptions::new()).unwrap();

    let mut changeset = state.changeset();
    changeset.set_attribute(keys[0], "first", true).unwrap();
    changeset.set_attribute(keys[1], "second", true).unwrap();
    changeset.set_attribute(keys[0], "third", true).unwrap();
    let err = state.apply(changeset, ApplyOptions::new()).unwrap_err();

    assert_eq!(err, DocumentError::StaleReference(keys[1]));
    let a = state.document().get(keys[0]).unwrap();
    assert!(a.attribute("first").is_some());
    assert!(a.attribute("third").is_none());
    assert_eq!(state.version(), 3);
}

#[test]
fn test_released_node_is_stale() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, text_blocks(&["a"]));
    let root = state.document().root();

    let mut changeset = state.changeset();
    changeset.remove_child(root, keys[0]);
    state.apply(changeset, ApplyOptions::new()).unwrap();
    state.release(keys[0]).unwrap();

    let mut changeset = state.changeset();
    changeset.insert_child_at(root, 0, keys[0]);
    assert_eq!(
        state.apply(changeset, ApplyOptions::new()).unwrap_err(),
        DocumentError::StaleReference(keys[0])
    );
}

#[test]
fn test_duplicate_block_id() {
    let mut state = State::default();
    insert_blocks(&mut state, text_blocks(&["a"]));
    let root = state.document().root();

    let clash = state.create_node(DocNode::text_block("a", "again"));
    let mut changeset = state.changeset();
    changeset.append_child(root, clash);
    let err = state.apply(changeset, ApplyOptions::new()).unwrap_err();

    assert_eq!(err, DocumentError::DuplicateId("a".into()));
    assert_eq!(state.document().body().len(), 1);
}

#[test]
fn test_move_is_remove_then_insert() {
    let mut state = State::default();
    let keys = insert_blocks(
        &mut state,
        vec![
            DocNode::block("List", "list"),
            DocNode::text_block("item", "x"),
        ],
    );
    let root = state.document().root();

    let mut changeset = state.changeset();
    changeset
        .remove_child(root, keys[1])
        .insert_child_at(keys[0], 0, keys[1]);
    state.apply(changeset, ApplyOptions::new()).unwrap();

    let doc = state.document();
    assert_eq!(doc.body(), &[keys[0]]);
    assert_eq!(doc.find_block("item"), Some(keys[1]));
    assert_eq!(doc.block_level(keys[1]).unwrap(), 1);
    assert_eq!(doc.location_of(keys[1]).unwrap().path(), &[0, 0]);
}

#[test]
fn test_update_and_remove_attributes() {
    let mut state = State::default();
    let keys = insert_blocks(&mut state, text_blocks(&["a"]));

    let mut changeset = state.changeset();
    changeset
        .update_attributes(keys[0], [("textType", "quote"), ("align", "center")])
        .unwrap();
    changeset.remove_attribute(keys[0], "align").unwrap();
    let result = state.apply(changeset, ApplyOptions::new()).unwrap();

    assert_eq!(result.applied, 2);
    let data = state.document().get(keys[0]).unwrap();
    assert_eq!(data.attribute("textType").and_then(|v| v.as_str()), Some("quote"));
    assert!(data.attribute("align").is_none());
}
