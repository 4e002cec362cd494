//! # JSON Serialization
//!
//! Mapping between [`DocNode`] trees and the JSON document format:
//!
//! ```text
//! { nodeName, id?, attributes?, children?, textContent? }
//! ```
//!
//! - `nodeName == "document"` is the root, a present `id` makes a block,
//!   anything else is a generic element
//! - The `textContent` attribute is written as the node's `textContent` op list
//! - Other delta-valued attributes are tagged as `{"t": "rich-text", "ops": [...]}`
//!   so they come back as deltas instead of plain JSON

use crate::delta::{Attributes, Delta, DeltaOp, InsertValue};
use crate::errors::{DocumentError, DocumentResult};
use crate::node::{AttrValue, DocNode, NodeAttributes, NodeKind, DOCUMENT_NODE_NAME, TEXT_CONTENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tag marking a rich-text attribute value
pub const RICH_TEXT_TAG: &str = "rich-text";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonNode {
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<JsonNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<Vec<DeltaOp>>,
}

/// Depth-first export of a node tree
pub fn to_json(node: &DocNode) -> JsonNode {
    let mut attributes = Map::new();
    let mut text_content = None;

    for (key, value) in &node.attributes {
        match value {
            AttrValue::Text(delta) if key == TEXT_CONTENT => {
                text_content = Some(delta.ops().to_vec());
            }
            AttrValue::Text(delta) => {
                attributes.insert(key.clone(), rich_text_value(delta));
            }
            AttrValue::Json(value) => {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }

    JsonNode {
        node_name: node.node_name().to_string(),
        id: node.block_id().map(str::to_string),
        attributes: (!attributes.is_empty()).then_some(attributes),
        children: (!node.children.is_empty()).then(|| node.children.iter().map(to_json).collect()),
        text_content,
    }
}

/// Rebuild a node tree from its JSON form
pub fn from_json(json: JsonNode) -> DocumentResult<DocNode> {
    let JsonNode {
        node_name,
        id,
        attributes,
        children,
        text_content,
    } = json;

    if node_name.is_empty() {
        return Err(DocumentError::MalformedJson("nodeName is empty".into()));
    }

    let kind = if node_name == DOCUMENT_NODE_NAME {
        if let Some(id) = id {
            return Err(DocumentError::MalformedJson(format!(
                "document node cannot carry id {id}"
            )));
        }
        NodeKind::Document
    } else {
        match id {
            Some(id) => NodeKind::Block {
                name: node_name,
                id,
            },
            None => NodeKind::Element { name: node_name },
        }
    };

    let mut node_attributes = NodeAttributes::new();
    for (key, value) in attributes.unwrap_or_default() {
        let value = match parse_rich_text(&key, &value)? {
            Some(delta) => AttrValue::Text(delta),
            None => AttrValue::Json(value),
        };
        node_attributes.insert(key, value);
    }
    if let Some(ops) = text_content {
        let delta = text_delta(TEXT_CONTENT, ops)?;
        node_attributes.insert(TEXT_CONTENT.to_string(), AttrValue::Text(delta));
    }

    let children = children
        .unwrap_or_default()
        .into_iter()
        .map(from_json)
        .collect::<DocumentResult<Vec<_>>>()?;

    Ok(DocNode {
        kind,
        attributes: node_attributes,
        children,
    })
}

pub fn to_json_string(node: &DocNode) -> DocumentResult<String> {
    Ok(serde_json::to_string(&to_json(node))?)
}

pub fn from_json_str(json: &str) -> DocumentResult<DocNode> {
    from_json(serde_json::from_str(json)?)
}

fn rich_text_value(delta: &Delta) -> Value {
    let mut map = Map::new();
    map.insert("t".into(), Value::String(RICH_TEXT_TAG.into()));
    map.insert("ops".into(), Value::Array(delta.ops().iter().map(op_value).collect()));
    Value::Object(map)
}

fn parse_rich_text(key: &str, value: &Value) -> DocumentResult<Option<Delta>> {
    let Some(map) = value.as_object() else {
        return Ok(None);
    };
    if map.get("t").and_then(Value::as_str) != Some(RICH_TEXT_TAG) {
        return Ok(None);
    }

    let ops = map.get("ops").cloned().unwrap_or(Value::Array(Vec::new()));
    let ops: Vec<DeltaOp> = serde_json::from_value(ops)?;
    text_delta(key, ops).map(Some)
}

/// Stored text must be made of inserts only
fn text_delta(key: &str, ops: Vec<DeltaOp>) -> DocumentResult<Delta> {
    let delta = Delta::from_ops(ops);
    if !delta.is_document() {
        return Err(DocumentError::MalformedJson(format!(
            "{key} holds retain or delete operations"
        )));
    }
    Ok(delta)
}

fn op_value(op: &DeltaOp) -> Value {
    let mut map = Map::new();
    match op {
        DeltaOp::Insert { insert, attributes } => {
            let insert = match insert {
                InsertValue::Text(text) => Value::String(text.clone()),
                InsertValue::Embed(embed) => Value::Object(embed.clone()),
            };
            map.insert("insert".into(), insert);
            insert_attributes(&mut map, attributes.as_ref());
        }
        DeltaOp::Retain { retain, attributes } => {
            map.insert("retain".into(), Value::from(*retain));
            insert_attributes(&mut map, attributes.as_ref());
        }
        DeltaOp::Delete { delete } => {
            map.insert("delete".into(), Value::from(*delete));
        }
    }
    Value::Object(map)
}

fn insert_attributes(map: &mut Map<String, Value>, attributes: Option<&Attributes>) {
    if let Some(attributes) = attributes {
        let attributes = attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        map.insert("attributes".into(), Value::Object(attributes));
    }
}
