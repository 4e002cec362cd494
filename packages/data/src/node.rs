//! # Document Nodes
//!
//! Node kinds form a closed set: the document root, generic elements and
//! block elements. All of them carry attributes and ordered children.
//!
//! [`DocNode`] is the owned, detached value form of a subtree. It is what
//! callers build before inserting content and what serialization produces
//! and consumes. The live tree inside [`crate::Document`] stores the same
//! data in an arena addressed by [`NodeKey`].

use crate::delta::Delta;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Node name of the document root
pub const DOCUMENT_NODE_NAME: &str = "document";

/// Block name of the plain text block
pub const TEXT_BLOCK_NAME: &str = "Text";

/// Attribute that holds a node's text content
pub const TEXT_CONTENT: &str = "textContent";

/// Handle to a node stored in a [`crate::Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) usize);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The single top-level container
    Document,
    /// Generic element: a name, attributes and children
    Element { name: String },
    /// One structural editing unit with a unique id
    Block { name: String, id: String },
}

impl NodeKind {
    pub fn node_name(&self) -> &str {
        match self {
            NodeKind::Document => DOCUMENT_NODE_NAME,
            NodeKind::Element { name } | NodeKind::Block { name, .. } => name,
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            NodeKind::Block { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block { .. })
    }

    pub fn is_document(&self) -> bool {
        matches!(self, NodeKind::Document)
    }
}

/// Attribute value: plain JSON or rich text
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Json(Value),
    Text(Delta),
}

impl AttrValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AttrValue::Json(value) => Some(value),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Delta> {
        match self {
            AttrValue::Text(delta) => Some(delta),
            AttrValue::Json(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        AttrValue::Json(value)
    }
}

impl From<Delta> for AttrValue {
    fn from(delta: Delta) -> Self {
        AttrValue::Text(delta)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Json(Value::String(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Json(Value::Bool(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

pub type NodeAttributes = BTreeMap<String, AttrValue>;

/// Owned subtree value
#[derive(Debug, Clone, PartialEq)]
pub struct DocNode {
    pub kind: NodeKind,
    pub attributes: NodeAttributes,
    pub children: Vec<DocNode>,
}

impl DocNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: NodeAttributes::new(),
            children: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document)
    }

    pub fn element(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Element { name: name.into() })
    }

    pub fn block(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(NodeKind::Block {
            name: name.into(),
            id: id.into(),
        })
    }

    /// A `Text` block holding `content`
    pub fn text_block(id: impl Into<String>, content: impl Into<Delta>) -> Self {
        Self::block(TEXT_BLOCK_NAME, id).with_text(content)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(self, content: impl Into<Delta>) -> Self {
        self.with_attribute(TEXT_CONTENT, AttrValue::Text(content.into()))
    }

    pub fn with_child(mut self, child: DocNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn node_name(&self) -> &str {
        self.kind.node_name()
    }

    pub fn block_id(&self) -> Option<&str> {
        self.kind.block_id()
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn text(&self) -> Option<&Delta> {
        self.attribute(TEXT_CONTENT).and_then(AttrValue::as_text)
    }
}
