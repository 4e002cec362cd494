//! # Document Tree
//!
//! The live node tree, stored in an arena and addressed by [`NodeKey`].
//!
//! ## Design
//!
//! - Keys are handed out sequentially and never reused, so a key to a
//!   released node stays invalid
//! - Nodes are created detached and only enter the tree through the changeset
//!   engine; the mutation methods here are crate-private
//! - A node is attached when its parent chain reaches the root
//! - Attached block ids are indexed for `find_block` and duplicate detection

use crate::delta::Delta;
use crate::errors::{DocumentError, DocumentResult};
use crate::location::NodeLocation;
use crate::node::{AttrValue, DocNode, NodeAttributes, NodeKey, NodeKind, TEXT_CONTENT};
use std::collections::{HashMap, HashSet};

/// One node stored in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    kind: NodeKind,
    attributes: NodeAttributes,
    children: Vec<NodeKey>,
    parent: Option<NodeKey>,
}

impl NodeData {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_name(&self) -> &str {
        self.kind.node_name()
    }

    pub fn block_id(&self) -> Option<&str> {
        self.kind.block_id()
    }

    pub fn is_block(&self) -> bool {
        self.kind.is_block()
    }

    pub fn attributes(&self) -> &NodeAttributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Text content, if the node is a text node
    pub fn text(&self) -> Option<&Delta> {
        self.attribute(TEXT_CONTENT).and_then(AttrValue::as_text)
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    root: NodeKey,
    ids: HashMap<String, NodeKey>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document: a root with no body
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Document,
            attributes: NodeAttributes::new(),
            children: Vec::new(),
            parent: None,
        };

        Self {
            nodes: vec![Some(root)],
            root: NodeKey(0),
            ids: HashMap::new(),
        }
    }

    /// Build a document from a detached tree whose top node is the root
    pub fn from_node(node: DocNode) -> DocumentResult<Self> {
        let DocNode {
            kind,
            attributes,
            children,
        } = node;

        if !kind.is_document() {
            return Err(DocumentError::invalid_structure(format!(
                "expected a document root, found {}",
                kind.node_name()
            )));
        }

        let mut document = Self::new();
        let root = document.root;
        if let Some(data) = document.slot_mut(root) {
            data.attributes = attributes;
        }

        for child in children {
            let key = document.create(child);
            document.insert_child_at(root, usize::MAX, key)?;
        }

        Ok(document)
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Top-level blocks
    pub fn body(&self) -> &[NodeKey] {
        self.nodes
            .get(self.root.0)
            .and_then(Option::as_ref)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    /// Node data for a live key, attached or not
    pub fn get(&self, key: NodeKey) -> Option<&NodeData> {
        self.nodes.get(key.0).and_then(Option::as_ref)
    }

    pub fn children(&self, key: NodeKey) -> DocumentResult<&[NodeKey]> {
        Ok(self.node(key)?.children())
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key).and_then(NodeData::parent)
    }

    pub fn text(&self, key: NodeKey) -> Option<&Delta> {
        self.get(key).and_then(NodeData::text)
    }

    /// Number of attached nodes, root included
    pub fn node_count(&self) -> usize {
        self.descendants(self.root).len()
    }

    /// True when the body holds no blocks
    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }

    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            if current == self.root {
                return true;
            }
            match self.get(current).and_then(NodeData::parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Path from the root to an attached node
    pub fn location_of(&self, key: NodeKey) -> DocumentResult<NodeLocation> {
        let mut path = Vec::new();
        let mut current = key;

        while current != self.root {
            let parent = self
                .get(current)
                .and_then(NodeData::parent)
                .ok_or(DocumentError::StaleReference(key))?;
            let index = self
                .node(parent)?
                .children
                .iter()
                .position(|&child| child == current)
                .ok_or(DocumentError::StaleReference(key))?;
            path.push(index);
            current = parent;
        }

        path.reverse();
        Ok(NodeLocation::new(path))
    }

    /// Node at `location`
    pub fn resolve(&self, location: &NodeLocation) -> DocumentResult<NodeKey> {
        let mut current = self.root;
        for &index in location.path() {
            current = self
                .node(current)?
                .children
                .get(index)
                .copied()
                .ok_or_else(|| DocumentError::InvalidLocation(location.clone()))?;
        }
        Ok(current)
    }

    /// Count of block ancestors between an attached node and the root
    pub fn block_level(&self, key: NodeKey) -> DocumentResult<usize> {
        if !self.is_attached(key) {
            return Err(DocumentError::StaleReference(key));
        }

        let mut level = 0;
        let mut current = self.parent(key);
        while let Some(ancestor) = current {
            if self.get(ancestor).is_some_and(NodeData::is_block) {
                level += 1;
            }
            current = self.parent(ancestor);
        }
        Ok(level)
    }

    /// Attached block with the given id
    pub fn find_block(&self, id: &str) -> Option<NodeKey> {
        self.ids.get(id).copied()
    }

    /// Owned copy of the subtree at `key`
    pub fn snapshot(&self, key: NodeKey) -> DocumentResult<DocNode> {
        let data = self.node(key)?;
        let children = data
            .children
            .iter()
            .map(|&child| self.snapshot(child))
            .collect::<DocumentResult<Vec<_>>>()?;

        Ok(DocNode {
            kind: data.kind.clone(),
            attributes: data.attributes.clone(),
            children,
        })
    }

    /// Owned copy of the whole document
    pub fn to_node(&self) -> DocNode {
        self.snapshot(self.root).unwrap_or_else(|_| DocNode::document())
    }

    /// Subtree keys in pre-order, `key` first
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut result = Vec::new();
        let mut stack = vec![key];

        while let Some(current) = stack.pop() {
            let Some(data) = self.get(current) else {
                continue;
            };
            result.push(current);
            stack.extend(data.children.iter().rev());
        }

        result
    }

    fn node(&self, key: NodeKey) -> DocumentResult<&NodeData> {
        self.get(key).ok_or(DocumentError::StaleReference(key))
    }

    fn slot_mut(&mut self, key: NodeKey) -> Option<&mut NodeData> {
        self.nodes.get_mut(key.0).and_then(Option::as_mut)
    }

    fn attached_mut(&mut self, key: NodeKey) -> DocumentResult<&mut NodeData> {
        if !self.is_attached(key) {
            return Err(DocumentError::StaleReference(key));
        }
        self.slot_mut(key).ok_or(DocumentError::StaleReference(key))
    }

    fn owned_block_id(&self, key: NodeKey) -> Option<String> {
        self.get(key).and_then(NodeData::block_id).map(str::to_string)
    }

    fn alloc(&mut self, data: NodeData) -> NodeKey {
        let key = NodeKey(self.nodes.len());
        self.nodes.push(Some(data));
        key
    }

    // Mutation capability, reachable only through the changeset engine

    /// Materialize a detached subtree
    pub(crate) fn create(&mut self, node: DocNode) -> NodeKey {
        let DocNode {
            kind,
            attributes,
            children,
        } = node;

        let key = self.alloc(NodeData {
            kind,
            attributes,
            children: Vec::new(),
            parent: None,
        });

        let child_keys: Vec<NodeKey> = children
            .into_iter()
            .map(|child| self.create(child))
            .collect();
        for &child in &child_keys {
            if let Some(data) = self.slot_mut(child) {
                data.parent = Some(key);
            }
        }
        if let Some(data) = self.slot_mut(key) {
            data.children = child_keys;
        }

        key
    }

    /// Free a detached subtree. Its keys become permanently stale.
    pub(crate) fn release(&mut self, key: NodeKey) -> DocumentResult<()> {
        let data = self.node(key)?;
        if key == self.root || data.parent.is_some() {
            return Err(DocumentError::invalid_structure(format!(
                "{key} is still part of a tree and cannot be released"
            )));
        }

        for node in self.descendants(key) {
            if let Some(slot) = self.nodes.get_mut(node.0) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Attach the detached subtree `child` under `parent`. Returns the index
    /// the child landed at; `index` is clamped to the child count.
    pub(crate) fn insert_child_at(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> DocumentResult<usize> {
        if !self.is_attached(parent) {
            return Err(DocumentError::StaleReference(parent));
        }
        let child_data = self.node(child)?;
        if child == self.root || child_data.parent.is_some() {
            return Err(DocumentError::invalid_structure(format!(
                "{child} already has a parent"
            )));
        }

        let subtree = self.descendants(child);
        let mut seen = HashSet::new();
        for &node in &subtree {
            let Some(data) = self.get(node) else {
                continue;
            };
            if data.kind.is_document() {
                return Err(DocumentError::invalid_structure(
                    "a document node cannot be nested",
                ));
            }
            if let Some(id) = data.block_id() {
                if self.ids.contains_key(id) || !seen.insert(id) {
                    return Err(DocumentError::DuplicateId(id.to_string()));
                }
            }
        }

        let parent_data = self.attached_mut(parent)?;
        let index = index.min(parent_data.children.len());
        parent_data.children.insert(index, child);
        if let Some(data) = self.slot_mut(child) {
            data.parent = Some(parent);
        }

        for node in subtree {
            if let Some(id) = self.owned_block_id(node) {
                self.ids.insert(id, node);
            }
        }

        Ok(index)
    }

    /// Detach `child` from `parent`. Returns the index it was removed from.
    pub(crate) fn remove_child(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
    ) -> DocumentResult<usize> {
        let parent_data = self.attached_mut(parent)?;
        let index = parent_data
            .children
            .iter()
            .position(|&key| key == child)
            .ok_or(DocumentError::StaleReference(child))?;
        parent_data.children.remove(index);

        if let Some(data) = self.slot_mut(child) {
            data.parent = None;
        }

        for node in self.descendants(child) {
            if let Some(id) = self.owned_block_id(node) {
                if self.ids.get(&id) == Some(&node) {
                    self.ids.remove(&id);
                }
            }
        }

        Ok(index)
    }

    /// Set or remove (`None`) an attribute. Returns the previous value.
    pub(crate) fn set_attribute(
        &mut self,
        key: NodeKey,
        name: &str,
        value: Option<AttrValue>,
    ) -> DocumentResult<Option<AttrValue>> {
        if name.is_empty() {
            return Err(DocumentError::invalid_attribute("attribute key is empty"));
        }

        let data = self.attached_mut(key)?;
        Ok(match value {
            Some(value) => data.attributes.insert(name.to_string(), value),
            None => data.attributes.remove(name),
        })
    }

    /// Apply `change` to the delta held in attribute `name`; a missing
    /// attribute counts as empty text. Returns the text before and after.
    /// The attribute is untouched when the change does not fit.
    pub(crate) fn text_edit(
        &mut self,
        key: NodeKey,
        name: &str,
        change: &Delta,
    ) -> DocumentResult<(Delta, Delta)> {
        let data = self.attached_mut(key)?;
        let before = match data.attributes.get(name) {
            None => Delta::new(),
            Some(AttrValue::Text(delta)) => delta.clone(),
            Some(AttrValue::Json(_)) => {
                return Err(DocumentError::invalid_attribute(format!(
                    "{name} is not a text attribute"
                )))
            }
        };

        let after = before.apply_change(change)?;
        data.attributes
            .insert(name.to_string(), AttrValue::Text(after.clone()));
        Ok((before, after))
    }
}
