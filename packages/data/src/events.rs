//! # State Events
//!
//! Notifications emitted synchronously while a changeset is applied. Every
//! payload carries the `source` tag of the changeset that produced it.

use crate::cursor::CursorState;
use crate::delta::{Delta, DeltaOp};
use crate::location::NodeLocation;
use crate::node::{AttrValue, NodeKey};
use blocky_common::Slot;

pub const ELEMENT_INSERT_CHILD: &str = "element-insert-child";
pub const ELEMENT_REMOVE_CHILD: &str = "element-remove-child";
pub const ELEMENT_SET_ATTRIB: &str = "element-set-attrib";

/// Structural change to the tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    InsertChild {
        parent: NodeKey,
        child: NodeKey,
        index: usize,
        location: NodeLocation,
        source: Option<String>,
    },
    RemoveChild {
        parent: NodeKey,
        child: NodeKey,
        index: usize,
        /// Where the child was before removal
        location: NodeLocation,
        source: Option<String>,
    },
    SetAttribute {
        node: NodeKey,
        key: String,
        /// `None` when the attribute was removed
        value: Option<AttrValue>,
        old_value: Option<AttrValue>,
        location: NodeLocation,
        source: Option<String>,
    },
}

impl TreeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TreeEvent::InsertChild { .. } => ELEMENT_INSERT_CHILD,
            TreeEvent::RemoveChild { .. } => ELEMENT_REMOVE_CHILD,
            TreeEvent::SetAttribute { .. } => ELEMENT_SET_ATTRIB,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            TreeEvent::InsertChild { source, .. }
            | TreeEvent::RemoveChild { source, .. }
            | TreeEvent::SetAttribute { source, .. } => source.as_deref(),
        }
    }
}

/// A block entered the tree, directly or inside an inserted subtree
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInserted {
    pub key: NodeKey,
    pub id: String,
    pub block_name: String,
    pub location: NodeLocation,
    pub source: Option<String>,
}

/// A text attribute was edited
#[derive(Debug, Clone, PartialEq)]
pub struct TextInput {
    pub node: NodeKey,
    /// Id of the node itself when it is a block
    pub block_id: Option<String>,
    pub attribute: String,
    pub location: NodeLocation,
    pub change: Delta,
    pub before: Delta,
    pub after: Delta,
    pub source: Option<String>,
}

impl TextInput {
    /// Offset just past the last text the change inserted
    pub fn insert_end(&self) -> Option<usize> {
        let mut position = 0;
        let mut end = None;
        for op in self.change.ops() {
            match op {
                DeltaOp::Insert { .. } => {
                    position += op.len();
                    end = Some(position);
                }
                DeltaOp::Retain { .. } => position += op.len(),
                DeltaOp::Delete { .. } => {}
            }
        }
        end
    }

    /// Plain text of the edited attribute up to `offset`
    pub fn text_before(&self, offset: usize) -> String {
        self.after.slice(0, offset).plain_text()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorChanged {
    pub previous: Option<CursorState>,
    pub current: Option<CursorState>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangesetApplied {
    /// State version after the changeset
    pub version: u64,
    /// Actions that took effect
    pub applied: usize,
    pub source: Option<String>,
}

/// Observer registries exposed by [`crate::State`]
#[derive(Debug, Clone, Default)]
pub struct StateSlots {
    pub tree: Slot<TreeEvent>,
    pub block_inserted: Slot<BlockInserted>,
    pub text_input: Slot<TextInput>,
    pub cursor_changed: Slot<CursorChanged>,
    pub changeset_applied: Slot<ChangesetApplied>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(before: &str, change: Delta) -> TextInput {
        let before = Delta::from(before);
        let after = before.compose(&change);
        TextInput {
            node: NodeKey(1),
            block_id: Some("b".into()),
            attribute: "textContent".into(),
            location: NodeLocation::new(vec![0]),
            change,
            before,
            after,
            source: None,
        }
    }

    #[test]
    fn test_insert_end() {
        let typed = input("#", Delta::new().retain(1).insert(" "));
        assert_eq!(typed.insert_end(), Some(2));
        assert_eq!(typed.text_before(2), "# ");

        let deleted = input("abc", Delta::new().delete(1));
        assert_eq!(deleted.insert_end(), None);
    }

    #[test]
    fn test_event_names() {
        let event = TreeEvent::RemoveChild {
            parent: NodeKey(0),
            child: NodeKey(3),
            index: 0,
            location: NodeLocation::new(vec![0]),
            source: Some("remote".into()),
        };
        assert_eq!(event.name(), "element-remove-child");
        assert_eq!(event.source(), Some("remote"));
    }
}
