//! # Cursor State
//!
//! The user's position or range, expressed as node locations plus text
//! offsets. Cursor values are immutable: every structural edit produces a new
//! cursor through the `after_*` transforms.

use crate::delta::Delta;
use crate::location::NodeLocation;
use serde::{Deserialize, Serialize};

/// One cursor endpoint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CursorPoint {
    pub location: NodeLocation,
    /// Offset in UTF-16 code units within the node's text
    pub offset: usize,
}

impl CursorPoint {
    pub fn new(location: impl Into<NodeLocation>, offset: usize) -> Self {
        Self {
            location: location.into(),
            offset,
        }
    }

    fn after_insert(&self, inserted: &NodeLocation) -> Self {
        Self {
            location: self.location.shifted_by_insert(inserted),
            offset: self.offset,
        }
    }

    /// An endpoint inside the removed subtree collapses onto the start of the
    /// removed node's parent
    fn after_removal(&self, removed: &NodeLocation) -> Self {
        match self.location.shifted_by_removal(removed) {
            Some(location) => Self {
                location,
                offset: self.offset,
            },
            None => Self {
                location: removed.parent().unwrap_or_default(),
                offset: 0,
            },
        }
    }

    fn after_text_edit(&self, location: &NodeLocation, change: &Delta) -> Self {
        if self.location != *location {
            return self.clone();
        }
        Self {
            location: self.location.clone(),
            offset: change.transform_position(self.offset, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CursorState {
    Collapsed(CursorPoint),
    Open { start: CursorPoint, end: CursorPoint },
}

impl CursorState {
    pub fn collapsed(location: impl Into<NodeLocation>, offset: usize) -> Self {
        CursorState::Collapsed(CursorPoint::new(location, offset))
    }

    /// Range between two endpoints given in any order
    pub fn open(a: CursorPoint, b: CursorPoint) -> Self {
        if a == b {
            CursorState::Collapsed(a)
        } else if a < b {
            CursorState::Open { start: a, end: b }
        } else {
            CursorState::Open { start: b, end: a }
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, CursorState::Collapsed(_))
    }

    pub fn start(&self) -> &CursorPoint {
        match self {
            CursorState::Collapsed(point) => point,
            CursorState::Open { start, .. } => start,
        }
    }

    pub fn end(&self) -> &CursorPoint {
        match self {
            CursorState::Collapsed(point) => point,
            CursorState::Open { end, .. } => end,
        }
    }

    pub fn after_insert(&self, inserted: &NodeLocation) -> Self {
        self.map_points(|point| point.after_insert(inserted))
    }

    pub fn after_removal(&self, removed: &NodeLocation) -> Self {
        self.map_points(|point| point.after_removal(removed))
    }

    /// Carry text offsets through an edit of the node at `location`
    pub fn after_text_edit(&self, location: &NodeLocation, change: &Delta) -> Self {
        self.map_points(|point| point.after_text_edit(location, change))
    }

    fn map_points(&self, f: impl Fn(&CursorPoint) -> CursorPoint) -> Self {
        match self {
            CursorState::Collapsed(point) => CursorState::Collapsed(f(point)),
            CursorState::Open { start, end } => CursorState::open(f(start), f(end)),
        }
    }
}
