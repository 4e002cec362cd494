//! # Blocky Data
//!
//! Document model and changeset engine for a block-structured rich-text
//! editor.
//!
//! ## Architecture
//!
//! ```text
//! Changeset (recorded intents)
//!     ↓ State::apply
//! Document (arena tree)  →  StateSlots (tree, block, text, cursor events)
//!     ↓
//! CursorState (recomputed)     JSON (serialize::to_json / from_json)
//! ```
//!
//! ## Design
//!
//! - Every mutation flows through a [`Changeset`]; [`Document`] only exposes
//!   reads to callers
//! - Nodes are addressed by [`NodeKey`] while live and by [`NodeLocation`]
//!   when a stable path is needed
//! - Text content is always a [`Delta`]
//! - Notifications are synchronous; listeners queue follow-up work on a
//!   [`ChangesetQueue`]

pub mod changeset;
pub mod config;
pub mod cursor;
pub mod delta;
pub mod document;
pub mod errors;
pub mod events;
pub mod location;
pub mod node;
pub mod serialize;
pub mod state;

pub use changeset::{Action, ApplyOptions, Changeset, ChangesetQueue, ChangesetResult};
pub use config::{ConfigError, StateConfig, DEFAULT_CONFIG_NAME};
pub use cursor::{CursorPoint, CursorState};
pub use delta::{Attributes, Delta, DeltaOp, InsertValue};
pub use document::{Document, NodeData};
pub use errors::{DocumentError, DocumentResult, ErrorKind};
pub use events::{BlockInserted, ChangesetApplied, CursorChanged, StateSlots, TextInput, TreeEvent};
pub use location::{LocationRelation, NodeLocation};
pub use node::{
    AttrValue, DocNode, NodeAttributes, NodeKey, NodeKind, TEXT_BLOCK_NAME, TEXT_CONTENT,
};
pub use serialize::JsonNode;
pub use state::State;
