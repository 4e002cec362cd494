//! # Changesets
//!
//! A changeset records mutation intents in order. It does nothing until it is
//! handed to [`crate::State::apply`], which consumes it; a changeset can
//! therefore be applied at most once.
//!
//! ## Validation
//!
//! Malformed intents (an empty attribute key) fail at the builder call.
//! Everything that depends on the live tree (stale keys, text ranges,
//! duplicate ids) is checked when the action is applied.

use crate::cursor::CursorState;
use crate::delta::Delta;
use crate::errors::{DocumentError, DocumentResult};
use crate::node::{AttrValue, NodeKey};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// One recorded mutation intent
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    UpdateAttributes {
        node: NodeKey,
        attributes: Vec<(String, AttrValue)>,
    },
    SetAttribute {
        node: NodeKey,
        key: String,
        /// `None` removes the attribute
        value: Option<AttrValue>,
    },
    TextEdit {
        node: NodeKey,
        key: String,
        delta: Delta,
    },
    InsertChildAt {
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    },
    RemoveChild {
        parent: NodeKey,
        child: NodeKey,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::UpdateAttributes { .. } => "update-attributes",
            Action::SetAttribute { .. } => "set-attribute",
            Action::TextEdit { .. } => "text-edit",
            Action::InsertChildAt { .. } => "insert-child-at",
            Action::RemoveChild { .. } => "remove-child",
        }
    }
}

#[derive(Debug, Default)]
#[must_use = "a changeset does nothing until it is applied"]
pub struct Changeset {
    actions: Vec<Action>,
    refresh_cursor: bool,
    source: Option<String>,
    cursor: Option<Option<CursorState>>,
}

/// Recorded contents of a changeset, taken apart by the engine
pub(crate) struct ChangesetParts {
    pub actions: Vec<Action>,
    pub refresh_cursor: bool,
    pub source: Option<String>,
    pub cursor: Option<Option<CursorState>>,
}

fn check_key(key: &str) -> DocumentResult<()> {
    if key.is_empty() {
        return Err(DocumentError::invalid_attribute("attribute key is empty"));
    }
    Ok(())
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set several attributes on one node; applied in the given order
    pub fn update_attributes<I, K, V>(
        &mut self,
        node: NodeKey,
        attributes: I,
    ) -> DocumentResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                check_key(&key)?;
                Ok((key, value.into()))
            })
            .collect::<DocumentResult<Vec<_>>>()?;

        self.actions.push(Action::UpdateAttributes { node, attributes });
        Ok(self)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeKey,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> DocumentResult<&mut Self> {
        let key = key.into();
        check_key(&key)?;
        self.actions.push(Action::SetAttribute {
            node,
            key,
            value: Some(value.into()),
        });
        Ok(self)
    }

    pub fn remove_attribute(
        &mut self,
        node: NodeKey,
        key: impl Into<String>,
    ) -> DocumentResult<&mut Self> {
        let key = key.into();
        check_key(&key)?;
        self.actions.push(Action::SetAttribute {
            node,
            key,
            value: None,
        });
        Ok(self)
    }

    /// Edit the text held in attribute `key`. `build` receives an empty delta
    /// and returns the change; an empty change records nothing.
    pub fn text_edit<F>(
        &mut self,
        node: NodeKey,
        key: impl Into<String>,
        build: F,
    ) -> DocumentResult<&mut Self>
    where
        F: FnOnce(Delta) -> Delta,
    {
        let key = key.into();
        check_key(&key)?;
        let delta = build(Delta::new());
        if !delta.is_empty() {
            self.actions.push(Action::TextEdit { node, key, delta });
        }
        Ok(self)
    }

    /// Insert a detached node; `index` past the end appends
    pub fn insert_child_at(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> &mut Self {
        self.actions.push(Action::InsertChildAt {
            parent,
            index,
            child,
        });
        self
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> &mut Self {
        self.insert_child_at(parent, usize::MAX, child)
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> &mut Self {
        self.actions.push(Action::RemoveChild { parent, child });
        self
    }

    /// Recompute the cursor against the mutated tree after apply
    pub fn set_refresh_cursor(&mut self, refresh: bool) -> &mut Self {
        self.refresh_cursor = refresh;
        self
    }

    /// Provenance tag copied into every event this changeset produces
    pub fn set_source(&mut self, source: impl Into<String>) -> &mut Self {
        self.source = Some(source.into());
        self
    }

    /// Cursor to install once every action has applied
    pub fn set_cursor_state(&mut self, cursor: Option<CursorState>) -> &mut Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn into_parts(self) -> ChangesetParts {
        ChangesetParts {
            actions: self.actions,
            refresh_cursor: self.refresh_cursor,
            source: self.source,
            cursor: self.cursor,
        }
    }
}

/// Per-call options for [`crate::State::apply`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOptions {
    /// Recompute the cursor after the actions are applied
    pub refresh_cursor: bool,
    /// Apply without notifying any listener
    pub silent: bool,
    /// Overrides the changeset's own source tag
    pub source: Option<String>,
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_cursor(mut self, refresh: bool) -> Self {
        self.refresh_cursor = refresh;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Summary of a successful apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangesetResult {
    /// State version after the changeset and everything it deferred
    pub version: u64,
    /// Actions applied from the changeset itself
    pub applied: usize,
    /// Follow-up changesets drained from the queue
    pub deferred: usize,
}

/// Queue of follow-up changesets
///
/// Listeners have no mutable access to the state while it notifies them.
/// They push follow-up work here instead; the state drains the queue in FIFO
/// order once the changeset being applied has finished notifying.
#[derive(Clone, Default)]
pub struct ChangesetQueue {
    inner: Rc<RefCell<VecDeque<(Changeset, ApplyOptions)>>>,
}

impl ChangesetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, changeset: Changeset, options: ApplyOptions) {
        self.inner.borrow_mut().push_back((changeset, options));
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub(crate) fn pop(&self) -> Option<(Changeset, ApplyOptions)> {
        self.inner.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

impl fmt::Debug for ChangesetQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangesetQueue")
            .field("pending", &self.len())
            .finish()
    }
}
