//! # Editor State
//!
//! Owns the document, the cursor and the observer slots, and is the only
//! place where changesets are applied.
//!
//! ## Apply rules
//!
//! - Actions run in recorded order against the live tree
//! - Each primitive mutation emits its event right after it takes effect
//! - The first failing action aborts the rest; earlier actions stay applied
//! - The version advances once per changeset, failed or not
//! - Follow-up changesets queued by listeners run after the in-flight one,
//!   in FIFO order, up to `maxDeferredChangesets`
//! - Silent applies mutate without notifying anyone

use crate::changeset::{
    Action, ApplyOptions, Changeset, ChangesetParts, ChangesetQueue, ChangesetResult,
};
use crate::config::StateConfig;
use crate::cursor::CursorState;
use crate::delta::Delta;
use crate::document::Document;
use crate::errors::{DocumentError, DocumentResult};
use crate::events::{
    BlockInserted, ChangesetApplied, CursorChanged, StateSlots, TextInput, TreeEvent,
};
use crate::node::{AttrValue, DocNode, NodeKey, TEXT_BLOCK_NAME, TEXT_CONTENT};
use crate::serialize::{self, JsonNode};
use blocky_common::IdGenerator;
use tracing::{debug, instrument, trace, warn};

/// Per-changeset emission context
struct EmitContext {
    silent: bool,
    source: Option<String>,
}

#[derive(Debug)]
pub struct State {
    document: Document,
    cursor: Option<CursorState>,
    version: u64,
    id_generator: IdGenerator,
    slots: StateSlots,
    deferred: ChangesetQueue,
    config: StateConfig,
}

impl Default for State {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl State {
    /// State over an empty document
    pub fn new(config: StateConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(document: Document, config: StateConfig) -> Self {
        Self {
            document,
            cursor: None,
            version: 0,
            id_generator: IdGenerator::new(&config.document_name),
            slots: StateSlots::default(),
            deferred: ChangesetQueue::new(),
            config,
        }
    }

    /// Load a document without emitting any event
    pub fn from_json(json: JsonNode, config: StateConfig) -> DocumentResult<Self> {
        let node = serialize::from_json(json)?;
        Ok(Self::with_document(Document::from_node(node)?, config))
    }

    pub fn from_json_str(json: &str, config: StateConfig) -> DocumentResult<Self> {
        Self::from_json(serde_json::from_str(json)?, config)
    }

    pub fn to_json(&self) -> JsonNode {
        serialize::to_json(&self.document.to_node())
    }

    pub fn to_json_string(&self) -> DocumentResult<String> {
        serialize::to_json_string(&self.document.to_node())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn slots(&self) -> &StateSlots {
        &self.slots
    }

    /// Handle for queueing follow-up changesets from listeners
    pub fn deferred(&self) -> ChangesetQueue {
        self.deferred.clone()
    }

    pub fn changeset(&self) -> Changeset {
        Changeset::new()
    }

    pub fn cursor(&self) -> Option<&CursorState> {
        self.cursor.as_ref()
    }

    /// Replace the cursor, notifying `cursor_changed` if it differs
    pub fn set_cursor(&mut self, cursor: Option<CursorState>) {
        let context = EmitContext {
            silent: false,
            source: None,
        };
        self.replace_cursor(cursor, &context);
    }

    pub fn new_block_id(&mut self) -> String {
        self.id_generator.new_id()
    }

    /// Materialize a detached subtree; insert it with a changeset
    pub fn create_node(&mut self, node: DocNode) -> NodeKey {
        self.document.create(node)
    }

    /// Detached, empty block with a generated id
    pub fn create_block(&mut self, name: impl Into<String>) -> NodeKey {
        let id = self.new_block_id();
        self.create_node(DocNode::block(name, id))
    }

    /// Detached `Text` block with a generated id
    pub fn create_text_block(&mut self, content: impl Into<Delta>) -> NodeKey {
        let id = self.new_block_id();
        self.create_node(DocNode::block(TEXT_BLOCK_NAME, id).with_text(content))
    }

    /// Free a detached subtree
    pub fn release(&mut self, key: NodeKey) -> DocumentResult<()> {
        self.document.release(key)
    }

    pub fn snapshot(&self, key: NodeKey) -> DocumentResult<DocNode> {
        self.document.snapshot(key)
    }

    /// Apply a changeset, then everything listeners queued in response
    ///
    /// Returns the first error: the changeset's own, otherwise the first
    /// deferred failure.
    #[instrument(
        level = "debug",
        skip_all,
        fields(actions = changeset.len(), silent = options.silent)
    )]
    pub fn apply(
        &mut self,
        changeset: Changeset,
        options: ApplyOptions,
    ) -> DocumentResult<ChangesetResult> {
        let result = self.apply_changeset(changeset, &options);

        let limit = self.config.max_deferred_changesets;
        let mut deferred = 0;
        let mut deferred_error = None;

        while let Some((next, next_options)) = self.deferred.pop() {
            if deferred >= limit {
                warn!(limit, pending = self.deferred.len() + 1, "Deferred changeset limit reached");
                self.deferred.clear();
                deferred_error.get_or_insert(DocumentError::DeferredLimitExceeded { limit });
                break;
            }

            deferred += 1;
            if let Err(e) = self.apply_changeset(next, &next_options) {
                warn!(error = %e, "Deferred changeset failed");
                deferred_error.get_or_insert(e);
            }
        }

        let applied = result?;
        if let Some(e) = deferred_error {
            return Err(e);
        }

        Ok(ChangesetResult {
            version: self.version,
            applied,
            deferred,
        })
    }

    fn apply_changeset(
        &mut self,
        changeset: Changeset,
        options: &ApplyOptions,
    ) -> DocumentResult<usize> {
        let ChangesetParts {
            actions,
            refresh_cursor,
            source,
            cursor: explicit_cursor,
        } = changeset.into_parts();

        let context = EmitContext {
            silent: options.silent,
            source: options.source.clone().or(source),
        };
        let refresh = options.refresh_cursor || refresh_cursor;

        debug!(
            version = self.version,
            actions = actions.len(),
            source = context.source.as_deref().unwrap_or("local"),
            silent = context.silent,
            "Applying changeset"
        );

        let mut tracked = self.cursor.clone();
        let mut applied = 0;
        let mut failure = None;

        for action in actions {
            trace!(action = action.name(), "Applying action");
            match self.apply_action(action, &context, &mut tracked) {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!(error = %e, applied, "Changeset aborted");
                    failure = Some(e);
                    break;
                }
            }
        }

        self.version += 1;

        match explicit_cursor {
            Some(cursor) if failure.is_none() => self.replace_cursor(cursor, &context),
            _ if refresh => self.replace_cursor(tracked, &context),
            _ => {}
        }

        if !context.silent {
            self.slots.changeset_applied.emit(&ChangesetApplied {
                version: self.version,
                applied,
                source: context.source.clone(),
            });
        }

        match failure {
            Some(e) => Err(e),
            None => {
                debug!(version = self.version, applied, "Changeset applied");
                Ok(applied)
            }
        }
    }

    fn apply_action(
        &mut self,
        action: Action,
        context: &EmitContext,
        cursor: &mut Option<CursorState>,
    ) -> DocumentResult<()> {
        match action {
            Action::UpdateAttributes { node, attributes } => {
                for (key, value) in attributes {
                    self.set_attribute(node, key, Some(value), context)?;
                }
                Ok(())
            }
            Action::SetAttribute { node, key, value } => {
                self.set_attribute(node, key, value, context)
            }
            Action::TextEdit { node, key, delta } => {
                self.text_edit(node, key, delta, context, cursor)
            }
            Action::InsertChildAt {
                parent,
                index,
                child,
            } => self.insert_child(parent, index, child, context, cursor),
            Action::RemoveChild { parent, child } => {
                self.remove_child(parent, child, context, cursor)
            }
        }
    }

    fn set_attribute(
        &mut self,
        node: NodeKey,
        key: String,
        value: Option<AttrValue>,
        context: &EmitContext,
    ) -> DocumentResult<()> {
        let old_value = self.document.set_attribute(node, &key, value.clone())?;

        if !context.silent {
            let location = self.document.location_of(node)?;
            self.slots.tree.emit(&TreeEvent::SetAttribute {
                node,
                key,
                value,
                old_value,
                location,
                source: context.source.clone(),
            });
        }
        Ok(())
    }

    fn text_edit(
        &mut self,
        node: NodeKey,
        key: String,
        delta: Delta,
        context: &EmitContext,
        cursor: &mut Option<CursorState>,
    ) -> DocumentResult<()> {
        let (before, after) = self.document.text_edit(node, &key, &delta)?;
        let location = self.document.location_of(node)?;

        if key == TEXT_CONTENT {
            *cursor = cursor
                .as_ref()
                .map(|current| current.after_text_edit(&location, &delta));
        }

        if !context.silent {
            let block_id = self
                .document
                .get(node)
                .and_then(|data| data.block_id())
                .map(str::to_string);
            self.slots.text_input.emit(&TextInput {
                node,
                block_id,
                attribute: key,
                location,
                change: delta,
                before,
                after,
                source: context.source.clone(),
            });
        }
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
        context: &EmitContext,
        cursor: &mut Option<CursorState>,
    ) -> DocumentResult<()> {
        let index = self.document.insert_child_at(parent, index, child)?;
        let location = self.document.location_of(parent)?.child(index);

        *cursor = cursor.as_ref().map(|current| current.after_insert(&location));

        if context.silent {
            return Ok(());
        }

        self.slots.tree.emit(&TreeEvent::InsertChild {
            parent,
            child,
            index,
            location,
            source: context.source.clone(),
        });

        for node in self.document.descendants(child) {
            let Some(data) = self.document.get(node) else {
                continue;
            };
            let Some(id) = data.block_id() else {
                continue;
            };
            let event = BlockInserted {
                key: node,
                id: id.to_string(),
                block_name: data.node_name().to_string(),
                location: self.document.location_of(node)?,
                source: context.source.clone(),
            };
            self.slots.block_inserted.emit(&event);
        }
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        context: &EmitContext,
        cursor: &mut Option<CursorState>,
    ) -> DocumentResult<()> {
        let parent_location = self.document.location_of(parent)?;
        let index = self.document.remove_child(parent, child)?;
        let location = parent_location.child(index);

        *cursor = cursor.as_ref().map(|current| current.after_removal(&location));

        if !context.silent {
            self.slots.tree.emit(&TreeEvent::RemoveChild {
                parent,
                child,
                index,
                location,
                source: context.source.clone(),
            });
        }
        Ok(())
    }

    fn replace_cursor(&mut self, cursor: Option<CursorState>, context: &EmitContext) {
        if self.cursor == cursor {
            return;
        }

        let previous = std::mem::replace(&mut self.cursor, cursor);
        if !context.silent {
            self.slots.cursor_changed.emit(&CursorChanged {
                previous,
                current: self.cursor.clone(),
                source: context.source.clone(),
            });
        }
    }
}
