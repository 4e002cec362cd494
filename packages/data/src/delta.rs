//! # Rich-text Deltas
//!
//! A [`Delta`] is an ordered list of insert/retain/delete operations with
//! optional attribute maps. A delta made only of inserts describes a text
//! (a "document" delta); any other delta describes a change to one.
//!
//! Lengths are counted in UTF-16 code units. Embeds count as one unit.
//!
//! Deltas are kept in canonical form by [`Delta::push`]:
//! - zero-length operations are dropped
//! - adjacent operations of the same kind and attributes are merged
//! - an insert never follows a delete directly

use crate::errors::{DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Formatting attributes attached to a run of text
pub type Attributes = BTreeMap<String, Value>;

/// Stand-in character for embeds in plain text output
pub const EMBED_CHAR: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertValue {
    Text(String),
    Embed(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaOp {
    Insert {
        insert: InsertValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Retain {
        retain: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Delete {
        delete: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Insert,
    Retain,
    Delete,
}

impl DeltaOp {
    pub fn insert(text: impl Into<String>, attributes: Option<Attributes>) -> Self {
        DeltaOp::Insert {
            insert: InsertValue::Text(text.into()),
            attributes,
        }
    }

    pub fn retain(length: usize, attributes: Option<Attributes>) -> Self {
        DeltaOp::Retain {
            retain: length,
            attributes,
        }
    }

    pub fn delete(length: usize) -> Self {
        DeltaOp::Delete { delete: length }
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        match self {
            DeltaOp::Insert {
                insert: InsertValue::Text(text),
                ..
            } => utf16_len(text),
            DeltaOp::Insert {
                insert: InsertValue::Embed(_),
                ..
            } => 1,
            DeltaOp::Retain { retain, .. } => *retain,
            DeltaOp::Delete { delete } => *delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, DeltaOp::Insert { .. })
    }

    pub fn is_retain(&self) -> bool {
        matches!(self, DeltaOp::Retain { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, DeltaOp::Delete { .. })
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            DeltaOp::Insert { attributes, .. } | DeltaOp::Retain { attributes, .. } => {
                attributes.as_ref()
            }
            DeltaOp::Delete { .. } => None,
        }
    }

    fn kind(&self) -> OpKind {
        match self {
            DeltaOp::Insert { .. } => OpKind::Insert,
            DeltaOp::Retain { .. } => OpKind::Retain,
            DeltaOp::Delete { .. } => OpKind::Delete,
        }
    }

    fn with_attributes(self, new_attributes: Option<Attributes>) -> Self {
        match self {
            DeltaOp::Insert { insert, .. } => DeltaOp::Insert {
                insert,
                attributes: new_attributes,
            },
            DeltaOp::Retain { retain, .. } => DeltaOp::Retain {
                retain,
                attributes: new_attributes,
            },
            op @ DeltaOp::Delete { .. } => op,
        }
    }

    /// Drop empty attribute maps so that equality is structural
    fn normalized(self) -> Self {
        let attributes = self.attributes().filter(|a| !a.is_empty()).cloned();
        self.with_attributes(attributes)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<DeltaOp>", into = "Vec<DeltaOp>")]
pub struct Delta {
    ops: Vec<DeltaOp>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a delta from raw operations, normalizing them
    pub fn from_ops(ops: impl IntoIterator<Item = DeltaOp>) -> Self {
        let mut delta = Self::new();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DeltaOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn insert(mut self, text: impl Into<String>) -> Self {
        self.push(DeltaOp::insert(text, None));
        self
    }

    pub fn insert_with(mut self, text: impl Into<String>, attributes: Attributes) -> Self {
        self.push(DeltaOp::insert(text, Some(attributes)));
        self
    }

    pub fn insert_embed(
        mut self,
        embed: Map<String, Value>,
        attributes: Option<Attributes>,
    ) -> Self {
        self.push(DeltaOp::Insert {
            insert: InsertValue::Embed(embed),
            attributes,
        });
        self
    }

    pub fn retain(mut self, length: usize) -> Self {
        self.push(DeltaOp::retain(length, None));
        self
    }

    pub fn retain_with(mut self, length: usize, attributes: Attributes) -> Self {
        self.push(DeltaOp::retain(length, Some(attributes)));
        self
    }

    pub fn delete(mut self, length: usize) -> Self {
        self.push(DeltaOp::delete(length));
        self
    }

    /// Append an operation, keeping the delta canonical
    pub fn push(&mut self, op: DeltaOp) -> &mut Self {
        if op.is_empty() {
            return self;
        }
        let op = op.normalized();

        let mut index = self.ops.len();
        if let Some(DeltaOp::Delete { delete }) = self.ops.last_mut() {
            if let DeltaOp::Delete { delete: extra } = &op {
                *delete = delete.saturating_add(*extra);
                return self;
            }
            // Inserts are placed before a trailing delete
            if op.is_insert() {
                index -= 1;
                if index == 0 {
                    self.ops.insert(0, op);
                    return self;
                }
            }
        }

        if index > 0 {
            let prev = &mut self.ops[index - 1];
            if prev.attributes() == op.attributes() {
                match (prev, &op) {
                    (
                        DeltaOp::Insert {
                            insert: InsertValue::Text(text),
                            ..
                        },
                        DeltaOp::Insert {
                            insert: InsertValue::Text(extra),
                            ..
                        },
                    ) => {
                        text.push_str(extra);
                        return self;
                    }
                    (DeltaOp::Retain { retain, .. }, DeltaOp::Retain { retain: extra, .. }) => {
                        *retain = retain.saturating_add(*extra);
                        return self;
                    }
                    _ => {}
                }
            }
        }

        self.ops.insert(index, op);
        self
    }

    /// Remove a trailing plain retain, which has no effect
    pub fn chop(mut self) -> Self {
        if let Some(DeltaOp::Retain {
            attributes: None, ..
        }) = self.ops.last()
        {
            self.ops.pop();
        }
        self
    }

    /// Total length of all operations, saturating at `usize::MAX`
    pub fn length(&self) -> usize {
        self.ops
            .iter()
            .fold(0usize, |acc, op| acc.saturating_add(op.len()))
    }

    /// Length of text this delta consumes when applied (retains + deletes),
    /// saturating at `usize::MAX`
    pub fn base_length(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !op.is_insert())
            .fold(0usize, |acc, op| acc.saturating_add(op.len()))
    }

    /// Net change in text length when applied
    pub fn change_length(&self) -> isize {
        self.ops.iter().fold(0isize, |acc, op| {
            let len = isize::try_from(op.len()).unwrap_or(isize::MAX);
            match op {
                DeltaOp::Insert { .. } => acc.saturating_add(len),
                DeltaOp::Delete { .. } => acc.saturating_sub(len),
                DeltaOp::Retain { .. } => acc,
            }
        })
    }

    /// True if the delta is made only of inserts
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(DeltaOp::is_insert)
    }

    /// Concatenated text of all inserts
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            match op {
                DeltaOp::Insert {
                    insert: InsertValue::Text(text),
                    ..
                } => out.push_str(text),
                DeltaOp::Insert {
                    insert: InsertValue::Embed(_),
                    ..
                } => out.push(EMBED_CHAR),
                _ => {}
            }
        }
        out
    }

    /// Operations covering `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Delta {
        let mut ops = Vec::new();
        let mut iter = OpIter::new(&self.ops);
        let mut index = 0;

        while index < end && iter.has_next() {
            let op = if index < start {
                iter.next(start - index)
            } else {
                let op = iter.next(end - index);
                ops.push(op.clone());
                op
            };
            index += op.len();
        }

        Delta { ops }
    }

    /// Delta equivalent to applying `self` then `other`
    pub fn compose(&self, other: &Delta) -> Delta {
        let mut this_iter = OpIter::new(&self.ops);
        let mut other_iter = OpIter::new(&other.ops);
        let mut delta = Delta::new();

        while this_iter.has_next() || other_iter.has_next() {
            if other_iter.peek_kind() == OpKind::Insert {
                delta.push(other_iter.next(usize::MAX));
            } else if this_iter.peek_kind() == OpKind::Delete {
                delta.push(this_iter.next(usize::MAX));
            } else {
                let length = this_iter.peek_length().min(other_iter.peek_length());
                let this_op = this_iter.next(length);
                let other_op = other_iter.next(length);

                match other_op {
                    DeltaOp::Retain {
                        attributes: other_attributes,
                        ..
                    } => {
                        let keep_null = this_op.is_retain();
                        let attributes = compose_attributes(
                            this_op.attributes(),
                            other_attributes.as_ref(),
                            keep_null,
                        );
                        let op = match this_op {
                            DeltaOp::Retain { .. } => DeltaOp::retain(length, attributes),
                            other => other.with_attributes(attributes),
                        };
                        delta.push(op);
                    }
                    DeltaOp::Delete { .. } if this_op.is_retain() => {
                        delta.push(other_op);
                    }
                    // Insert followed by delete cancels out
                    _ => {}
                }
            }
        }

        delta.chop()
    }

    /// Apply a change delta to `self` as a document
    ///
    /// Fails with `DeltaOutOfRange` when the change consumes more text than
    /// `self` holds, and with `SurrogateSplit` when a retain or delete ends
    /// between the two halves of a surrogate pair. `self` is not modified
    /// either way.
    pub fn apply_change(&self, change: &Delta) -> DocumentResult<Delta> {
        let available = self.length();
        let required = change.base_length();
        if required > available {
            return Err(DocumentError::DeltaOutOfRange {
                required,
                available,
            });
        }

        let splits = self.surrogate_midpoints();
        if !splits.is_empty() {
            let mut offset = 0;
            for op in change.ops().iter().filter(|op| !op.is_insert()) {
                offset += op.len();
                if splits.binary_search(&offset).is_ok() {
                    return Err(DocumentError::SurrogateSplit { offset });
                }
            }
        }

        Ok(self.compose(change))
    }

    /// Offsets that fall between the halves of a surrogate pair, ascending
    fn surrogate_midpoints(&self) -> Vec<usize> {
        let mut midpoints = Vec::new();
        let mut pos = 0;
        for op in &self.ops {
            match op {
                DeltaOp::Insert {
                    insert: InsertValue::Text(text),
                    ..
                } => {
                    for ch in text.chars() {
                        if ch.len_utf16() == 2 {
                            midpoints.push(pos + 1);
                        }
                        pos += ch.len_utf16();
                    }
                }
                op => pos += op.len(),
            }
        }
        midpoints
    }

    /// Where `index` moves to once `self` is applied
    ///
    /// With `priority`, an insert exactly at `index` does not push it forward.
    pub fn transform_position(&self, index: usize, priority: bool) -> usize {
        let mut iter = OpIter::new(&self.ops);
        let mut index = index;
        let mut offset = 0;

        while iter.has_next() && offset <= index {
            let length = iter.peek_length();
            let kind = iter.peek_kind();
            iter.next(usize::MAX);

            match kind {
                OpKind::Delete => {
                    index -= length.min(index - offset);
                    continue;
                }
                OpKind::Insert if offset < index || !priority => {
                    index += length;
                }
                _ => {}
            }
            offset += length;
        }

        index
    }
}

impl From<Vec<DeltaOp>> for Delta {
    fn from(ops: Vec<DeltaOp>) -> Self {
        Delta::from_ops(ops)
    }
}

impl From<Delta> for Vec<DeltaOp> {
    fn from(delta: Delta) -> Self {
        delta.ops
    }
}

impl From<&str> for Delta {
    fn from(text: &str) -> Self {
        Delta::new().insert(text)
    }
}

fn compose_attributes(
    a: Option<&Attributes>,
    b: Option<&Attributes>,
    keep_null: bool,
) -> Option<Attributes> {
    let mut attributes = b.cloned().unwrap_or_default();
    if !keep_null {
        attributes.retain(|_, value| !value.is_null());
    }
    if let Some(a) = a {
        for (key, value) in a {
            if b.map_or(true, |b| !b.contains_key(key)) {
                attributes.insert(key.clone(), value.clone());
            }
        }
    }
    if attributes.is_empty() {
        None
    } else {
        Some(attributes)
    }
}

/// Cursor over a list of operations that can split them at any offset
#[derive(Debug, Clone)]
struct OpIter<'a> {
    ops: &'a [DeltaOp],
    index: usize,
    offset: usize,
}

impl<'a> OpIter<'a> {
    fn new(ops: &'a [DeltaOp]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    fn has_next(&self) -> bool {
        self.index < self.ops.len()
    }

    fn peek_length(&self) -> usize {
        match self.ops.get(self.index) {
            Some(op) => op.len() - self.offset,
            None => usize::MAX,
        }
    }

    /// Exhausted iterators behave as an endless retain
    fn peek_kind(&self) -> OpKind {
        self.ops
            .get(self.index)
            .map_or(OpKind::Retain, DeltaOp::kind)
    }

    fn next(&mut self, length: usize) -> DeltaOp {
        let ops = self.ops;
        let Some(op) = ops.get(self.index) else {
            return DeltaOp::retain(usize::MAX, None);
        };

        let offset = self.offset;
        let remaining = op.len() - offset;
        let length = if length >= remaining {
            self.index += 1;
            self.offset = 0;
            remaining
        } else {
            self.offset += length;
            length
        };

        match op {
            DeltaOp::Delete { .. } => DeltaOp::delete(length),
            DeltaOp::Retain { attributes, .. } => DeltaOp::retain(length, attributes.clone()),
            DeltaOp::Insert {
                insert: InsertValue::Text(text),
                attributes,
            } => DeltaOp::insert(
                utf16_substring(text, offset, offset + length),
                attributes.clone(),
            ),
            DeltaOp::Insert {
                insert: InsertValue::Embed(embed),
                attributes,
            } => DeltaOp::Insert {
                insert: InsertValue::Embed(embed.clone()),
                attributes: attributes.clone(),
            },
        }
    }
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Substring between two UTF-16 offsets
///
/// An offset that falls inside a surrogate pair keeps the whole character on
/// the left-hand side.
fn utf16_substring(text: &str, start: usize, end: usize) -> String {
    let mut out = String::new();
    let mut pos = 0;
    for ch in text.chars() {
        if pos >= end {
            break;
        }
        if pos >= start {
            out.push(ch);
        }
        pos += ch.len_utf16();
    }
    out
}
