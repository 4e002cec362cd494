//! # Node Locations
//!
//! A [`NodeLocation`] is the path of child indices from the document root to
//! a node. The root itself is the empty path.
//!
//! Locations are values: they are derived by walking the tree and become
//! meaningless as soon as an ancestor's child order changes. The
//! `shifted_by_*` helpers carry a location across a single structural edit.

use blocky_common::hash::{hash_ints, DEFAULT_SEED};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<usize>", into = "Vec<usize>")]
pub struct NodeLocation {
    path: Vec<usize>,
    hash: OnceLock<u32>,
}

/// How two locations relate in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRelation {
    Equal,
    /// `self` is a strict ancestor of the other location
    Contains,
    /// `self` is a strict descendant of the other location
    ContainedBy,
    /// Disjoint subtrees, `self` comes first in document order
    Before,
    /// Disjoint subtrees, `self` comes later in document order
    After,
}

impl NodeLocation {
    pub fn new(path: Vec<usize>) -> Self {
        Self {
            path,
            hash: OnceLock::new(),
        }
    }

    /// Location of the document root
    pub fn root() -> Self {
        Self::new(Vec::new())
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Index of the node within its parent
    pub fn last_index(&self) -> Option<usize> {
        self.path.last().copied()
    }

    pub fn parent(&self) -> Option<NodeLocation> {
        self.path.split_last().map(|(_, parent)| Self::new(parent.to_vec()))
    }

    pub fn child(&self, index: usize) -> NodeLocation {
        let mut path = self.path.clone();
        path.push(index);
        Self::new(path)
    }

    /// Cached hash of the index sequence
    pub fn hash_code(&self) -> u32 {
        *self.hash.get_or_init(|| {
            let words = self.path.iter().flat_map(|&i| index_words(i));
            hash_ints(words, DEFAULT_SEED)
        })
    }

    /// True if `self` is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &NodeLocation) -> bool {
        self.path.len() < other.path.len() && other.path.starts_with(&self.path)
    }

    pub fn relation(&self, other: &NodeLocation) -> LocationRelation {
        if self.path == other.path {
            LocationRelation::Equal
        } else if self.is_ancestor_of(other) {
            LocationRelation::Contains
        } else if other.is_ancestor_of(self) {
            LocationRelation::ContainedBy
        } else if self.path < other.path {
            LocationRelation::Before
        } else {
            LocationRelation::After
        }
    }

    /// Where the node at `self` ends up after a node is inserted at `inserted`
    pub fn shifted_by_insert(&self, inserted: &NodeLocation) -> NodeLocation {
        let Some((&index, parent)) = inserted.path.split_last() else {
            return self.clone();
        };

        let depth = parent.len();
        if self.path.len() > depth && self.path.starts_with(parent) && self.path[depth] >= index {
            let mut path = self.path.clone();
            path[depth] += 1;
            Self::new(path)
        } else {
            self.clone()
        }
    }

    /// Where the node at `self` ends up after the node at `removed` is taken
    /// out. `None` when `self` was inside the removed subtree.
    pub fn shifted_by_removal(&self, removed: &NodeLocation) -> Option<NodeLocation> {
        if self.path.starts_with(&removed.path) {
            return None;
        }

        let Some((&index, parent)) = removed.path.split_last() else {
            return None;
        };

        let depth = parent.len();
        if self.path.len() > depth && self.path.starts_with(parent) && self.path[depth] > index {
            let mut path = self.path.clone();
            path[depth] -= 1;
            Some(Self::new(path))
        } else {
            Some(self.clone())
        }
    }
}

impl PartialEq for NodeLocation {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for NodeLocation {}

impl Hash for NodeLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialOrd for NodeLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeLocation {
    /// Element-wise; a strict prefix sorts before its extensions
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Debug for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeLocation({:?})", self.path)
    }
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

impl From<Vec<usize>> for NodeLocation {
    fn from(path: Vec<usize>) -> Self {
        Self::new(path)
    }
}

impl From<NodeLocation> for Vec<usize> {
    fn from(location: NodeLocation) -> Self {
        location.path
    }
}

/// Hash input for one index: its low word, plus the high word when nonzero
fn index_words(index: usize) -> impl Iterator<Item = u32> {
    let index = index as u64;
    let high = (index >> 32) as u32;
    std::iter::once(index as u32).chain((high != 0).then_some(high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(path: &[usize]) -> NodeLocation {
        NodeLocation::new(path.to_vec())
    }

    #[test]
    fn test_root_hash_is_seed() {
        assert_eq!(NodeLocation::root().hash_code(), DEFAULT_SEED);
    }

    #[test]
    fn test_hash_is_cached_and_stable() {
        let a = loc(&[0, 3]);
        let first = a.hash_code();
        assert_eq!(a.hash_code(), first);
        assert_eq!(loc(&[0, 3]).hash_code(), first);
        assert_ne!(loc(&[3, 0]).hash_code(), first);
    }

    #[test]
    fn test_hash_matches_int_hash() {
        let expected = blocky_common::hash_int_array(&[0, 3, 1], DEFAULT_SEED);
        assert_eq!(loc(&[0, 3, 1]).hash_code(), expected);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_hash_keeps_high_index_bits() {
        let big = u32::MAX as usize + 1;
        assert_ne!(loc(&[big]).hash_code(), loc(&[0]).hash_code());
        assert_ne!(loc(&[big + 3]).hash_code(), loc(&[3]).hash_code());
    }

    #[test]
    fn test_ordering() {
        assert!(loc(&[0]) < loc(&[1]));
        assert!(loc(&[0, 5]) < loc(&[1]));
        assert!(loc(&[1]) < loc(&[1, 0]));
        assert!(NodeLocation::root() < loc(&[0]));
        assert_eq!(loc(&[2, 1]).cmp(&loc(&[2, 1])), Ordering::Equal);
    }

    #[test]
    fn test_relation() {
        assert_eq!(loc(&[1]).relation(&loc(&[1])), LocationRelation::Equal);
        assert_eq!(loc(&[1]).relation(&loc(&[1, 2])), LocationRelation::Contains);
        assert_eq!(loc(&[1, 2]).relation(&loc(&[1])), LocationRelation::ContainedBy);
        assert_eq!(loc(&[0, 9]).relation(&loc(&[1])), LocationRelation::Before);
        assert_eq!(loc(&[2]).relation(&loc(&[1, 4])), LocationRelation::After);
        assert_eq!(
            NodeLocation::root().relation(&loc(&[0])),
            LocationRelation::Contains
        );
    }

    #[test]
    fn test_parent_and_child() {
        let a = loc(&[3, 1]);
        assert_eq!(a.parent(), Some(loc(&[3])));
        assert_eq!(a.child(4), loc(&[3, 1, 4]));
        assert_eq!(a.last_index(), Some(1));
        assert_eq!(NodeLocation::root().parent(), None);
    }

    #[test]
    fn test_shift_by_insert() {
        let cursor = loc(&[2, 1]);

        // Sibling of an ancestor inserted before it
        assert_eq!(cursor.shifted_by_insert(&loc(&[0])), loc(&[3, 1]));
        assert_eq!(cursor.shifted_by_insert(&loc(&[2])), loc(&[3, 1]));
        // Inserted after it
        assert_eq!(cursor.shifted_by_insert(&loc(&[3])), cursor);
        // Inside the same parent
        assert_eq!(cursor.shifted_by_insert(&loc(&[2, 0])), loc(&[2, 2]));
        // Inside an unrelated subtree
        assert_eq!(cursor.shifted_by_insert(&loc(&[1, 0])), cursor);
    }

    #[test]
    fn test_shift_by_removal() {
        let cursor = loc(&[2, 1]);

        assert_eq!(cursor.shifted_by_removal(&loc(&[0])), Some(loc(&[1, 1])));
        assert_eq!(cursor.shifted_by_removal(&loc(&[3])), Some(cursor.clone()));
        assert_eq!(cursor.shifted_by_removal(&loc(&[2, 0])), Some(loc(&[2, 0])));
        assert_eq!(cursor.shifted_by_removal(&loc(&[2])), None);
        assert_eq!(cursor.shifted_by_removal(&loc(&[2, 1])), None);
    }

    #[test]
    fn test_serde_as_array() {
        let json = serde_json::to_string(&loc(&[0, 4])).unwrap();
        assert_eq!(json, "[0,4]");

        let back: NodeLocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc(&[0, 4]));
    }
}
