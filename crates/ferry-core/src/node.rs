//! Transfer node tree and transfer kinds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether a job copies or moves its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum TransferKind {
    /// Copy sources, leaving them in place.
    Copy,
    /// Move sources; falls back to copy + delete when a rename is impossible.
    Move,
}

/// One filesystem entry awaiting transfer.
///
/// Directories own their children once collected. A node whose `children`
/// is non-empty was a directory at collection time; the filesystem may have
/// changed since, which surfaces as I/O errors during the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferNode {
    /// Absolute path of the source entry.
    pub source: PathBuf,
    /// Child entries, in traversal order. Empty for leaves.
    pub children: Vec<TransferNode>,
    /// The user already agreed to overwrite this node's target.
    pub replace_confirmed: bool,
    /// The user chose to rename this node's target on conflict.
    pub rename_confirmed: bool,
}

impl TransferNode {
    /// Create a leaf node for a source path.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            children: Vec::new(),
            replace_confirmed: false,
            rename_confirmed: false,
        }
    }

    /// Create a child node that inherits the parent's overwrite confirmation.
    pub fn child_of(parent: &TransferNode, source: impl Into<PathBuf>) -> Self {
        Self {
            replace_confirmed: parent.replace_confirmed,
            ..Self::new(source)
        }
    }

    /// Mark this subtree as confirmed for overwriting.
    pub fn confirm_replace(&mut self) {
        self.replace_confirmed = true;
        for child in &mut self.children {
            child.confirm_replace();
        }
    }

    /// The source path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Check if this node has collected children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Take ownership of the children, leaving the node a leaf.
    pub fn take_children(&mut self) -> Vec<TransferNode> {
        std::mem::take(&mut self.children)
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TransferNode::node_count).sum::<usize>()
    }

    /// Depth-first iterator over this subtree, parents before children.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }
}

/// Pre-order iterator over a [`TransferNode`] subtree.
#[derive(Debug)]
pub struct NodeIter<'a> {
    stack: Vec<&'a TransferNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a TransferNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Check if a path is a filesystem root (`/`, `C:\`).
pub fn is_root(path: &Path) -> bool {
    path.has_root() && path.parent().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TransferNode {
        let mut root = TransferNode::new("/a");
        let mut sub = TransferNode::child_of(&root, "/a/sub");
        sub.children.push(TransferNode::child_of(&sub, "/a/sub/x"));
        root.children.push(sub);
        root.children.push(TransferNode::child_of(&root, "/a/y"));
        root
    }

    #[test]
    fn test_node_count_and_order() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 4);

        let order: Vec<_> = tree.iter().map(|n| n.source.clone()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/a/sub"),
                PathBuf::from("/a/sub/x"),
                PathBuf::from("/a/y"),
            ]
        );
    }

    #[test]
    fn test_child_inherits_confirmation() {
        let mut parent = TransferNode::new("/p");
        parent.replace_confirmed = true;
        parent.rename_confirmed = true;
        let child = TransferNode::child_of(&parent, "/p/c");
        assert!(child.replace_confirmed);
        assert!(!child.rename_confirmed);
    }

    #[test]
    fn test_confirm_replace_reaches_descendants() {
        let mut tree = sample_tree();
        tree.confirm_replace();
        assert!(tree.iter().all(|n| n.replace_confirmed));
    }

    #[test]
    fn test_take_children() {
        let mut tree = sample_tree();
        assert!(tree.has_children());
        let children = tree.take_children();
        assert_eq!(children.len(), 2);
        assert!(!tree.has_children());
    }

    #[test]
    fn test_is_root() {
        assert!(is_root(Path::new("/")));
        assert!(!is_root(Path::new("/home")));
        assert!(!is_root(Path::new("relative")));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransferKind::Copy.to_string(), "Copy");
        assert_eq!(TransferKind::Move.to_string(), "Move");
    }
}
