//! Expansion of source paths into transfer node trees.

use std::fs;
use std::path::Path;

use ferry_core::{TransferError, TransferNode, TransferResult};
use tracing::trace;

use crate::control::JobControl;

/// Walks source trees before anything is written.
///
/// Symlinks are collected as themselves and never followed. The collector
/// performs no filesystem mutation.
pub struct Collector<'a> {
    control: &'a JobControl,
    total_size: u64,
    observer: Option<Box<dyn FnMut(&Path) + 'a>>,
}

impl<'a> Collector<'a> {
    /// Create a collector honoring the given control.
    pub fn new(control: &'a JobControl) -> Self {
        Self {
            control,
            total_size: 0,
            observer: None,
        }
    }

    /// Call `observer` for every path right after it was measured.
    pub fn with_observer(mut self, observer: impl FnMut(&Path) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Sum of the sizes of every collected entry.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Measure `node` and, for directories, build its subtree.
    ///
    /// Directories contribute their own metadata size; their contents are
    /// counted separately as child nodes.
    pub fn collect(&mut self, node: &mut TransferNode) -> TransferResult<()> {
        self.control.check()?;

        let metadata = fs::symlink_metadata(&node.source)
            .map_err(|e| TransferError::io(&node.source, e))?;
        self.total_size += metadata.len();

        if let Some(observer) = self.observer.as_mut() {
            observer(&node.source);
        }

        if !metadata.is_dir() {
            return Ok(());
        }

        self.control.check()?;

        let mut entries = fs::read_dir(&node.source)
            .map_err(|e| TransferError::io(&node.source, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransferError::io(&node.source, e))?;
        entries.sort();

        trace!(path = %node.source.display(), entries = entries.len(), "Collected directory");

        let mut children = Vec::with_capacity(entries.len());
        for path in entries {
            let mut child = TransferNode::child_of(node, path);
            self.collect(&mut child)?;
            children.push(child);
        }
        node.children = children;

        Ok(())
    }
}
