//! Undo history for completed transfers.
//!
//! Finished jobs are appended to an [`UndoLog`] kept as a JSON file, so a
//! later invocation can revert the most recent one.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ferry_core::{TransferError, TransferKind, TransferResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::job::TransferJob;

/// Number of transfers remembered by default.
pub const DEFAULT_UNDO_DEPTH: usize = 50;

/// A finished transfer, described well enough to revert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoableOperation {
    /// Files were copied.
    FilesCopied {
        /// Toplevel targets created by the copy.
        created: Vec<PathBuf>,
        /// Existing files that were replaced.
        overwritten: Vec<PathBuf>,
    },
    /// Files were moved.
    FilesMoved {
        /// `(original, new)` location pairs.
        moves: Vec<(PathBuf, PathBuf)>,
    },
}

impl UndoableOperation {
    /// Describe the operation itself.
    pub fn description(&self) -> String {
        match self {
            Self::FilesCopied { created, .. } => format!("Copied {} items", created.len()),
            Self::FilesMoved { moves } => format!("Moved {} items", moves.len()),
        }
    }

    /// What undoing the operation will do.
    pub fn undo_description(&self) -> String {
        match self {
            Self::FilesCopied { created, overwritten } if overwritten.is_empty() => {
                format!("Delete {} copied items", created.len())
            }
            Self::FilesCopied { .. } => "Cannot undo a copy that replaced existing files".into(),
            Self::FilesMoved { moves } => format!("Move {} items back", moves.len()),
        }
    }

    /// Replaced files are gone for good, so such copies can't be reverted.
    pub fn can_undo(&self) -> bool {
        match self {
            Self::FilesCopied { overwritten, .. } => overwritten.is_empty(),
            Self::FilesMoved { moves } => !moves.is_empty(),
        }
    }

    /// The transfer that moves everything back, for moves.
    pub fn reverse_job(&self) -> Option<TransferResult<TransferJob>> {
        match self {
            Self::FilesMoved { moves } => {
                let (originals, current): (Vec<_>, Vec<_>) = moves.iter().cloned().unzip();
                Some(TransferJob::new(current, originals, TransferKind::Move))
            }
            Self::FilesCopied { .. } => None,
        }
    }

    /// Delete the targets a copy created.
    ///
    /// Targets that are already gone are ignored. Returns how many were
    /// removed.
    pub fn remove_copies(&self) -> TransferResult<usize> {
        let created = match self {
            Self::FilesCopied { created, .. } if self.can_undo() => created,
            _ => return Ok(0),
        };

        let mut removed = 0;
        for path in created {
            let result = match fs::symlink_metadata(path) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
                Ok(_) => fs::remove_file(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Copy already removed");
                    continue;
                }
                Err(e) => Err(e),
            };
            result.map_err(|e| TransferError::io(path, e))?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// A remembered transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoEntry {
    /// Increasing ID, unique within one log.
    pub id: u64,
    /// When the transfer finished.
    pub timestamp: DateTime<Utc>,
    /// The transfer that was performed.
    pub operation: UndoableOperation,
}

/// Bounded, newest-last history of transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoLog {
    entries: VecDeque<UndoEntry>,
    #[serde(skip, default = "default_depth")]
    depth: usize,
}

fn default_depth() -> usize {
    DEFAULT_UNDO_DEPTH
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::with_depth(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoLog {
    /// Empty log remembering at most `depth` transfers.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            depth,
        }
    }

    /// Read the log at `path`. A missing file is an empty log.
    pub fn load(path: &Path) -> TransferResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(TransferError::io(path, e)),
        };
        serde_json::from_str(&text).map_err(|e| TransferError::io(path, e.into()))
    }

    /// Write the log to `path`, creating its folder.
    pub fn save(&self, path: &Path) -> TransferResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| TransferError::io(path, e.into()))?;
        fs::write(path, text).map_err(|e| TransferError::io(path, e))
    }

    /// Remember `operation`, dropping the oldest entries beyond the depth.
    pub fn push(&mut self, operation: UndoableOperation) -> u64 {
        let id = self.entries.back().map_or(0, |last| last.id + 1);
        if self.depth == 0 {
            warn!("Undo history is disabled");
            return id;
        }

        self.entries.push_back(UndoEntry {
            id,
            timestamp: Utc::now(),
            operation,
        });
        while self.entries.len() > self.depth {
            self.entries.pop_front();
        }
        id
    }

    /// Take the most recent entry.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &UndoEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
