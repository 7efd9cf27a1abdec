//! Decision points where a transfer needs a human (or policy) answer.
//!
//! The engine never presents dialogs itself. Whenever it hits a conflict,
//! an unrecoverable per-file error, a missing restore folder or a full
//! destination, it asks a [`DecisionOracle`] and blocks until it answers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Answer to "the target already exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ReplaceResponse {
    /// Try the same copy again.
    Retry,
    /// Overwrite the existing target.
    Yes,
    /// Overwrite this and every later conflict.
    YesAll,
    /// Skip this item.
    No,
    /// Skip this and every later conflict.
    NoAll,
    /// Copy next to the target under a free "name (N)" name.
    Rename,
    /// Abort the whole job.
    Cancel,
}

impl ReplaceResponse {
    /// Check if this response applies to all remaining conflicts.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::YesAll | Self::NoAll)
    }

    /// Convert a global response to its single-item equivalent.
    pub fn to_single(&self) -> Self {
        match self {
            Self::YesAll => Self::Yes,
            Self::NoAll => Self::No,
            _ => *self,
        }
    }
}

/// Answer to "this item failed, skip it?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SkipResponse {
    /// Try the failed step again.
    Retry,
    /// Skip the item (and its subtree).
    Skip,
    /// Skip this and every later failure.
    SkipAll,
    /// Abort the whole job.
    Cancel,
}

/// Answer to "a required folder is missing, create it?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum CreateResponse {
    /// Create the folder and continue.
    Yes,
    /// Abort the whole job.
    Cancel,
}

/// Answer to "the destination does not have enough free space".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SpaceResponse {
    /// Copy anyway.
    Continue,
    /// Stop before copying anything.
    Cancel,
}

/// Synchronous decision provider.
///
/// Every method blocks the worker until it returns. Implementations that
/// defer to a UI must not be called from the thread that services the UI.
pub trait DecisionOracle: Send + Sync {
    /// The copy of `source` to `target` found an existing target.
    fn ask_replace(&self, source: &Path, target: &Path) -> ReplaceResponse;

    /// An item failed with `message`.
    fn ask_skip(&self, message: &str) -> SkipResponse;

    /// A folder required for a trash restore is missing.
    fn ask_create(&self, message: &str) -> CreateResponse;

    /// The collected size exceeds the destination's free space.
    fn ask_no_space(&self, _message: &str) -> SpaceResponse {
        SpaceResponse::Cancel
    }
}

/// What a [`PolicyOracle`] does with conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave existing targets alone.
    #[default]
    Skip,
    /// Replace existing targets.
    Overwrite,
    /// Copy under a free "name (N)" name.
    Rename,
    /// Abort on the first conflict.
    Cancel,
}

/// What a [`PolicyOracle`] does with failed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the failed item and continue.
    #[default]
    Skip,
    /// Abort on the first failure.
    Cancel,
}

/// Non-interactive oracle answering from fixed policies.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyOracle {
    /// Conflict handling.
    pub conflicts: ConflictPolicy,
    /// Failure handling.
    pub errors: ErrorPolicy,
    /// Recreate missing restore folders.
    pub create_parents: bool,
    /// Copy even if the destination looks too small.
    pub ignore_space: bool,
}

impl PolicyOracle {
    /// Skip conflicts and failures.
    pub fn skip() -> Self {
        Self::default()
    }

    /// Overwrite conflicts, skip failures.
    pub fn overwrite() -> Self {
        Self {
            conflicts: ConflictPolicy::Overwrite,
            ..Self::default()
        }
    }

    /// Set the conflict policy.
    pub fn with_conflicts(mut self, conflicts: ConflictPolicy) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// Set the failure policy.
    pub fn with_errors(mut self, errors: ErrorPolicy) -> Self {
        self.errors = errors;
        self
    }

    /// Recreate missing restore folders.
    pub fn with_create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }

    /// Ignore the free-space pre-check.
    pub fn with_ignore_space(mut self, ignore_space: bool) -> Self {
        self.ignore_space = ignore_space;
        self
    }
}

impl DecisionOracle for PolicyOracle {
    fn ask_replace(&self, _source: &Path, _target: &Path) -> ReplaceResponse {
        match self.conflicts {
            ConflictPolicy::Skip => ReplaceResponse::No,
            ConflictPolicy::Overwrite => ReplaceResponse::Yes,
            ConflictPolicy::Rename => ReplaceResponse::Rename,
            ConflictPolicy::Cancel => ReplaceResponse::Cancel,
        }
    }

    fn ask_skip(&self, _message: &str) -> SkipResponse {
        match self.errors {
            ErrorPolicy::Skip => SkipResponse::Skip,
            ErrorPolicy::Cancel => SkipResponse::Cancel,
        }
    }

    fn ask_create(&self, _message: &str) -> CreateResponse {
        if self.create_parents {
            CreateResponse::Yes
        } else {
            CreateResponse::Cancel
        }
    }

    fn ask_no_space(&self, _message: &str) -> SpaceResponse {
        if self.ignore_space {
            SpaceResponse::Continue
        } else {
            SpaceResponse::Cancel
        }
    }
}

/// Per-job memo over an oracle that remembers "for all" answers.
pub(crate) struct Decisions<'a> {
    oracle: &'a dyn DecisionOracle,
    replace_all: Option<ReplaceResponse>,
    skip_all: bool,
}

impl<'a> Decisions<'a> {
    pub(crate) fn new(oracle: &'a dyn DecisionOracle) -> Self {
        Self {
            oracle,
            replace_all: None,
            skip_all: false,
        }
    }

    pub(crate) fn replace(&mut self, source: &Path, target: &Path) -> ReplaceResponse {
        if let Some(sticky) = self.replace_all {
            return sticky;
        }

        let response = self.oracle.ask_replace(source, target);
        if response.is_global() {
            self.replace_all = Some(response.to_single());
        }
        response.to_single()
    }

    pub(crate) fn skip(&mut self, message: &str) -> SkipResponse {
        if self.skip_all {
            return SkipResponse::Skip;
        }

        match self.oracle.ask_skip(message) {
            SkipResponse::SkipAll => {
                self.skip_all = true;
                SkipResponse::Skip
            }
            other => other,
        }
    }

    pub(crate) fn create(&self, message: &str) -> CreateResponse {
        self.oracle.ask_create(message)
    }

    pub(crate) fn no_space(&self, message: &str) -> SpaceResponse {
        self.oracle.ask_no_space(message)
    }
}
