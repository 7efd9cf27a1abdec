//! Conflict resolution around the single-entry copier.

use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{TransferNode, TransferResult};
use tracing::debug;

use crate::context::JobContext;
use crate::copy::{copy_one, CopyFlags};
use crate::names::{duplicate_path, next_free_renamed_path};
use crate::oracle::ReplaceResponse;

/// Where a node's copy ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationOutcome {
    /// The node was copied to this path.
    Copied(PathBuf),
    /// Nothing was copied; the caller moves on.
    Skipped,
    /// The user cancelled the job.
    Cancelled,
}

/// Copy `node` to `target`, asking the oracle whenever the target exists.
///
/// Copying a node onto its own path creates the first free
/// `name (copy N)` sibling instead.
pub(crate) fn copy_file_resolving(
    ctx: &mut JobContext<'_>,
    node: &mut TransferNode,
    target: &Path,
) -> TransferResult<DestinationOutcome> {
    let source = node.source.clone();

    if source == target {
        return duplicate(ctx, &source);
    }

    let mut flags = CopyFlags {
        overwrite: node.replace_confirmed,
    };
    let mut real_target = target.to_path_buf();

    loop {
        let replacing =
            flags.overwrite && fs::symlink_metadata(&real_target).is_ok_and(|m| !m.is_dir());

        let err = match copy_one(ctx, &source, &real_target, flags, true) {
            Ok(()) => {
                if replacing {
                    ctx.overwritten.push(real_target.clone());
                }
                return Ok(DestinationOutcome::Copied(real_target));
            }
            Err(e) if e.is_exists() => e,
            Err(e) => return Err(e),
        };

        if node.rename_confirmed {
            real_target = next_free_renamed_path(target);
            continue;
        }

        debug!(error = %err, "Asking how to resolve conflict");
        match ctx.decisions.replace(&source, &real_target) {
            ReplaceResponse::Retry => {}
            ReplaceResponse::Yes | ReplaceResponse::YesAll => {
                node.confirm_replace();
                flags.overwrite = true;
            }
            ReplaceResponse::Rename => {
                node.rename_confirmed = true;
                real_target = next_free_renamed_path(target);
            }
            ReplaceResponse::No | ReplaceResponse::NoAll => {
                return Ok(DestinationOutcome::Skipped);
            }
            ReplaceResponse::Cancel => return Ok(DestinationOutcome::Cancelled),
        }
    }
}

fn duplicate(ctx: &mut JobContext<'_>, source: &Path) -> TransferResult<DestinationOutcome> {
    let mut n = 1;
    loop {
        let candidate = duplicate_path(source, n);
        match copy_one(ctx, source, &candidate, CopyFlags::default(), false) {
            Ok(()) => return Ok(DestinationOutcome::Copied(candidate)),
            Err(e) if e.is_exists() => n += 1,
            Err(e) => return Err(e),
        }
    }
}
