//! Recursive copy of collected node trees.

use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferKind, TransferNode, TransferResult};
use tracing::{debug, warn};

use crate::conflict::{copy_file_resolving, DestinationOutcome};
use crate::context::JobContext;
use crate::names::fat_safe_name;
use crate::oracle::SkipResponse;

/// Where the nodes of one `copy_nodes` call go.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Destination<'p> {
    /// Exact target of a single toplevel node.
    File(&'p Path),
    /// Folder receiving every node under its own name.
    Parent(&'p Path),
}

impl Destination<'_> {
    fn target_for(&self, source: &Path, fat_safe: bool) -> TransferResult<PathBuf> {
        let target = match *self {
            Destination::File(target) => target.to_path_buf(),
            Destination::Parent(parent) => {
                let name = source.file_name().ok_or_else(|| TransferError::NotFound {
                    path: source.to_path_buf(),
                })?;
                parent.join(name)
            }
        };

        if !fat_safe {
            return Ok(target);
        }
        match target.file_name() {
            Some(name) => {
                let safe = fat_safe_name(&name.to_string_lossy());
                Ok(target.with_file_name(safe))
            }
            None => Ok(target),
        }
    }
}

/// Human-readable name of `path`; fails if the entry is gone.
pub(crate) fn display_name(path: &Path) -> TransferResult<String> {
    fs::symlink_metadata(path).map_err(|e| TransferError::io(path, e))?;
    Ok(path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string()))
}

/// Copy each node, then its children, removing sources for moves.
///
/// Per-node failures are turned into skip/retry questions. Only
/// cancellation and a full disk abort the remaining nodes.
pub(crate) fn copy_nodes(
    ctx: &mut JobContext<'_>,
    nodes: Vec<TransferNode>,
    destination: Destination<'_>,
    mut new_files: Option<&mut Vec<PathBuf>>,
) -> TransferResult<()> {
    for mut node in nodes {
        ctx.control.check()?;

        let name = display_name(&node.source)?;
        let target = destination.target_for(&node.source, ctx.config.fat_safe_names)?;
        ctx.info(&name);

        loop {
            ctx.control.check()?;

            let err = match copy_file_resolving(ctx, &mut node, &target) {
                Ok(DestinationOutcome::Copied(real_target)) => {
                    finish_node(ctx, &mut node, real_target, new_files.as_deref_mut())?;
                    break;
                }
                Ok(DestinationOutcome::Skipped) => {
                    debug!(source = %node.source.display(), "Skipped existing target");
                    break;
                }
                Ok(DestinationOutcome::Cancelled) => {
                    ctx.control.cancel();
                    return Err(TransferError::Cancelled);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => e,
            };

            warn!(source = %node.source.display(), error = %err, "Failed to copy");
            match ctx.decisions.skip(&err.to_string()) {
                SkipResponse::Retry => continue,
                SkipResponse::Skip | SkipResponse::SkipAll => break,
                SkipResponse::Cancel => {
                    ctx.control.cancel();
                    return Err(TransferError::Cancelled);
                }
            }
        }
    }

    Ok(())
}

fn finish_node(
    ctx: &mut JobContext<'_>,
    node: &mut TransferNode,
    real_target: PathBuf,
    new_files: Option<&mut Vec<PathBuf>>,
) -> TransferResult<()> {
    ctx.thumbnails.notify_copy(&node.source, &real_target);

    if node.has_children() {
        let children = node.take_children();
        copy_nodes(ctx, children, Destination::Parent(&real_target), None)?;
    }

    if let Some(files) = new_files {
        files.push(real_target);
    }

    if ctx.kind == TransferKind::Move {
        remove_source(ctx, &node.source)?;
    }

    Ok(())
}

fn remove_source(ctx: &mut JobContext<'_>, source: &Path) -> TransferResult<()> {
    loop {
        ctx.control.check()?;

        let is_dir = fs::symlink_metadata(source).is_ok_and(|m| m.is_dir());
        let result = if is_dir {
            fs::remove_dir(source)
        } else {
            fs::remove_file(source)
        };

        let err = match result {
            Ok(()) => {
                ctx.thumbnails.notify_delete(source);
                return Ok(());
            }
            Err(e) => TransferError::io(source, e),
        };

        warn!(source = %source.display(), error = %err, "Failed to remove source");
        match ctx.decisions.skip(&err.to_string()) {
            SkipResponse::Retry => {}
            SkipResponse::Skip | SkipResponse::SkipAll => return Ok(()),
            SkipResponse::Cancel => {
                ctx.control.cancel();
                return Err(TransferError::Cancelled);
            }
        }
    }
}
