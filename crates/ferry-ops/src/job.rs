//! The transfer job: pairs of sources and targets, moved or copied in order.

use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{
    is_root, TransferConfig, TransferError, TransferKind, TransferNode, TransferResult,
};
use humansize::{format_size, DECIMAL};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collect::Collector;
use crate::context::JobContext;
use crate::control::JobControl;
use crate::names::next_free_renamed_path;
use crate::node_copy::{copy_nodes, display_name, Destination};
use crate::oracle::{Decisions, DecisionOracle, ReplaceResponse, SpaceResponse};
use crate::progress::{ProgressSink, TransferProgress};
use crate::space::free_space;
use crate::thumbnail::{NoopThumbnails, ThumbnailCache};
use crate::trash::{prepare_untrash, remove_trash_info, TrashEntry};
use crate::undo::UndoableOperation;

/// One source with the exact path it should end up at.
#[derive(Debug, Clone)]
pub struct TransferPair {
    node: TransferNode,
    target: PathBuf,
    trash: Option<TrashEntry>,
}

impl TransferPair {
    fn new(source: PathBuf, target: PathBuf) -> Self {
        Self {
            node: TransferNode::new(source),
            target,
            trash: None,
        }
    }

    /// The source path.
    pub fn source(&self) -> &Path {
        self.node.source()
    }

    /// The target path.
    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// What a finished job did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferOutcome {
    /// Toplevel targets that were created, in pair order.
    pub new_files: Vec<PathBuf>,
    /// Size of everything collected for copying.
    pub bytes_total: u64,
    /// Bytes written to targets that were kept; failed attempts are not counted.
    pub bytes_transferred: u64,
    /// How to revert the job, if it changed anything.
    pub undo: Option<UndoableOperation>,
}

/// Collaborators of a running job.
pub struct TransferEnv<'a> {
    oracle: &'a dyn DecisionOracle,
    thumbnails: &'a dyn ThumbnailCache,
    sink: &'a dyn ProgressSink,
    control: JobControl,
}

impl<'a> TransferEnv<'a> {
    /// Environment answering questions with `oracle`, without thumbnails
    /// or progress output.
    pub fn new(oracle: &'a dyn DecisionOracle) -> Self {
        Self {
            oracle,
            thumbnails: &NoopThumbnails,
            sink: &(),
            control: JobControl::new(),
        }
    }

    /// Notify `thumbnails` about relocated files.
    pub fn thumbnails(mut self, thumbnails: &'a dyn ThumbnailCache) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    /// Report progress to `sink`.
    pub fn sink(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Use an existing cancellation and pause control.
    pub fn control(mut self, control: JobControl) -> Self {
        self.control = control;
        self
    }

    /// The job's control.
    pub fn job_control(&self) -> &JobControl {
        &self.control
    }
}

enum DirectMove {
    Moved(PathBuf),
    Skipped,
    Fallback,
}

/// A copy or move of several sources, each to an exact target.
#[derive(Debug, Clone)]
pub struct TransferJob {
    kind: TransferKind,
    pairs: Vec<TransferPair>,
    config: TransferConfig,
}

impl TransferJob {
    /// Pair `sources` with `targets` index by index.
    ///
    /// Pairs touching a filesystem root are dropped, as are moves of a path
    /// onto itself.
    pub fn new(
        sources: Vec<PathBuf>,
        targets: Vec<PathBuf>,
        kind: TransferKind,
    ) -> TransferResult<Self> {
        if sources.len() != targets.len() {
            return Err(TransferError::MismatchedPairs {
                sources: sources.len(),
                targets: targets.len(),
            });
        }

        let pairs = sources
            .into_iter()
            .zip(targets)
            .filter(|(source, target)| {
                if is_root(source) || is_root(target) {
                    debug!(source = %source.display(), target = %target.display(), "Dropping root pair");
                    false
                } else {
                    !(kind == TransferKind::Move && source == target)
                }
            })
            .map(|(source, target)| TransferPair::new(source, target))
            .collect();

        Ok(Self {
            kind,
            pairs,
            config: TransferConfig::default(),
        })
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Copy or move.
    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    /// The queued pairs.
    pub fn pairs(&self) -> &[TransferPair] {
        &self.pairs
    }

    /// The configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Number of queued pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if no pairs are queued.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Run the job to completion on the current thread.
    ///
    /// Moves are first tried as renames. Everything else is collected before
    /// the first byte is copied. Entries finished before a fatal error stay
    /// where they are.
    pub fn execute(self, env: &TransferEnv<'_>) -> TransferResult<TransferOutcome> {
        let TransferJob {
            kind,
            pairs,
            config,
        } = self;

        info!(%kind, pairs = pairs.len(), "Starting transfer");

        let mut ctx = JobContext {
            kind,
            config: &config,
            control: &env.control,
            decisions: Decisions::new(env.oracle),
            thumbnails: env.thumbnails,
            sink: env.sink,
            progress: TransferProgress::new(config.progress_step),
            overwritten: Vec::new(),
        };

        let mut new_files = Vec::new();
        let mut moves = Vec::new();
        let mut pending = Vec::new();

        for mut pair in pairs {
            ctx.control.check()?;

            let display = display_name(pair.source())?;
            if pair.source() != pair.target() && pair.target.starts_with(pair.source()) {
                return Err(TransferError::SourceIsAncestor {
                    path: pair.source().to_path_buf(),
                    target: pair.target.clone(),
                });
            }

            if kind == TransferKind::Move {
                pair.trash = TrashEntry::locate(pair.source(), &config.trash_dirs);
                if pair.trash.is_some() {
                    prepare_untrash(&mut ctx, &display, &pair.target)?;
                }

                if config.direct_move {
                    ctx.info(&format!("Trying to move \"{display}\""));

                    match direct_move(&mut ctx, &mut pair)? {
                        DirectMove::Moved(real_target) => {
                            debug!(source = %pair.source().display(), target = %real_target.display(), "Moved directly");
                            ctx.thumbnails.notify_move(pair.source(), &real_target);
                            if let Some(entry) = &pair.trash {
                                remove_trash_info(entry);
                            }
                            moves.push((pair.source().to_path_buf(), real_target.clone()));
                            new_files.push(real_target);
                            continue;
                        }
                        DirectMove::Skipped => continue,
                        DirectMove::Fallback => ctx.info(&format!(
                            "Could not move \"{display}\" directly. Collecting files for copying..."
                        )),
                    }
                } else {
                    ctx.info("Collecting files...");
                }
            } else {
                ctx.info("Collecting files...");
            }

            let mut collector = Collector::new(ctx.control);
            collector.collect(&mut pair.node)?;
            ctx.progress.add_total(collector.total_size());
            debug!(source = %pair.source().display(), size = collector.total_size(), "Collected");

            pending.push(pair);
        }

        if let Some(first) = pending.first() {
            if config.check_free_space && !has_room(&mut ctx, &first.target)? {
                info!("Not enough free space, nothing copied");
                return Ok(finish(&ctx, kind, new_files, moves));
            }
        }

        ctx.progress.start();
        for pair in pending {
            let TransferPair {
                node,
                target,
                trash,
            } = pair;
            let source = node.source.clone();
            let before = new_files.len();

            copy_nodes(
                &mut ctx,
                vec![node],
                Destination::File(&target),
                Some(&mut new_files),
            )?;

            if kind == TransferKind::Move {
                for real_target in &new_files[before..] {
                    moves.push((source.clone(), real_target.clone()));
                }
                if let Some(entry) = trash.filter(|_| fs::symlink_metadata(&source).is_err()) {
                    remove_trash_info(&entry);
                }
            }
        }

        let outcome = finish(&ctx, kind, new_files, moves);
        info!(
            new_files = outcome.new_files.len(),
            transferred = outcome.bytes_transferred,
            "Transfer finished"
        );
        Ok(outcome)
    }
}

fn finish(
    ctx: &JobContext<'_>,
    kind: TransferKind,
    new_files: Vec<PathBuf>,
    moves: Vec<(PathBuf, PathBuf)>,
) -> TransferOutcome {
    ctx.sink.new_files(&new_files);

    let undo = match kind {
        _ if new_files.is_empty() => None,
        TransferKind::Copy => Some(UndoableOperation::FilesCopied {
            created: new_files.clone(),
            overwritten: ctx.overwritten.clone(),
        }),
        TransferKind::Move => Some(UndoableOperation::FilesMoved { moves }),
    };

    TransferOutcome {
        new_files,
        bytes_total: ctx.progress.total_size(),
        bytes_transferred: ctx.progress.total_progress(),
        undo,
    }
}

/// Rename `source` to `target` without falling back to a copy.
fn rename_entry(source: &Path, target: &Path, overwrite: bool) -> TransferResult<()> {
    if !overwrite && fs::symlink_metadata(target).is_ok() {
        return Err(TransferError::Exists {
            path: target.to_path_buf(),
        });
    }
    fs::rename(source, target).map_err(|e| TransferError::io(target, e))
}

fn direct_move(ctx: &mut JobContext<'_>, pair: &mut TransferPair) -> TransferResult<DirectMove> {
    let source = pair.source().to_path_buf();
    let mut overwrite = pair.node.replace_confirmed;

    loop {
        ctx.control.check()?;

        let err = match rename_entry(&source, &pair.target, overwrite) {
            Ok(()) => return Ok(DirectMove::Moved(pair.target.clone())),
            Err(e) if e.is_exists() => e,
            Err(e) => {
                debug!(source = %source.display(), error = %e, "Direct move failed");
                return Ok(DirectMove::Fallback);
            }
        };

        debug!(error = %err, "Asking how to resolve conflict");
        match ctx.decisions.replace(&source, &pair.target) {
            ReplaceResponse::Retry => {}
            ReplaceResponse::Yes | ReplaceResponse::YesAll => {
                pair.node.confirm_replace();
                overwrite = true;
            }
            ReplaceResponse::Rename => {
                pair.node.rename_confirmed = true;
                pair.target = next_free_renamed_path(&pair.target);
            }
            ReplaceResponse::No | ReplaceResponse::NoAll => return Ok(DirectMove::Skipped),
            ReplaceResponse::Cancel => {
                ctx.control.cancel();
                return Err(TransferError::Cancelled);
            }
        }
    }
}

/// Compare the collected size with the free space at `target`.
///
/// Returns `false` if the user chose not to copy.
fn has_room(ctx: &mut JobContext<'_>, target: &Path) -> TransferResult<bool> {
    let parent = target.parent().unwrap_or(target);
    let Some(free) = free_space(parent) else {
        return Ok(true);
    };

    let needed = ctx.progress.total_size();
    if needed <= free {
        return Ok(true);
    }

    let name = parent
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| parent.display().to_string());
    let message = format!(
        "Error while copying to \"{name}\": {} more space is required to copy to the destination",
        format_size(needed - free, DECIMAL)
    );
    warn!(needed, free, "Destination is too small");

    ctx.control.check()?;
    Ok(ctx.decisions.no_space(&message) == SpaceResponse::Continue)
}
