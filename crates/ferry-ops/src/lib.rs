//! Recursive copy and move engine for ferry.
//!
//! A [`TransferJob`] pairs sources with exact targets. Moves are tried as
//! renames first; everything else is collected into node trees and copied
//! entry by entry, with conflicts and failures resolved through a
//! [`DecisionOracle`]. Jobs run synchronously via [`TransferJob::execute`]
//! or on the tokio blocking pool via [`start_transfer`].

mod collect;
mod conflict;
mod context;
mod control;
mod copy;
mod executor;
mod job;
mod names;
mod node_copy;
mod oracle;
mod progress;
mod space;
mod thumbnail;
mod trash;
mod undo;

pub use collect::Collector;
pub use conflict::DestinationOutcome;
pub use control::{JobControl, PauseFlag};
pub use copy::{native_copy, CopyFlags};
pub use executor::{
    start_transfer, ChannelOracle, ChannelSink, DecisionRequest, TransferEvent, TransferHandle,
};
pub use job::{TransferEnv, TransferJob, TransferOutcome, TransferPair};
pub use names::{duplicate_path, fat_safe_name, next_free_renamed_path, renamed_path};
pub use oracle::{
    ConflictPolicy, CreateResponse, DecisionOracle, ErrorPolicy, PolicyOracle, ReplaceResponse,
    SkipResponse, SpaceResponse,
};
pub use progress::{ProgressSink, TransferProgress};
pub use space::free_space;
pub use thumbnail::{NoopThumbnails, ThumbnailCache};
pub use trash::{is_trashed, TrashEntry};
pub use undo::{UndoEntry, UndoLog, UndoableOperation, DEFAULT_UNDO_DEPTH};

/// Default channel buffer size for transfer events.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
