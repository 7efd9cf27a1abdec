//! Core types for ferry.
//!
//! This crate provides the data structures shared by the transfer engine
//! and its front-ends: the transfer node tree, the error taxonomy and the
//! job configuration.

mod config;
mod error;
mod node;

pub use config::{
    default_trash_dirs, default_undo_file, TransferConfig, TransferConfigBuilder, VerifyMode,
    DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_STEP,
};
pub use error::{TransferError, TransferResult};
pub use node::{is_root, NodeIter, TransferKind, TransferNode};
