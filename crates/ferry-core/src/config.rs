//! Transfer configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Default copy buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default minimum percentage advance between progress notifications.
pub const DEFAULT_PROGRESS_STEP: f64 = 0.01;

/// When to compare checksums of copied files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Trust the copy.
    #[default]
    Never,
    /// Hash source and target of every regular file after copying.
    Always,
}

/// Configuration for transfer jobs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct TransferConfig {
    /// Try a rename before falling back to copy + delete for moves.
    #[builder(default = "true")]
    pub direct_move: bool,

    /// Copy modification and access times onto the target.
    #[builder(default = "true")]
    pub preserve_timestamps: bool,

    /// Checksum verification of copied files.
    #[builder(default)]
    pub verify: VerifyMode,

    /// Write regular files to a temporary sibling and rename into place.
    #[builder(default = "false")]
    pub use_partial: bool,

    /// Sanitize target names for FAT-like filesystems.
    #[builder(default = "false")]
    pub fat_safe_names: bool,

    /// Compare the collected size with the destination's free space.
    #[builder(default = "true")]
    pub check_free_space: bool,

    /// Trash roots (directories containing `files/` and `info/`).
    #[builder(default = "default_trash_dirs()")]
    pub trash_dirs: Vec<PathBuf>,

    /// Minimum percentage advance before another progress notification.
    #[builder(default = "DEFAULT_PROGRESS_STEP")]
    pub progress_step: f64,

    /// Buffer size for streaming file contents.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    pub buffer_size: usize,
}

/// The user's home trash, if the platform has one.
pub fn default_trash_dirs() -> Vec<PathBuf> {
    dirs::data_dir()
        .map(|dir| vec![dir.join("Trash")])
        .unwrap_or_default()
}

/// Where the command-line front-end keeps its undo history.
pub fn default_undo_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("ferry").join("undo.json"))
}

fn check_values(buffer_size: Option<usize>, progress_step: Option<f64>) -> Result<(), String> {
    if buffer_size == Some(0) {
        return Err("Buffer size must be greater than zero".to_string());
    }
    if let Some(step) = progress_step {
        if step < 0.0 || step.is_nan() {
            return Err("Progress step must be a non-negative number".to_string());
        }
    }
    Ok(())
}

impl TransferConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        check_values(self.buffer_size, self.progress_step)
    }
}

impl TransferConfig {
    /// Create a new transfer config builder.
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder::default()
    }

    /// Check values the builder would reject, for configs read from files.
    pub fn validate(&self) -> Result<(), String> {
        check_values(Some(self.buffer_size), Some(self.progress_step))
    }

    /// Config that never renames, forcing copy + delete for moves.
    pub fn copy_only() -> Self {
        Self {
            direct_move: false,
            ..Self::default()
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            direct_move: true,
            preserve_timestamps: true,
            verify: VerifyMode::Never,
            use_partial: false,
            fat_safe_names: false,
            check_free_space: true,
            trash_dirs: default_trash_dirs(),
            progress_step: DEFAULT_PROGRESS_STEP,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
