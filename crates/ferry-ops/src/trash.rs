//! Recognition of trashed entries and restore bookkeeping.
//!
//! A trash root holds `files/` with the trashed entries and `info/` with one
//! `<name>.trashinfo` file per entry. Besides the configured roots, the
//! per-volume roots `.Trash-<uid>` and `.Trash/<uid>` are recognised by name.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferResult};
use tracing::{debug, warn};

use crate::context::JobContext;
use crate::oracle::CreateResponse;

/// A toplevel entry inside a trash root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashEntry {
    root: PathBuf,
    name: OsString,
}

impl TrashEntry {
    /// Locate `path` inside one of `trash_dirs` or a per-volume trash.
    pub fn locate(path: &Path, trash_dirs: &[PathBuf]) -> Option<Self> {
        let files = path.parent()?;
        if files.file_name()? != "files" {
            return None;
        }
        let root = files.parent()?;

        let known = trash_dirs.iter().any(|dir| dir == root) || is_volume_trash(root);
        known.then(|| Self {
            root: root.to_path_buf(),
            name: path.file_name().map(|n| n.to_os_string()).unwrap_or_default(),
        })
    }

    /// The trash root containing the entry.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry's `.trashinfo` file.
    pub fn info_path(&self) -> PathBuf {
        let mut name = self.name.clone();
        name.push(".trashinfo");
        self.root.join("info").join(name)
    }
}

fn is_volume_trash(root: &Path) -> bool {
    let Some(name) = root.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with(".Trash-") {
        return true;
    }
    root.parent()
        .and_then(Path::file_name)
        .is_some_and(|parent| parent == ".Trash")
}

/// Check if `path` is a toplevel trash entry.
pub fn is_trashed(path: &Path, trash_dirs: &[PathBuf]) -> bool {
    TrashEntry::locate(path, trash_dirs).is_some()
}

/// Make sure the folder a trashed entry is restored into exists.
pub(crate) fn prepare_untrash(
    ctx: &mut JobContext<'_>,
    display: &str,
    target: &Path,
) -> TransferResult<()> {
    ctx.info(&format!("Trying to restore \"{display}\""));

    let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    ctx.control.check()?;
    if parent.exists() {
        return Ok(());
    }

    let folder = parent
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| parent.display().to_string());

    let question = format!(
        "The folder \"{folder}\" does not exist anymore but is required to restore the file \"{display}\" from the trash"
    );
    if ctx.decisions.create(&question) == CreateResponse::Cancel {
        ctx.control.cancel();
        return Err(TransferError::Cancelled);
    }

    fs::create_dir_all(parent).map_err(|e| {
        if ctx.control.is_cancelled() {
            TransferError::Cancelled
        } else {
            debug!(folder = %parent.display(), error = %e, "Failed to recreate folder");
            TransferError::RestoreFailed { folder }
        }
    })
}

/// Drop the `.trashinfo` of a restored entry. Failures are only logged.
pub(crate) fn remove_trash_info(entry: &TrashEntry) {
    let info = entry.info_path();
    match fs::remove_file(&info) {
        Ok(()) => debug!(info = %info.display(), "Removed trash info"),
        Err(e) => warn!(info = %info.display(), error = %e, "Failed to remove trash info"),
    }
}
