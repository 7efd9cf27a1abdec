//! Shallow copy of a single entry and the directory logic layered on it.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ferry_core::{TransferConfig, TransferError, TransferResult, VerifyMode};
use filetime::FileTime;
use tracing::{debug, trace};

use crate::context::JobContext;
use crate::control::JobControl;

/// Suffix of files being written when partial files are enabled.
const PARTIAL_SUFFIX: &str = ".partial~";

#[cfg(test)]
thread_local! {
    /// Error returned instead of the next chunk written on this thread.
    pub(crate) static WRITE_FAULT: std::cell::Cell<Option<std::io::ErrorKind>> =
        const { std::cell::Cell::new(None) };
}

/// Flags for a single copy attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyFlags {
    /// Replace an existing target.
    pub overwrite: bool,
}

impl CopyFlags {
    /// Flags that replace existing targets.
    pub fn overwrite() -> Self {
        Self { overwrite: true }
    }
}

/// Copy one entry without descending into directories.
///
/// Regular files are streamed, symlinks recreated, and directories are
/// refused with a signal the caller turns into directory creation:
///
/// | source    | target      | result                                     |
/// |-----------|-------------|--------------------------------------------|
/// | directory | missing     | `WouldRecurse`                             |
/// | directory | directory   | `Exists`, or `WouldMerge` with overwrite   |
/// | directory | other       | `Exists`, or `WouldRecurse` with overwrite |
///
/// `on_progress` receives the cumulative bytes of the file after each chunk.
pub fn native_copy(
    source: &Path,
    target: &Path,
    flags: CopyFlags,
    config: &TransferConfig,
    control: &JobControl,
    on_progress: &mut dyn FnMut(u64),
) -> TransferResult<()> {
    control.check()?;

    let metadata = fs::symlink_metadata(source).map_err(|e| TransferError::io(source, e))?;
    let target_meta = fs::symlink_metadata(target).ok();
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        return Err(match target_meta {
            None => TransferError::WouldRecurse {
                path: source.to_path_buf(),
            },
            Some(_) if !flags.overwrite => TransferError::Exists {
                path: target.to_path_buf(),
            },
            Some(meta) if meta.is_dir() => TransferError::WouldMerge {
                path: target.to_path_buf(),
            },
            Some(_) => TransferError::WouldRecurse {
                path: source.to_path_buf(),
            },
        });
    }

    if let Some(meta) = &target_meta {
        if !flags.overwrite {
            return Err(TransferError::Exists {
                path: target.to_path_buf(),
            });
        }
        if meta.is_dir() {
            return Err(TransferError::IsDirectory {
                path: target.to_path_buf(),
            });
        }
    }

    if file_type.is_symlink() {
        copy_symlink(source, target, target_meta.is_some())
    } else if file_type.is_file() && target_meta.is_some_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(target).map_err(|e| TransferError::io(target, e))?;
        copy_regular(source, target, &metadata, flags, config, control, on_progress)
    } else if file_type.is_file() {
        copy_regular(source, target, &metadata, flags, config, control, on_progress)
    } else {
        Err(TransferError::NotSupported {
            path: source.to_path_buf(),
        })
    }
}

fn copy_symlink(source: &Path, target: &Path, replace: bool) -> TransferResult<()> {
    let link = fs::read_link(source).map_err(|e| TransferError::io(source, e))?;

    if replace {
        fs::remove_file(target).map_err(|e| TransferError::io(target, e))?;
    }

    create_symlink(source, &link, target).map_err(|e| TransferError::io(target, e))
}

#[cfg(unix)]
fn create_symlink(_source: &Path, link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, link: &Path, target: &Path) -> std::io::Result<()> {
    if fs::metadata(source).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_source: &Path, _link: &Path, _target: &Path) -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

fn copy_regular(
    source: &Path,
    target: &Path,
    metadata: &Metadata,
    flags: CopyFlags,
    config: &TransferConfig,
    control: &JobControl,
    on_progress: &mut dyn FnMut(u64),
) -> TransferResult<()> {
    let mut input = File::open(source).map_err(|e| TransferError::io(source, e))?;

    let write_path = if config.use_partial {
        partial_path(target)
    } else {
        target.to_path_buf()
    };

    let mut options = OpenOptions::new();
    options.write(true);
    if flags.overwrite || config.use_partial {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let output = options
        .open(&write_path)
        .map_err(|e| TransferError::io(target, e))?;

    let result = stream_contents(&mut input, output, target, config, control, on_progress)
        .and_then(|()| finish_file(source, &write_path, target, metadata, config));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&write_path) {
            debug!(path = %write_path.display(), error = %e, "Failed to remove incomplete target");
        }
    }
    result
}

fn stream_contents(
    input: &mut File,
    mut output: File,
    target: &Path,
    config: &TransferConfig,
    control: &JobControl,
    on_progress: &mut dyn FnMut(u64),
) -> TransferResult<()> {
    let mut buffer = vec![0u8; config.buffer_size];
    let mut copied = 0u64;

    on_progress(0);
    loop {
        control.check()?;

        let read = input
            .read(&mut buffer)
            .map_err(|e| TransferError::io(target, e))?;
        if read == 0 {
            break;
        }

        #[cfg(test)]
        if let Some(kind) = WRITE_FAULT.with(|fault| fault.take()) {
            return Err(TransferError::io(target, kind.into()));
        }

        output
            .write_all(&buffer[..read])
            .map_err(|e| TransferError::io(target, e))?;

        copied += read as u64;
        on_progress(copied);
    }

    output.flush().map_err(|e| TransferError::io(target, e))
}

fn finish_file(
    source: &Path,
    written: &Path,
    target: &Path,
    metadata: &Metadata,
    config: &TransferConfig,
) -> TransferResult<()> {
    fs::set_permissions(written, metadata.permissions())
        .map_err(|e| TransferError::io(target, e))?;

    if config.preserve_timestamps {
        let atime = FileTime::from_last_access_time(metadata);
        let mtime = FileTime::from_last_modification_time(metadata);
        filetime::set_file_times(written, atime, mtime).map_err(|e| TransferError::io(target, e))?;
    }

    if config.verify == VerifyMode::Always {
        let expected = hash_file(source, config.buffer_size)?;
        let actual = hash_file(written, config.buffer_size)?;
        if expected != actual {
            return Err(TransferError::ChecksumMismatch {
                path: target.to_path_buf(),
            });
        }
        trace!(path = %target.display(), "Checksum verified");
    }

    if written != target {
        fs::rename(written, target).map_err(|e| TransferError::io(target, e))?;
    }

    Ok(())
}

fn hash_file(path: &Path, buffer_size: usize) -> TransferResult<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; buffer_size];
    let mut file = File::open(path).map_err(|e| TransferError::io(path, e))?;

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| TransferError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize())
}

/// Copy one entry, turning directory signals into merges and mkdirs.
///
/// A directory is never copied with its contents; it is created empty and
/// the caller copies the children one by one.
pub(crate) fn copy_one(
    ctx: &mut JobContext<'_>,
    source: &Path,
    target: &Path,
    flags: CopyFlags,
    merge_directories: bool,
) -> TransferResult<()> {
    let source_is_dir = fs::symlink_metadata(source).is_ok_and(|m| m.is_dir());
    let target_meta = fs::symlink_metadata(target).ok();
    let target_is_dir = target_meta.as_ref().is_some_and(|m| m.is_dir());

    // Never write through a symlink we're asked to replace
    if flags.overwrite && target_meta.is_some_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(target).map_err(|e| TransferError::io(target, e))?;
    }

    let (config, control) = (ctx.config, ctx.control);
    ctx.progress.reset_file();

    let result = native_copy(source, target, flags, config, control, &mut |bytes| {
        ctx.report_bytes(bytes)
    });
    if result.is_err() {
        // The copier removed whatever it wrote
        ctx.progress.discard_file();
    }

    match result {
        Err(TransferError::WouldMerge { .. }) if merge_directories => Ok(()),
        Err(TransferError::Exists { .. })
            if merge_directories && source_is_dir && target_is_dir =>
        {
            Ok(())
        }
        Err(TransferError::WouldRecurse { .. }) => {
            if fs::symlink_metadata(target).is_ok() {
                fs::remove_file(target).map_err(|e| TransferError::io(target, e))?;
            }
            fs::create_dir(target).map_err(|e| TransferError::io(target, e))
        }
        other => other,
    }
}
