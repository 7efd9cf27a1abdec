//! Notifications to a thumbnail cache about moved, copied and deleted files.

use std::path::Path;

/// Receiver of file relocation notices.
///
/// Calls are fire-and-forget and may come from several jobs at once.
pub trait ThumbnailCache: Send + Sync {
    /// `source` was copied to `target`.
    fn notify_copy(&self, source: &Path, target: &Path);

    /// `source` was moved to `target`.
    fn notify_move(&self, source: &Path, target: &Path);

    /// `source` was deleted.
    fn notify_delete(&self, source: &Path);
}

/// Thumbnail cache that ignores every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopThumbnails;

impl ThumbnailCache for NoopThumbnails {
    fn notify_copy(&self, _source: &Path, _target: &Path) {}

    fn notify_move(&self, _source: &Path, _target: &Path) {}

    fn notify_delete(&self, _source: &Path) {}
}
