//! Cancellation and pause control shared between a job and its caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ferry_core::{TransferError, TransferResult};
use tokio_util::sync::CancellationToken;

/// How long a paused worker sleeps before checking again.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared pause switch for a running job.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    /// Create a new, unpaused flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend the job at its next check point.
    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Let the job continue.
    pub fn resume(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Check if the job is paused.
    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation token plus pause flag, checked before every blocking call.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    cancel: CancellationToken,
    pause: PauseFlag,
}

impl JobControl {
    /// Create a control with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a control around an existing token and pause flag.
    pub fn with_parts(cancel: CancellationToken, pause: PauseFlag) -> Self {
        Self { cancel, pause }
    }

    /// The cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The pause flag.
    pub fn pause_flag(&self) -> &PauseFlag {
        &self.pause
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait out a pause, then fail with [`TransferError::Cancelled`] if the
    /// job was cancelled.
    pub fn check(&self) -> TransferResult<()> {
        while self.pause.is_paused() && !self.cancel.is_cancelled() {
            std::thread::sleep(PAUSE_POLL_INTERVAL);
        }

        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }
}
