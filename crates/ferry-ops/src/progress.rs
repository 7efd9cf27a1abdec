//! Progress reporting for transfer jobs.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use humansize::{format_size, DECIMAL};

/// Minimum time between two transfer rate samples.
const RATE_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Transfer time before the status line shows rate and remaining time.
const MINIMUM_TRANSFER_TIME: Duration = Duration::from_secs(2);

/// Receiver of progress notifications.
///
/// Notifications are fire-and-forget. A sink that can't keep up may drop
/// them; the next one carries the latest value.
pub trait ProgressSink: Send + Sync {
    /// Overall completion in percent, 0 to 100.
    fn percent(&self, percent: f64);

    /// Human-readable description of the current phase.
    fn info(&self, message: &str);

    /// The job finished and created these toplevel targets.
    fn new_files(&self, _files: &[PathBuf]) {}
}

impl ProgressSink for () {
    fn percent(&self, _percent: f64) {}

    fn info(&self, _message: &str) {}
}

/// Byte counters and throttling state for one job.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    total_size: u64,
    total_progress: u64,
    file_progress: u64,
    last_percent: Option<f64>,
    step: f64,
    start_time: Option<Instant>,
    last_sample_time: Option<Instant>,
    last_sample_progress: u64,
    transfer_rate: u64,
}

impl TransferProgress {
    /// Create a tracker that emits after at least `step` percent of advance.
    pub fn new(step: f64) -> Self {
        Self {
            total_size: 0,
            total_progress: 0,
            file_progress: 0,
            last_percent: None,
            step,
            start_time: None,
            last_sample_time: None,
            last_sample_progress: 0,
            transfer_rate: 0,
        }
    }

    /// Account for a collected entry.
    pub fn add_total(&mut self, bytes: u64) {
        self.total_size += bytes;
    }

    /// Total bytes collected.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Bytes transferred so far.
    pub fn total_progress(&self) -> u64 {
        self.total_progress
    }

    /// Smoothed transfer rate in bytes per second.
    pub fn transfer_rate(&self) -> u64 {
        self.transfer_rate
    }

    /// Mark the beginning of the copy phase.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        self.start_time = Some(now);
        self.last_sample_time = Some(now);
        self.last_sample_progress = self.total_progress;
    }

    /// Reset the per-file counter before the next file starts.
    pub fn reset_file(&mut self) {
        self.file_progress = 0;
    }

    /// Forget the bytes of a file whose copy failed and was removed.
    ///
    /// A retry counts the file from zero again.
    pub fn discard_file(&mut self) {
        self.total_progress -= self.file_progress;
        self.last_sample_progress = self.last_sample_progress.min(self.total_progress);
        self.file_progress = 0;
    }

    /// Record cumulative bytes of the current file.
    ///
    /// Returns the percentage to emit, or `None` while the advance since the
    /// last emission is below the step.
    pub fn update(&mut self, current: u64) -> Option<f64> {
        self.update_at(current, Instant::now())
    }

    fn update_at(&mut self, current: u64, now: Instant) -> Option<f64> {
        if self.total_size == 0 {
            return None;
        }

        if current > self.file_progress {
            self.total_progress += current - self.file_progress;
            self.file_progress = current;
        }

        self.sample_rate(now);

        let percent = self.percentage();
        let emit = match self.last_percent {
            None => true,
            Some(last) => percent > last && percent - last >= self.step,
        };

        if emit {
            self.last_percent = Some(percent);
            Some(percent)
        } else {
            None
        }
    }

    fn sample_rate(&mut self, now: Instant) {
        let Some(last) = self.last_sample_time else {
            self.start_at(now);
            return;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed <= RATE_SAMPLE_INTERVAL {
            return;
        }

        let moved = self.total_progress.saturating_sub(self.last_sample_progress);
        let sample = (moved as f64 / elapsed.as_secs_f64()) as u64;

        // Average over roughly the last ten samples so the output is less jumpy
        self.transfer_rate = if self.transfer_rate > 0 {
            (self.transfer_rate * 10 + sample) / 11
        } else {
            sample
        };

        self.last_sample_time = Some(now);
        self.last_sample_progress = self.total_progress;
    }

    /// Completion in percent, clamped to 100.
    pub fn percentage(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        (self.total_progress as f64 * 100.0 / self.total_size as f64).min(100.0)
    }

    /// Status line like "22.6 MB of 134.1 MB (5.1 MB/s, 20 seconds remaining)".
    pub fn status(&self) -> String {
        let mut status = format!(
            "{} of {}",
            format_size(self.total_progress, DECIMAL),
            format_size(self.total_size, DECIMAL)
        );

        let running = match (self.start_time, self.last_sample_time) {
            (Some(start), Some(last)) => last.saturating_duration_since(start),
            _ => Duration::ZERO,
        };

        if self.transfer_rate > 0 && running > MINIMUM_TRANSFER_TIME {
            let remaining = self.total_size.saturating_sub(self.total_progress) / self.transfer_rate;
            if remaining > 0 {
                status.push_str(&format!(
                    " ({}/s, {} remaining)",
                    format_size(self.transfer_rate, DECIMAL),
                    format_remaining(remaining)
                ));
            }
        }

        status
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new(ferry_core::DEFAULT_PROGRESS_STEP)
    }
}

fn format_remaining(seconds: u64) -> String {
    let (count, unit) = if seconds > 60 * 60 {
        (seconds / (60 * 60), "hour")
    } else if seconds > 60 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };

    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}
