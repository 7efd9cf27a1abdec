//! State shared by the layers of a running job.

use std::path::PathBuf;

use ferry_core::{TransferConfig, TransferKind};

use crate::control::JobControl;
use crate::oracle::Decisions;
use crate::progress::{ProgressSink, TransferProgress};
use crate::thumbnail::ThumbnailCache;

pub(crate) struct JobContext<'a> {
    pub kind: TransferKind,
    pub config: &'a TransferConfig,
    pub control: &'a JobControl,
    pub decisions: Decisions<'a>,
    pub thumbnails: &'a dyn ThumbnailCache,
    pub sink: &'a dyn ProgressSink,
    pub progress: TransferProgress,
    /// Targets replaced during the job; a copy that replaced files can't be undone.
    pub overwritten: Vec<PathBuf>,
}

impl<'a> JobContext<'a> {
    /// Record cumulative bytes of the current file and notify the sink.
    pub fn report_bytes(&mut self, current: u64) {
        if let Some(percent) = self.progress.update(current) {
            self.sink.percent(percent);
        }
    }

    pub fn info(&self, message: &str) {
        self.sink.info(message);
    }
}
