//! Running jobs on the blocking pool with events over channels.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ferry_core::{TransferError, TransferResult};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::control::JobControl;
use crate::job::{TransferEnv, TransferJob, TransferOutcome};
use crate::oracle::{CreateResponse, DecisionOracle, ReplaceResponse, SkipResponse, SpaceResponse};
use crate::progress::ProgressSink;
use crate::thumbnail::ThumbnailCache;
use crate::OPERATION_CHANNEL_SIZE;

/// A question from the worker, with the channel for its answer.
#[derive(Debug)]
pub enum DecisionRequest {
    /// The target exists.
    Replace {
        source: PathBuf,
        target: PathBuf,
        reply: oneshot::Sender<ReplaceResponse>,
    },
    /// An item failed.
    Skip {
        message: String,
        reply: oneshot::Sender<SkipResponse>,
    },
    /// A restore folder is missing.
    Create {
        message: String,
        reply: oneshot::Sender<CreateResponse>,
    },
    /// The destination looks too small.
    NoSpace {
        message: String,
        reply: oneshot::Sender<SpaceResponse>,
    },
}

/// Something a running job reports.
#[derive(Debug)]
pub enum TransferEvent {
    /// Overall completion in percent.
    Percent(f64),
    /// Human-readable phase description.
    Info(String),
    /// The worker is blocked until this is answered.
    Decision(DecisionRequest),
    /// Toplevel targets created by the finished job.
    NewFiles(Vec<PathBuf>),
}

/// Oracle forwarding every question over a channel.
///
/// Blocks the calling thread; never use it from async code. A closed
/// channel or a dropped reply is answered with `Cancel`.
#[derive(Debug, Clone)]
pub struct ChannelOracle {
    tx: mpsc::Sender<TransferEvent>,
}

impl ChannelOracle {
    /// Create an oracle sending requests to `tx`.
    pub fn new(tx: mpsc::Sender<TransferEvent>) -> Self {
        Self { tx }
    }

    fn ask<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> DecisionRequest, fallback: T) -> T {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .blocking_send(TransferEvent::Decision(request(reply)))
            .is_err()
        {
            return fallback;
        }
        rx.blocking_recv().unwrap_or(fallback)
    }
}

impl DecisionOracle for ChannelOracle {
    fn ask_replace(&self, source: &Path, target: &Path) -> ReplaceResponse {
        self.ask(
            |reply| DecisionRequest::Replace {
                source: source.to_path_buf(),
                target: target.to_path_buf(),
                reply,
            },
            ReplaceResponse::Cancel,
        )
    }

    fn ask_skip(&self, message: &str) -> SkipResponse {
        self.ask(
            |reply| DecisionRequest::Skip {
                message: message.to_string(),
                reply,
            },
            SkipResponse::Cancel,
        )
    }

    fn ask_create(&self, message: &str) -> CreateResponse {
        self.ask(
            |reply| DecisionRequest::Create {
                message: message.to_string(),
                reply,
            },
            CreateResponse::Cancel,
        )
    }

    fn ask_no_space(&self, message: &str) -> SpaceResponse {
        self.ask(
            |reply| DecisionRequest::NoSpace {
                message: message.to_string(),
                reply,
            },
            SpaceResponse::Cancel,
        )
    }
}

/// Progress sink emitting [`TransferEvent`]s.
///
/// Percent and info events are dropped while the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<TransferEvent>,
}

impl ChannelSink {
    /// Create a sink sending to `tx`.
    pub fn new(tx: mpsc::Sender<TransferEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn percent(&self, percent: f64) {
        let _ = self.tx.try_send(TransferEvent::Percent(percent));
    }

    fn info(&self, message: &str) {
        let _ = self.tx.try_send(TransferEvent::Info(message.to_string()));
    }

    fn new_files(&self, files: &[PathBuf]) {
        let _ = self.tx.blocking_send(TransferEvent::NewFiles(files.to_vec()));
    }
}

/// A job running on the blocking pool.
///
/// Drain [`TransferHandle::next_event`] until it returns `None`, then
/// [`join`](TransferHandle::join) for the result.
#[derive(Debug)]
pub struct TransferHandle {
    events: mpsc::Receiver<TransferEvent>,
    control: JobControl,
    task: JoinHandle<TransferResult<TransferOutcome>>,
}

impl TransferHandle {
    /// Wait for the next event. `None` once the job has finished.
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// The event receiver.
    pub fn events(&mut self) -> &mut mpsc::Receiver<TransferEvent> {
        &mut self.events
    }

    /// The job's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.control.token().clone()
    }

    /// The job's cancellation and pause control.
    pub fn control(&self) -> &JobControl {
        &self.control
    }

    /// Cancel the job at its next check point.
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Suspend the job at its next check point.
    pub fn pause(&self) {
        self.control.pause_flag().pause();
    }

    /// Continue a paused job.
    pub fn resume(&self) {
        self.control.pause_flag().resume();
    }

    /// Wait for the job's result.
    ///
    /// Remaining events are discarded, so pending questions are answered
    /// with `Cancel`.
    pub async fn join(self) -> TransferResult<TransferOutcome> {
        let Self { events, task, .. } = self;
        drop(events);

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(TransferError::Cancelled),
        }
    }
}

/// Start `job` on the blocking pool.
///
/// Without an `oracle`, every question is sent as a
/// [`TransferEvent::Decision`] and the worker waits for the reply.
pub fn start_transfer(
    job: TransferJob,
    oracle: Option<Arc<dyn DecisionOracle>>,
    thumbnails: Arc<dyn ThumbnailCache>,
) -> TransferHandle {
    let (tx, events) = mpsc::channel(OPERATION_CHANNEL_SIZE);
    let control = JobControl::new();
    let worker_control = control.clone();

    let task = tokio::task::spawn_blocking(move || {
        let sink = ChannelSink::new(tx.clone());
        let channel_oracle = ChannelOracle::new(tx);
        let oracle: &dyn DecisionOracle = match &oracle {
            Some(oracle) => oracle.as_ref(),
            None => &channel_oracle,
        };

        let env = TransferEnv::new(oracle)
            .thumbnails(thumbnails.as_ref())
            .sink(&sink)
            .control(worker_control);
        job.execute(&env)
    });

    TransferHandle {
        events,
        control,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_channel_answers_cancel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let oracle = ChannelOracle::new(tx);
        let answer = tokio::task::spawn_blocking(move || {
            oracle.ask_replace(Path::new("/a"), Path::new("/b"))
        })
        .await
        .unwrap();
        assert_eq!(answer, ReplaceResponse::Cancel);
    }

    #[tokio::test]
    async fn test_channel_oracle_round_trip() {
        let (tx, mut rx) = mpsc::channel(1);
        let oracle = ChannelOracle::new(tx);

        let worker = tokio::task::spawn_blocking(move || oracle.ask_skip("broken"));

        match rx.recv().await {
            Some(TransferEvent::Decision(DecisionRequest::Skip { message, reply })) => {
                assert_eq!(message, "broken");
                reply.send(SkipResponse::Retry).unwrap();
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(worker.await.unwrap(), SkipResponse::Retry);
    }

    #[tokio::test]
    async fn test_dropped_reply_answers_cancel() {
        let (tx, mut rx) = mpsc::channel(1);
        let oracle = ChannelOracle::new(tx);

        let worker = tokio::task::spawn_blocking(move || oracle.ask_create("missing"));
        drop(rx.recv().await);

        assert_eq!(worker.await.unwrap(), CreateResponse::Cancel);
    }
}
