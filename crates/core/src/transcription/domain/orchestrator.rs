use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{MAX_POLL_ATTEMPTS, POLL_INTERVAL, STATUS_PENDING, STATUS_SUCCESS};
use crate::transcription::domain::asr_service::{AsrError, AsrService, Credentials, TaskHandle};

/// Log a waiting message every this many pending polls.
const PROGRESS_EVERY: u32 = 5;

/// Where a task stands after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Succeeded,
    Pending,
    Failed,
}

/// Partition a status code into the three poll outcome classes.
pub fn classify(status_code: &str) -> TaskState {
    if status_code == STATUS_SUCCESS {
        TaskState::Succeeded
    } else if STATUS_PENDING.contains(&status_code) {
        TaskState::Pending
    } else {
        TaskState::Failed
    }
}

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("task submission failed: {0}")]
    Submit(#[from] AsrError),
    #[error("transcription failed with status {code}: {body}")]
    Failed { code: String, body: String },
    #[error("no terminal status after {0} polls")]
    TimedOut(u32),
    #[error("transcription cancelled")]
    Cancelled,
}

/// Drives a submitted task to a terminal state.
///
/// Submit → poll with a fixed interval until success, failure, the attempt
/// ceiling, or cancellation. A task is never polled again after a terminal
/// state. The loop blocks; run it on a worker thread.
pub struct TranscriptionOrchestrator {
    poll_interval: Duration,
    max_attempts: u32,
}

impl TranscriptionOrchestrator {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    pub fn run(
        &self,
        service: &dyn AsrService,
        audio: &[u8],
        credentials: &Credentials,
        cancelled: &AtomicBool,
        logger: &mut dyn PipelineLogger,
    ) -> Result<String, TranscribeError> {
        let handle = service.submit(audio, credentials)?;
        log::info!("transcription task {handle} submitted");
        self.await_result(service, &handle, credentials, cancelled, logger)
    }

    pub fn await_result(
        &self,
        service: &dyn AsrService,
        handle: &TaskHandle,
        credentials: &Credentials,
        cancelled: &AtomicBool,
        logger: &mut dyn PipelineLogger,
    ) -> Result<String, TranscribeError> {
        for attempt in 1..=self.max_attempts {
            if cancelled.load(Ordering::Relaxed) {
                return Err(TranscribeError::Cancelled);
            }
            std::thread::sleep(self.poll_interval);

            let reply = match service.query(handle, credentials) {
                Ok(reply) => reply,
                Err(e) => {
                    // transient miss: spends an attempt but never aborts
                    log::warn!("poll {attempt} for task {handle} failed: {e}");
                    continue;
                }
            };

            match classify(&reply.status_code) {
                TaskState::Succeeded => {
                    logger.info("transcription complete");
                    return Ok(reply.body.unwrap_or_default());
                }
                TaskState::Pending => {
                    logger.progress(attempt as usize, self.max_attempts as usize);
                    if attempt % PROGRESS_EVERY == 0 {
                        logger.info(&format!(
                            "transcription in progress, waited {}s",
                            attempt as u64 * self.poll_interval.as_secs()
                        ));
                    }
                }
                TaskState::Failed => {
                    return Err(TranscribeError::Failed {
                        code: reply.status_code,
                        body: reply.body.unwrap_or_default(),
                    });
                }
            }
        }

        Err(TranscribeError::TimedOut(self.max_attempts))
    }
}

impl Default for TranscriptionOrchestrator {
    fn default() -> Self {
        Self::new(POLL_INTERVAL, MAX_POLL_ATTEMPTS)
    }
}
