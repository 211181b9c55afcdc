use std::fmt;

use thiserror::Error;

/// Speech-service credentials, passed into the pipeline at job start.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub app_key: String,
    pub access_key: String,
}

/// Opaque handle for a submitted transcription task.
///
/// Both ids are echoed back verbatim on every poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskHandle {
    pub request_id: String,
    pub log_id: String,
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.request_id, self.log_id)
    }
}

/// One poll's worth of server state: the status header plus whatever body
/// came with it.
#[derive(Clone, Debug)]
pub struct QueryReply {
    pub status_code: String,
    pub body: Option<String>,
}

#[derive(Error, Debug)]
pub enum AsrError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("submit rejected with status {code}: {body}")]
    SubmitRejected { code: String, body: String },
    #[error("response carried no status header")]
    MissingStatus,
}

/// Domain interface for an asynchronous speech-recognition task service.
pub trait AsrService: Send {
    /// Submit audio for recognition; a handle comes back on acceptance.
    fn submit(&self, audio: &[u8], credentials: &Credentials) -> Result<TaskHandle, AsrError>;

    /// Ask the service for the current state of a submitted task.
    fn query(&self, handle: &TaskHandle, credentials: &Credentials)
        -> Result<QueryReply, AsrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_joins_ids_with_pipe() {
        let handle = TaskHandle {
            request_id: "req-123".to_string(),
            log_id: "log-456".to_string(),
        };
        assert_eq!(handle.to_string(), "req-123|log-456");
    }
}
