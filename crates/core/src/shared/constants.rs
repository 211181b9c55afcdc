use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://openspeech-direct.zijieapi.com";

/// Recording-file recognition resource, echoed in every request header set.
pub const ASR_RESOURCE_ID: &str = "volc.seedasr.auc";

/// Terminal-success status code, shared by the submit/query headers and the
/// `status` field inside result payloads.
pub const STATUS_SUCCESS: &str = "20000000";

/// Still-processing status codes; any other non-success code is terminal.
pub const STATUS_PENDING: &[&str] = &["20000001", "20000002"];

/// Poll budget: 300 attempts at 2 s ≈ 10 minutes wall-clock.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_POLL_ATTEMPTS: u32 = 300;

pub const PCM_BIT_DEPTH: u16 = 16;
