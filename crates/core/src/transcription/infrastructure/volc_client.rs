use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use crate::shared::constants::{ASR_RESOURCE_ID, STATUS_SUCCESS};
use crate::transcription::domain::asr_service::{
    AsrError, AsrService, Credentials, QueryReply, TaskHandle,
};

const SUBMIT_PATH: &str = "/api/v3/auc/bigmodel/submit";
const QUERY_PATH: &str = "/api/v3/auc/bigmodel/query";

const HEADER_APP_KEY: &str = "X-Api-App-Key";
const HEADER_ACCESS_KEY: &str = "X-Api-Access-Key";
const HEADER_RESOURCE_ID: &str = "X-Api-Resource-Id";
const HEADER_REQUEST_ID: &str = "X-Api-Request-Id";
const HEADER_SEQUENCE: &str = "X-Api-Sequence";
const HEADER_STATUS_CODE: &str = "X-Api-Status-Code";
const HEADER_LOG_ID: &str = "X-Tt-Logid";

/// The full payload goes up in one request, not a stream.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct SubmitRequest {
    user: User,
    audio: AudioPayload,
    request: RequestOptions,
}

#[derive(Serialize)]
struct User {
    uid: &'static str,
}

#[derive(Serialize)]
struct AudioPayload {
    data: String,
}

#[derive(Serialize)]
struct RequestOptions {
    model_name: &'static str,
    enable_channel_split: bool,
    enable_ddc: bool,
    enable_speaker_info: bool,
    enable_punc: bool,
    enable_itn: bool,
    corpus: Corpus,
}

#[derive(Serialize)]
struct Corpus {
    correct_table_name: &'static str,
    context: &'static str,
}

/// Blocking client for the bigmodel file-recognition task API.
pub struct VolcAsrClient {
    client: reqwest::blocking::Client,
    submit_url: String,
    query_url: String,
}

impl VolcAsrClient {
    pub fn new(base_url: &str) -> Result<Self, AsrError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            submit_url: format!("{base}{SUBMIT_PATH}"),
            query_url: format!("{base}{QUERY_PATH}"),
        })
    }

    fn submit_body(audio: &[u8]) -> SubmitRequest {
        SubmitRequest {
            user: User { uid: "subgen" },
            audio: AudioPayload {
                data: BASE64.encode(audio),
            },
            request: RequestOptions {
                model_name: "bigmodel",
                enable_channel_split: true,
                enable_ddc: true,
                enable_speaker_info: true,
                enable_punc: true,
                enable_itn: true,
                corpus: Corpus {
                    correct_table_name: "",
                    context: "",
                },
            },
        }
    }
}

impl AsrService for VolcAsrClient {
    fn submit(&self, audio: &[u8], credentials: &Credentials) -> Result<TaskHandle, AsrError> {
        let request_id = uuid::Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&self.submit_url)
            .header(HEADER_APP_KEY, &credentials.app_key)
            .header(HEADER_ACCESS_KEY, &credentials.access_key)
            .header(HEADER_RESOURCE_ID, ASR_RESOURCE_ID)
            .header(HEADER_REQUEST_ID, &request_id)
            .header(HEADER_SEQUENCE, "-1")
            .json(&Self::submit_body(audio))
            .send()?;

        let status = header_value(&response, HEADER_STATUS_CODE).ok_or(AsrError::MissingStatus)?;
        let log_id = header_value(&response, HEADER_LOG_ID).unwrap_or_default();
        log::debug!("submit returned status {status}, log id {log_id}");

        if status == STATUS_SUCCESS {
            Ok(TaskHandle { request_id, log_id })
        } else {
            let body = response.text().unwrap_or_default();
            Err(AsrError::SubmitRejected { code: status, body })
        }
    }

    fn query(
        &self,
        handle: &TaskHandle,
        credentials: &Credentials,
    ) -> Result<QueryReply, AsrError> {
        let response = self
            .client
            .post(&self.query_url)
            .header(HEADER_APP_KEY, &credentials.app_key)
            .header(HEADER_ACCESS_KEY, &credentials.access_key)
            .header(HEADER_RESOURCE_ID, ASR_RESOURCE_ID)
            .header(HEADER_REQUEST_ID, &handle.request_id)
            .header(HEADER_LOG_ID, &handle.log_id)
            .json(&serde_json::json!({}))
            .send()?;

        let status_code =
            header_value(&response, HEADER_STATUS_CODE).ok_or(AsrError::MissingStatus)?;
        let body = response.text().ok();

        Ok(QueryReply { status_code, body })
    }
}

fn header_value(response: &reqwest::blocking::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
