use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::shared::constants::STATUS_SUCCESS;
use crate::subtitle::domain::cue::SubtitleCue;

pub const PLACEHOLDER_TEXT: &str = "unable to parse subtitle data";
const PLACEHOLDER_END_MS: u64 = 5000;

/// Sentence-terminal punctuation for the plain-text split.
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("result payload is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("service reported status {0}")]
    BadStatus(String),
    #[error("payload carries neither status nor result/audio_info")]
    UnrecognizedPayload,
}

/// A timed text span before cue indices are assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CueSpan {
    start_ms: u64,
    end_ms: u64,
    text: String,
}

/// Turns a raw recognition payload into ordered subtitle cues.
///
/// Result payloads come back in several shapes depending on the request
/// options and model version, so extraction runs through a prioritized
/// cascade; the first strategy producing spans wins. A structurally valid
/// payload always yields at least the placeholder cue.
pub struct SubtitleSynthesizer;

impl SubtitleSynthesizer {
    pub fn synthesize(payload: &str) -> Result<Vec<SubtitleCue>, SynthesisError> {
        let root: Value = serde_json::from_str(payload)?;
        validate(&root)?;
        Ok(number(extract_spans(&root)))
    }
}

fn validate(root: &Value) -> Result<(), SynthesisError> {
    let status = root.get("status").and_then(Value::as_str).unwrap_or("");
    if !status.is_empty() && status != STATUS_SUCCESS {
        return Err(SynthesisError::BadStatus(status.to_string()));
    }
    if status.is_empty() && root.get("result").is_none() && root.get("audio_info").is_none() {
        return Err(SynthesisError::UnrecognizedPayload);
    }
    Ok(())
}

/// Strategies in priority order; the first non-empty result wins.
fn extract_spans(root: &Value) -> Vec<CueSpan> {
    let strategies: [(&str, fn(&Value) -> Vec<CueSpan>); 4] = [
        ("sentence_list", sentence_list_spans),
        ("result_sentences", result_sentence_spans),
        ("plain_text", plain_text_spans),
        ("word_buckets", word_bucket_spans),
    ];

    for (name, strategy) in strategies {
        let spans = strategy(root);
        if !spans.is_empty() {
            log::debug!("extracted {} spans via {name}", spans.len());
            return spans;
        }
    }

    log::warn!("no strategy matched the result payload, emitting placeholder cue");
    vec![CueSpan {
        start_ms: 0,
        end_ms: PLACEHOLDER_END_MS,
        text: PLACEHOLDER_TEXT.to_string(),
    }]
}

/// `response.sentence_list[]` with millisecond `st`/`et` timing.
fn sentence_list_spans(root: &Value) -> Vec<CueSpan> {
    let Some(entries) = root
        .pointer("/response/sentence_list")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let text = entry.get("text").and_then(Value::as_str).unwrap_or("").trim();
            if text.is_empty() {
                return None;
            }
            Some(CueSpan {
                start_ms: u64_field(entry, "st"),
                end_ms: u64_field(entry, "et"),
                text: text.to_string(),
            })
        })
        .collect()
}

/// `result.sentences[]` with fractional-second `start_time`/`end_time`.
fn result_sentence_spans(root: &Value) -> Vec<CueSpan> {
    let Some(entries) = root.pointer("/result/sentences").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let text = entry.get("text").and_then(Value::as_str).unwrap_or("").trim();
            if text.is_empty() {
                return None;
            }
            Some(CueSpan {
                start_ms: ms_from_seconds(entry, "start_time"),
                end_ms: ms_from_seconds(entry, "end_time"),
                text: text.to_string(),
            })
        })
        .collect()
}

/// `result.text` with no per-sentence timing: split on sentence-terminal
/// punctuation and spread the known duration evenly across the fragments.
fn plain_text_spans(root: &Value) -> Vec<CueSpan> {
    let Some(text) = root.pointer("/result/text").and_then(Value::as_str) else {
        return Vec::new();
    };
    if text.trim().is_empty() {
        return Vec::new();
    }

    let duration = root
        .pointer("/audio_info/duration")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let fragments: Vec<&str> = text
        .split(|c| SENTENCE_TERMINATORS.contains(&c))
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if !fragments.is_empty() && duration > 0 {
        let slot = duration / fragments.len() as u64;
        fragments
            .iter()
            .enumerate()
            .map(|(i, fragment)| CueSpan {
                start_ms: i as u64 * slot,
                end_ms: (i as u64 + 1) * slot,
                text: fragment.to_string(),
            })
            .collect()
    } else {
        // no usable timing: one cue carrying the full text verbatim
        vec![CueSpan {
            start_ms: 0,
            end_ms: duration,
            text: text.to_string(),
        }]
    }
}

/// Top-level `words[]`: group words into one bucket per whole second of
/// their start time, space-joining texts; bucket end = max `et` seen.
fn word_bucket_spans(root: &Value) -> Vec<CueSpan> {
    let Some(words) = root.get("words").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut buckets: BTreeMap<u64, (u64, String)> = BTreeMap::new();
    for word in words {
        let text = word.get("text").and_then(Value::as_str).unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let end = u64_field(word, "et");
        let key = u64_field(word, "st") / 1000;
        buckets
            .entry(key)
            .and_modify(|(bucket_end, joined)| {
                *bucket_end = (*bucket_end).max(end);
                joined.push(' ');
                joined.push_str(text);
            })
            .or_insert_with(|| (end, text.to_string()));
    }

    buckets
        .into_iter()
        .map(|(key, (end_ms, text))| CueSpan {
            start_ms: key * 1000,
            end_ms,
            text,
        })
        .collect()
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn ms_from_seconds(value: &Value, key: &str) -> u64 {
    (value.get(key).and_then(Value::as_f64).unwrap_or(0.0) * 1000.0) as u64
}

/// Assign strictly increasing 1-based indices in span order.
fn number(spans: Vec<CueSpan>) -> Vec<SubtitleCue> {
    spans
        .into_iter()
        .enumerate()
        .map(|(i, span)| SubtitleCue {
            index: i + 1,
            start_ms: span.start_ms,
            end_ms: span.end_ms,
            text: span.text,
        })
        .collect()
}
