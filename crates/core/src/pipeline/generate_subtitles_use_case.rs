use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::media::domain::audio_extractor::{AudioExtractor, ExtractError, ExtractMode};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::subtitle::domain::cue::to_srt;
use crate::subtitle::domain::synthesizer::{SubtitleSynthesizer, SynthesisError};
use crate::transcription::domain::asr_service::{AsrService, Credentials};
use crate::transcription::domain::orchestrator::{TranscriptionOrchestrator, TranscribeError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("audio extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("transcription failed: {0}")]
    Transcribe(#[from] TranscribeError),
    #[error("subtitle synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("subtitle i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("job cancelled")]
    Cancelled,
}

/// Runs the whole video → SRT conversion: extract audio, submit and await
/// recognition, synthesize cues, write the subtitle file.
///
/// Ownership transfers fully at each stage boundary: the audio file, then
/// the raw payload, then the cue sequence. Blocking; intended for one
/// worker thread per conversion job.
pub struct GenerateSubtitlesUseCase {
    extractor: Box<dyn AudioExtractor>,
    service: Box<dyn AsrService>,
    orchestrator: TranscriptionOrchestrator,
    logger: Box<dyn PipelineLogger>,
}

impl GenerateSubtitlesUseCase {
    pub fn new(
        extractor: Box<dyn AudioExtractor>,
        service: Box<dyn AsrService>,
        orchestrator: TranscriptionOrchestrator,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            extractor,
            service,
            orchestrator,
            logger,
        }
    }

    pub fn run(
        &mut self,
        video: &Path,
        output: &Path,
        mode: ExtractMode,
        credentials: &Credentials,
        cancelled: Arc<AtomicBool>,
    ) -> Result<PathBuf, PipelineError> {
        // 1. Isolate the audio track
        self.logger.stage("extract");
        let audio_path = output.with_extension(mode.extension());
        let started = Instant::now();
        let audio_file = self.extractor.extract(video, &audio_path, mode)?;
        self.logger
            .timing("extract", started.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .info(&format!("audio extracted to {}", audio_file.display()));

        if cancelled.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }

        // 2. Submit and await recognition
        self.logger.stage("transcribe");
        let audio_bytes = fs::read(&audio_file)?;
        let started = Instant::now();
        let payload = self
            .orchestrator
            .run(
                self.service.as_ref(),
                &audio_bytes,
                credentials,
                &cancelled,
                self.logger.as_mut(),
            )
            .map_err(|e| match e {
                TranscribeError::Cancelled => PipelineError::Cancelled,
                other => PipelineError::Transcribe(other),
            })?;
        self.logger
            .timing("transcribe", started.elapsed().as_secs_f64() * 1000.0);

        if cancelled.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }

        // 3. Synthesize and write the subtitle track
        self.logger.stage("synthesize");
        let cues = SubtitleSynthesizer::synthesize(&payload)?;
        fs::write(output, to_srt(&cues))?;
        self.logger
            .info(&format!("{} cues written to {}", cues.len(), output.display()));
        self.logger.summary();

        Ok(output.to_path_buf())
    }
}
