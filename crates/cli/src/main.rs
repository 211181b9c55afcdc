use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use subgen_core::media::domain::audio_extractor::ExtractMode;
use subgen_core::media::infrastructure::ffmpeg_extractor::FfmpegAudioExtractor;
use subgen_core::pipeline::generate_subtitles_use_case::{GenerateSubtitlesUseCase, PipelineError};
use subgen_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use subgen_core::shared::constants::{DEFAULT_API_BASE, MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use subgen_core::transcription::domain::asr_service::Credentials;
use subgen_core::transcription::domain::orchestrator::TranscriptionOrchestrator;
use subgen_core::transcription::infrastructure::volc_client::VolcAsrClient;

const APP_KEY_ENV: &str = "SUBGEN_APP_KEY";
const ACCESS_KEY_ENV: &str = "SUBGEN_ACCESS_KEY";

/// Generate SRT subtitles from a video's audio track via cloud speech
/// recognition.
#[derive(Parser)]
#[command(name = "subgen")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output subtitle file (defaults to the input with an .srt extension).
    output: Option<PathBuf>,

    /// Audio handed to the recognizer: wav (decode + mono downmix) or
    /// m4a (coded stream copy).
    #[arg(long, default_value = "wav")]
    audio_format: String,

    /// Speech service application key (falls back to SUBGEN_APP_KEY).
    #[arg(long)]
    app_key: Option<String>,

    /// Speech service access key (falls back to SUBGEN_ACCESS_KEY).
    #[arg(long)]
    access_key: Option<String>,

    /// Speech service base URL.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Seconds between result polls.
    #[arg(long, default_value_t = POLL_INTERVAL.as_secs())]
    poll_interval: u64,

    /// Result polls before giving up.
    #[arg(long, default_value_t = MAX_POLL_ATTEMPTS)]
    max_poll_attempts: u32,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mode = parse_mode(&cli.audio_format);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("srt"));
    let credentials = resolve_credentials(&cli)?;

    let client = VolcAsrClient::new(&cli.api_base)?;
    let orchestrator = TranscriptionOrchestrator::new(
        Duration::from_secs(cli.poll_interval),
        cli.max_poll_attempts,
    );
    let mut use_case = GenerateSubtitlesUseCase::new(
        Box::new(FfmpegAudioExtractor),
        Box::new(client),
        orchestrator,
        Box::new(StdoutPipelineLogger::default()),
    );

    // The whole conversion runs on one worker thread; the result comes
    // back over a channel so an embedding caller could stay responsive
    // and flip the cancellation flag.
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let input = cli.input.clone();
    let srt_path = output.clone();
    let (result_tx, result_rx) = crossbeam_channel::bounded::<Result<PathBuf, PipelineError>>(1);

    let worker = thread::spawn(move || {
        let result = use_case.run(&input, &srt_path, mode, &credentials, flag);
        let _ = result_tx.send(result);
    });

    let result = result_rx.recv();
    worker
        .join()
        .map_err(|_| "conversion worker panicked".to_string())?;
    let srt = result??;

    log::info!("Subtitles written to {}", srt.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.audio_format != "wav" && cli.audio_format != "m4a" {
        return Err(format!(
            "Audio format must be 'wav' or 'm4a', got '{}'",
            cli.audio_format
        )
        .into());
    }
    if cli.poll_interval == 0 {
        return Err("Poll interval must be at least 1 second".into());
    }
    if cli.max_poll_attempts == 0 {
        return Err("Max poll attempts must be at least 1".into());
    }
    Ok(())
}

fn parse_mode(audio_format: &str) -> ExtractMode {
    if audio_format == "m4a" {
        ExtractMode::Repackage
    } else {
        ExtractMode::TranscodeToMonoWav
    }
}

fn resolve_credentials(cli: &Cli) -> Result<Credentials, Box<dyn std::error::Error>> {
    let app_key = cli
        .app_key
        .clone()
        .or_else(|| std::env::var(APP_KEY_ENV).ok())
        .ok_or(format!("Missing app key: pass --app-key or set {APP_KEY_ENV}"))?;
    let access_key = cli
        .access_key
        .clone()
        .or_else(|| std::env::var(ACCESS_KEY_ENV).ok())
        .ok_or(format!(
            "Missing access key: pass --access-key or set {ACCESS_KEY_ENV}"
        ))?;
    Ok(Credentials {
        app_key,
        access_key,
    })
}
