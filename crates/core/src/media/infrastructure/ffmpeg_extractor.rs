use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

use crate::audio::domain::downmixer::downmix_to_mono;
use crate::audio::domain::wav::WavSink;
use crate::media::domain::audio_extractor::{
    select_audio_track, AudioExtractor, ExtractError, ExtractMode, TrackDescriptor,
};
use crate::shared::constants::PCM_BIT_DEPTH;

/// Decoded PCM chunks handed from the decode thread to the writer loop.
const CHUNK_CHANNEL_CAPACITY: usize = 8;

const BYTES_PER_SAMPLE: usize = 2;

/// Extracts a video's audio track using ffmpeg-next.
///
/// Repackage mode stream-copies coded samples into an MP4 container;
/// transcode mode decodes to PCM on a dedicated thread and writes a mono
/// 16-bit WAV. Both modes build the output at a `.part` path and rename it
/// into place on success, so a failed call leaves no partial file behind.
pub struct FfmpegAudioExtractor;

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract(
        &self,
        video: &Path,
        output: &Path,
        mode: ExtractMode,
    ) -> Result<PathBuf, ExtractError> {
        ffmpeg_next::init()?;

        let part = output.with_extension("part");
        let result = match mode {
            ExtractMode::Repackage => repackage_into(video, &part),
            ExtractMode::TranscodeToMonoWav => transcode_into(video, &part),
        };

        match result {
            Ok(()) => {
                std::fs::rename(&part, output)?;
                Ok(output.to_path_buf())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&part);
                Err(e)
            }
        }
    }
}

/// Probe the container's elementary streams without decoding any media.
pub fn probe_tracks(path: &Path) -> Result<Vec<TrackDescriptor>, ExtractError> {
    ffmpeg_next::init()?;
    let ictx = ffmpeg_next::format::input(path)?;
    Ok(describe_streams(&ictx))
}

fn describe_streams(ictx: &ffmpeg_next::format::context::Input) -> Vec<TrackDescriptor> {
    ictx.streams()
        .map(|stream| {
            let params = stream.parameters();
            let kind = kind_of(&params);
            let (sample_rate, channels) = if kind.starts_with("audio/") {
                audio_params(params).unwrap_or((0, 0))
            } else {
                (0, 0)
            };
            TrackDescriptor {
                index: stream.index(),
                kind,
                sample_rate,
                channels,
            }
        })
        .collect()
}

/// Mime-like "medium/codec" string, e.g. "audio/aac".
fn kind_of(params: &ffmpeg_next::codec::Parameters) -> String {
    let medium = match params.medium() {
        ffmpeg_next::media::Type::Audio => "audio",
        ffmpeg_next::media::Type::Video => "video",
        ffmpeg_next::media::Type::Subtitle => "subtitle",
        _ => "other",
    };
    let codec = format!("{:?}", params.id()).to_lowercase();
    format!("{medium}/{codec}")
}

fn audio_params(params: ffmpeg_next::codec::Parameters) -> Result<(u32, u16), ffmpeg_next::Error> {
    let ctx = ffmpeg_next::codec::context::Context::from_parameters(params)?;
    let decoder = ctx.decoder().audio()?;
    Ok((decoder.rate(), decoder.channels() as u16))
}

/// Stream-copy the first audio track into an MP4 container at `part`.
fn repackage_into(video: &Path, part: &Path) -> Result<(), ExtractError> {
    let mut ictx = ffmpeg_next::format::input(video)?;

    let selected = {
        let tracks = describe_streams(&ictx);
        select_audio_track(&tracks)
            .ok_or(ExtractError::NoAudioTrack)?
            .index
    };
    let (in_tb, params) = {
        let stream = ictx
            .stream(selected)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;
        (stream.time_base(), stream.parameters())
    };

    let mut octx = ffmpeg_next::format::output_as(part, "mp4")?;
    let ost_index = {
        let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
        ost.set_parameters(params);
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        ost.index()
    };
    octx.write_header()?;
    let ost_tb = octx
        .stream(ost_index)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?
        .time_base();

    // start from the sync point nearest time 0
    ictx.seek(0, ..)?;

    let mut copied = 0usize;
    for (stream, mut packet) in ictx.packets() {
        if stream.index() != selected {
            continue;
        }
        packet.rescale_ts(in_tb, ost_tb);
        packet.set_position(-1);
        packet.set_stream(ost_index);
        // packet flags, including the key-frame bit, ride along with the copy
        packet.write_interleaved(&mut octx)?;
        copied += 1;
    }

    octx.write_trailer()?;
    log::debug!("repackaged {copied} coded samples");
    Ok(())
}

/// Decode the first audio track, downmix to mono, and write a WAV at `part`.
///
/// Demux + decode run on their own thread and hand PCM chunks over a bounded
/// channel; this thread downmixes and appends through the WAV sink.
fn transcode_into(video: &Path, part: &Path) -> Result<(), ExtractError> {
    let tracks = probe_tracks(video)?;
    let track = select_audio_track(&tracks)
        .ok_or(ExtractError::NoAudioTrack)?
        .clone();

    let file = std::fs::File::create(part)?;
    let mut sink = WavSink::new(file, track.sample_rate, 1, PCM_BIT_DEPTH)?;

    let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_CHANNEL_CAPACITY);
    let worker = spawn_decoder(video.to_path_buf(), track.index, chunk_tx);

    let mut failure: Option<ExtractError> = None;
    for chunk in chunk_rx {
        match chunk {
            Ok(pcm) => {
                let write = downmix_to_mono(&pcm, track.channels, PCM_BIT_DEPTH)
                    .map_err(ExtractError::from)
                    .and_then(|mono| sink.write_samples(&mono).map_err(ExtractError::from));
                if let Err(e) = write {
                    failure = Some(e);
                    break; // dropping the receiver stops the worker at its next send
                }
            }
            Err(message) => {
                failure = Some(ExtractError::Worker(message));
                break;
            }
        }
    }

    if worker.join().is_err() && failure.is_none() {
        failure = Some(ExtractError::Worker("decode thread panicked".to_string()));
    }
    if let Some(e) = failure {
        return Err(e);
    }

    log::debug!("decoded {} pcm bytes", sink.data_len());
    sink.finalize()?;
    Ok(())
}

fn spawn_decoder(
    video: PathBuf,
    stream_index: usize,
    tx: Sender<Result<Vec<u8>, String>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = decode_pcm_chunks(&video, stream_index, &tx) {
            let _ = tx.send(Err(e.to_string()));
        }
    })
}

fn decode_pcm_chunks(
    video: &Path,
    stream_index: usize,
    tx: &Sender<Result<Vec<u8>, String>>,
) -> Result<(), ffmpeg_next::Error> {
    let mut ictx = ffmpeg_next::format::input(video)?;
    let params = ictx
        .stream(stream_index)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?
        .parameters();
    let ctx = ffmpeg_next::codec::context::Context::from_parameters(params)?;
    let mut decoder = ctx.decoder().audio()?;

    // Fix the sample format to packed s16; rate and layout stay at the
    // source values so the downmixer sees the original channels.
    let mut resampler = ffmpeg_next::software::resampling::Context::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
        decoder.channel_layout(),
        decoder.rate(),
    )?;

    let mut decoded = ffmpeg_next::util::frame::audio::Audio::empty();
    let mut resampled = ffmpeg_next::util::frame::audio::Audio::empty();

    ictx.seek(0, ..)?;
    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if !drain_decoder(&mut decoder, &mut resampler, &mut decoded, &mut resampled, tx)? {
            return Ok(());
        }
    }

    // end of stream is signaled exactly once, then the decoder drains dry
    decoder.send_eof()?;
    if !drain_decoder(&mut decoder, &mut resampler, &mut decoded, &mut resampled, tx)? {
        return Ok(());
    }

    // the resampler may hold a few buffered samples
    if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
        if delay.output > 0 {
            send_pcm(&resampled, tx);
        }
    }

    Ok(())
}

fn drain_decoder(
    decoder: &mut ffmpeg_next::codec::decoder::Audio,
    resampler: &mut ffmpeg_next::software::resampling::Context,
    decoded: &mut ffmpeg_next::util::frame::audio::Audio,
    resampled: &mut ffmpeg_next::util::frame::audio::Audio,
    tx: &Sender<Result<Vec<u8>, String>>,
) -> Result<bool, ffmpeg_next::Error> {
    while decoder.receive_frame(decoded).is_ok() {
        resampler.run(decoded, resampled)?;
        if !send_pcm(resampled, tx) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Returns false once the receiving side has hung up.
fn send_pcm(frame: &ffmpeg_next::util::frame::audio::Audio, tx: &Sender<Result<Vec<u8>, String>>) -> bool {
    let bytes = frame.samples() * frame.channels() as usize * BYTES_PER_SAMPLE;
    if bytes == 0 {
        return true;
    }
    tx.send(Ok(frame.data(0)[..bytes].to_vec())).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn missing_video() -> &'static Path {
        if cfg!(windows) {
            Path::new("Z:\\nonexistent\\file.mp4")
        } else {
            Path::new("/nonexistent/file.mp4")
        }
    }

    #[test]
    fn test_probe_nonexistent_file() {
        assert!(probe_tracks(missing_video()).is_err());
    }

    #[test]
    fn test_extract_nonexistent_file_repackage() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.m4a");
        let result =
            FfmpegAudioExtractor.extract(missing_video(), &out, ExtractMode::Repackage);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_nonexistent_file_transcode() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.wav");
        let result =
            FfmpegAudioExtractor.extract(missing_video(), &out, ExtractMode::TranscodeToMonoWav);
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_extract_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.wav");
        let _ = FfmpegAudioExtractor.extract(missing_video(), &out, ExtractMode::TranscodeToMonoWav);
        assert!(!out.exists());
        assert!(!out.with_extension("part").exists());
    }

    #[test]
    fn test_not_a_media_file_fails() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("not_media.mp4");
        std::fs::write(&bogus, b"this is not a container").unwrap();
        let out = tmp.path().join("audio.m4a");
        let result = FfmpegAudioExtractor.extract(&bogus, &out, ExtractMode::Repackage);
        assert!(result.is_err());
        assert!(!out.exists());
    }
}
