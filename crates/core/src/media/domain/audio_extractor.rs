use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::domain::downmixer::DownmixError;

/// Which form the extracted audio takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Stream-copy the coded audio track into a new container.
    Repackage,
    /// Decode to PCM, downmix to mono, write a 16-bit WAV.
    TranscodeToMonoWav,
}

impl ExtractMode {
    pub fn extension(&self) -> &'static str {
        match self {
            ExtractMode::Repackage => "m4a",
            ExtractMode::TranscodeToMonoWav => "wav",
        }
    }
}

/// One elementary stream found while probing a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub index: usize,
    /// Mime-like type string, e.g. "audio/aac" or "video/h264".
    pub kind: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl TrackDescriptor {
    pub fn is_audio(&self) -> bool {
        self.kind.starts_with("audio/")
    }
}

/// First track whose kind is prefixed `audio/`. The only selection policy —
/// no bitrate or language preference.
pub fn select_audio_track(tracks: &[TrackDescriptor]) -> Option<&TrackDescriptor> {
    tracks.iter().find(|t| t.is_audio())
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no audio track in source")]
    NoAudioTrack,
    #[error("pcm layout not supported: {0}")]
    Downmix(#[from] DownmixError),
    #[error("demux/decode failed: {0}")]
    Media(#[from] ffmpeg_next::Error),
    #[error("audio file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode worker failed: {0}")]
    Worker(String),
}

/// Domain interface for turning a video file into a standalone audio file.
///
/// Returns the path of the finished audio file. No partial output survives
/// a failed call.
pub trait AudioExtractor: Send {
    fn extract(
        &self,
        video: &Path,
        output: &Path,
        mode: ExtractMode,
    ) -> Result<PathBuf, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(index: usize, kind: &str) -> TrackDescriptor {
        TrackDescriptor {
            index,
            kind: kind.to_string(),
            sample_rate: 44100,
            channels: 2,
        }
    }

    #[test]
    fn test_selects_first_audio_track() {
        let tracks = vec![track(0, "video/h264"), track(1, "audio/aac")];
        let selected = select_audio_track(&tracks).unwrap();
        assert_eq!(selected.index, 1);
    }

    #[test]
    fn test_selects_first_of_several_audio_tracks() {
        let tracks = vec![
            track(0, "video/h264"),
            track(1, "audio/aac"),
            track(2, "audio/opus"),
        ];
        assert_eq!(select_audio_track(&tracks).unwrap().index, 1);
    }

    #[test]
    fn test_no_audio_track_selects_nothing() {
        let tracks = vec![track(0, "video/h264"), track(1, "subtitle/srt")];
        assert!(select_audio_track(&tracks).is_none());
    }

    #[test]
    fn test_prefix_must_match_exactly() {
        // "audiobook/..." must not satisfy the audio/ prefix
        let tracks = vec![track(0, "audiobook/x")];
        assert!(select_audio_track(&tracks).is_none());
    }

    #[test]
    fn test_mode_extensions() {
        assert_eq!(ExtractMode::Repackage.extension(), "m4a");
        assert_eq!(ExtractMode::TranscodeToMonoWav.extension(), "wav");
    }
}
