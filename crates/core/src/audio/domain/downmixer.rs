use thiserror::Error;

use crate::shared::constants::PCM_BIT_DEPTH;

const BYTES_PER_SAMPLE: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DownmixError {
    #[error("unsupported pcm bit depth {0}, only 16-bit is handled")]
    UnsupportedBitDepth(u16),
    #[error("pcm data with zero channels")]
    NoChannels,
}

/// Merge interleaved little-endian signed 16-bit PCM into one mono channel.
///
/// Each frame (one sample per channel) collapses to the integer mean of its
/// channel samples. The mean of N i16 values always fits in i16, so no
/// clipping is needed. A trailing partial frame is dropped.
pub fn downmix_to_mono(pcm: &[u8], channels: u16, bit_depth: u16) -> Result<Vec<u8>, DownmixError> {
    if bit_depth != PCM_BIT_DEPTH {
        return Err(DownmixError::UnsupportedBitDepth(bit_depth));
    }
    if channels == 0 {
        return Err(DownmixError::NoChannels);
    }
    if channels == 1 {
        return Ok(pcm.to_vec());
    }

    let channels = channels as usize;
    let frame_bytes = channels * BYTES_PER_SAMPLE;
    let frame_count = pcm.len() / frame_bytes;
    let mut mono = Vec::with_capacity(frame_count * BYTES_PER_SAMPLE);

    for frame in pcm.chunks_exact(frame_bytes) {
        let mut sum: i32 = 0;
        for sample in frame.chunks_exact(BYTES_PER_SAMPLE) {
            sum += i16::from_le_bytes([sample[0], sample[1]]) as i32;
        }
        let avg = (sum / channels as i32) as i16;
        mono.extend_from_slice(&avg.to_le_bytes());
    }

    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn interleave(frames: &[Vec<i16>]) -> Vec<u8> {
        frames
            .iter()
            .flatten()
            .flat_map(|s| s.to_le_bytes())
            .collect()
    }

    fn samples(pcm: &[u8]) -> Vec<i16> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    #[case(5)]
    #[case(6)]
    #[case(7)]
    #[case(8)]
    fn test_equal_amplitude_preserved(#[case] channels: u16) {
        let frame: Vec<i16> = vec![1200; channels as usize];
        let pcm = interleave(&[frame.clone(), frame]);
        let mono = downmix_to_mono(&pcm, channels, 16).unwrap();
        assert_eq!(samples(&mono), vec![1200, 1200]);
    }

    #[test]
    fn test_mono_is_identity() {
        let pcm = interleave(&[vec![5], vec![-7], vec![32767]]);
        let mono = downmix_to_mono(&pcm, 1, 16).unwrap();
        assert_eq!(mono, pcm);
    }

    #[test]
    fn test_stereo_average() {
        let pcm = interleave(&[vec![100, 300], vec![-100, 100]]);
        let mono = downmix_to_mono(&pcm, 2, 16).unwrap();
        assert_eq!(samples(&mono), vec![200, 0]);
    }

    #[test]
    fn test_extreme_amplitudes_do_not_overflow() {
        let pcm = interleave(&[vec![i16::MAX, i16::MAX], vec![i16::MIN, i16::MIN]]);
        let mono = downmix_to_mono(&pcm, 2, 16).unwrap();
        assert_eq!(samples(&mono), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_trailing_partial_frame_dropped() {
        let mut pcm = interleave(&[vec![10, 20]]);
        pcm.extend_from_slice(&[0x01]); // one stray byte
        let mono = downmix_to_mono(&pcm, 2, 16).unwrap();
        assert_eq!(samples(&mono), vec![15]);
    }

    #[test]
    fn test_rejects_other_bit_depths() {
        let err = downmix_to_mono(&[0; 8], 2, 24).unwrap_err();
        assert_eq!(err, DownmixError::UnsupportedBitDepth(24));
        let err = downmix_to_mono(&[0; 8], 2, 8).unwrap_err();
        assert_eq!(err, DownmixError::UnsupportedBitDepth(8));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let err = downmix_to_mono(&[0; 4], 0, 16).unwrap_err();
        assert_eq!(err, DownmixError::NoChannels);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let mono = downmix_to_mono(&[], 2, 16).unwrap();
        assert!(mono.is_empty());
    }
}
