use std::io::{self, Seek, SeekFrom, Write};

use thiserror::Error;

pub const WAV_HEADER_LEN: usize = 44;

/// Distance from the `totalDataLen` field to the end of the header.
const HEADER_OVERHEAD: u32 = 36;

#[derive(Error, Debug)]
pub enum WavParseError {
    #[error("wav header shorter than {WAV_HEADER_LEN} bytes")]
    Truncated,
    #[error("missing {0} marker")]
    BadMarker(&'static str),
}

/// The canonical 44-byte RIFF/WAVE header for raw PCM data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub data_len: u32,
}

impl WavHeader {
    pub fn new(data_len: u32, sample_rate: u32, channels: u16, bit_depth: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
            data_len,
        }
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bit_depth as u32 / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bit_depth / 8
    }

    /// Serialize the header; all multi-byte fields little-endian.
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(self.data_len + HEADER_OVERHEAD).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bit_depth.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_len.to_le_bytes());

        header
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, WavParseError> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(WavParseError::Truncated);
        }
        if &bytes[0..4] != b"RIFF" {
            return Err(WavParseError::BadMarker("RIFF"));
        }
        if &bytes[8..12] != b"WAVE" {
            return Err(WavParseError::BadMarker("WAVE"));
        }
        if &bytes[12..16] != b"fmt " {
            return Err(WavParseError::BadMarker("fmt "));
        }
        if &bytes[36..40] != b"data" {
            return Err(WavParseError::BadMarker("data"));
        }

        Ok(Self {
            channels: u16::from_le_bytes([bytes[22], bytes[23]]),
            sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
            data_len: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
        })
    }
}

/// Two-pass WAV writer over a seekable sink.
///
/// A 44-byte placeholder is reserved up front; `finalize` patches in the real
/// header once the PCM byte count is known.
pub struct WavSink<W: Write + Seek> {
    inner: W,
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
    data_len: u64,
}

impl<W: Write + Seek> WavSink<W> {
    pub fn new(mut inner: W, sample_rate: u32, channels: u16, bit_depth: u16) -> io::Result<Self> {
        inner.write_all(&[0u8; WAV_HEADER_LEN])?;
        Ok(Self {
            inner,
            sample_rate,
            channels,
            bit_depth,
            data_len: 0,
        })
    }

    pub fn write_samples(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.inner.write_all(pcm)?;
        self.data_len += pcm.len() as u64;
        Ok(())
    }

    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Rewrite the placeholder with the final header and return the sink.
    pub fn finalize(mut self) -> io::Result<W> {
        let header = WavHeader::new(
            self.data_len as u32,
            self.sample_rate,
            self.channels,
            self.bit_depth,
        );
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&header.to_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(8000, 0)]
    #[case(16000, 31996)]
    #[case(44100, 1_048_576)]
    #[case(48000, u32::MAX - 36)]
    fn test_header_round_trip(#[case] sample_rate: u32, #[case] data_len: u32) {
        let built = WavHeader::new(data_len, sample_rate, 1, 16);
        let parsed = WavHeader::parse(&built.to_bytes()).unwrap();
        assert_eq!(parsed.sample_rate, sample_rate);
        assert_eq!(parsed.channels, 1);
        assert_eq!(parsed.bit_depth, 16);
        assert_eq!(parsed.data_len, data_len);
    }

    #[test]
    fn test_total_len_field_is_data_plus_36() {
        let bytes = WavHeader::new(1000, 16000, 1, 16).to_bytes();
        let total = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(total, 1036);
    }

    #[test]
    fn test_derived_fields() {
        let header = WavHeader::new(0, 44100, 2, 16);
        assert_eq!(header.byte_rate(), 176_400);
        assert_eq!(header.block_align(), 4);
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(matches!(
            WavHeader::parse(&[0u8; 20]),
            Err(WavParseError::Truncated)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_markers() {
        let mut bytes = WavHeader::new(0, 16000, 1, 16).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            WavHeader::parse(&bytes),
            Err(WavParseError::BadMarker("RIFF"))
        ));
    }

    #[test]
    fn test_sink_patches_header_after_data() {
        let mut sink = WavSink::new(Cursor::new(Vec::new()), 16000, 1, 16).unwrap();
        sink.write_samples(&[1, 2, 3, 4]).unwrap();
        sink.write_samples(&[5, 6]).unwrap();
        assert_eq!(sink.data_len(), 6);

        let cursor = sink.finalize().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 6);

        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_len, 6);
        assert_eq!(header.sample_rate, 16000);
        assert_eq!(&bytes[WAV_HEADER_LEN..], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_sink_placeholder_before_finalize() {
        let mut sink = WavSink::new(Cursor::new(Vec::new()), 16000, 1, 16).unwrap();
        sink.write_samples(&[9, 9]).unwrap();
        // inner position sits past the reserved header
        let cursor = sink.finalize().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
