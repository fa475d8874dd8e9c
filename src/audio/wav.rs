use hound::WavReader;
use std::path::Path;
use std::time::Duration;

use crate::error::AudioError;

/// Size of the canonical RIFF/WAVE header for 16-bit PCM
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

/// Encode mono f32 chunks as a 16-bit PCM WAV file.
///
/// Chunks are written back to back in order, so the chunk boundaries never
/// show up in the output. Samples are clamped to [-1.0, 1.0], scaled by
/// `i16::MAX` and truncated toward zero: -1.0 encodes as -32767, not -32768.
///
/// Fails with [`AudioError::InvalidArgument`] when `sample_rate` is not
/// positive or when a header field would not fit in 32 bits. Nothing is
/// allocated before the arguments are checked.
pub fn encode_wav<C: AsRef<[f32]>>(chunks: &[C], sample_rate: i64) -> Result<Vec<u8>, AudioError> {
    if sample_rate <= 0 {
        return Err(AudioError::InvalidArgument(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }

    let sample_rate = u32::try_from(sample_rate).map_err(|_| {
        AudioError::InvalidArgument(format!("sample rate {} does not fit in 32 bits", sample_rate))
    })?;
    let byte_rate = sample_rate
        .checked_mul(CHANNELS as u32 * BYTES_PER_SAMPLE)
        .ok_or_else(|| {
            AudioError::InvalidArgument(format!("byte rate overflows for {} Hz", sample_rate))
        })?;

    let total_samples: usize = chunks.iter().map(|c| c.as_ref().len()).sum();
    let data_size = u32::try_from(total_samples)
        .ok()
        .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE))
        .and_then(|n| n.checked_add(36).map(|riff| (n, riff)));
    let (data_size, riff_size) = data_size.ok_or_else(|| {
        AudioError::InvalidArgument(format!("{} samples exceed the WAV size limit", total_samples))
    })?;

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

    // RIFF chunk descriptor
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&riff_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // audio format
    buf.extend_from_slice(&CHANNELS.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&(CHANNELS * BITS_PER_SAMPLE / 8).to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());

    for chunk in chunks {
        for &sample in chunk.as_ref() {
            buf.extend_from_slice(&sample_to_pcm16(sample).to_le_bytes());
        }
    }

    debug_assert_eq!(buf.len(), WAV_HEADER_LEN + data_size as usize);
    Ok(buf)
}

/// Convert one float sample to 16-bit PCM (clamp, scale, truncate).
/// NaN becomes 0.
#[inline]
pub fn sample_to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Format details of a WAV file on disk
#[derive(Debug, Clone, PartialEq)]
pub struct WavSummary {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Samples per channel
    pub samples: u32,
}

impl WavSummary {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }
}

/// Read the header of a WAV file
pub fn inspect_wav(path: impl AsRef<Path>) -> Result<WavSummary, AudioError> {
    let reader = WavReader::open(path).map_err(|e| AudioError::WavError(e.to_string()))?;
    let spec = reader.spec();

    Ok(WavSummary {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        samples: reader.duration(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavReader};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    fn pcm_at(bytes: &[u8], index: usize) -> i16 {
        let offset = WAV_HEADER_LEN + index * 2;
        i16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_fields_match_layout() {
        let chunks = vec![vec![0.0f32; 100], vec![0.25f32; 28]];
        let bytes = encode_wav(&chunks, 44100).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + 128 * 2);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 1);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 88200);
        assert_eq!(u16_at(&bytes, 32), 2);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 256);
    }

    #[test]
    fn exact_bytes_for_small_input() {
        let bytes = encode_wav(&[[0.5f32, -0.5]], 8000).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"RIFF");
        expected.extend_from_slice(&40u32.to_le_bytes());
        expected.extend_from_slice(b"WAVEfmt ");
        expected.extend_from_slice(&[16, 0, 0, 0, 1, 0, 1, 0]);
        expected.extend_from_slice(&8000u32.to_le_bytes());
        expected.extend_from_slice(&16000u32.to_le_bytes());
        expected.extend_from_slice(&[2, 0, 16, 0]);
        expected.extend_from_slice(b"data");
        expected.extend_from_slice(&4u32.to_le_bytes());
        // 0.5 * 32767 = 16383.5 -> 16383, -16383.5 -> -16383
        expected.extend_from_slice(&16383i16.to_le_bytes());
        expected.extend_from_slice(&(-16383i16).to_le_bytes());

        assert_eq!(bytes, expected);
    }

    #[test]
    fn length_is_header_plus_two_bytes_per_sample() {
        for sizes in [vec![], vec![0], vec![1], vec![4096, 4096, 17], vec![0, 3, 0]] {
            let chunks: Vec<Vec<f32>> = sizes.iter().map(|&n| vec![0.1; n]).collect();
            let total: usize = sizes.iter().sum();
            let bytes = encode_wav(&chunks, 44100).unwrap();
            assert_eq!(bytes.len(), WAV_HEADER_LEN + total * 2);
        }
    }

    #[test]
    fn standard_reader_sees_mono_16_bit() {
        let chunks = vec![vec![0.1f32; 4096], vec![-0.3f32; 1000]];
        let bytes = encode_wav(&chunks, 44100).unwrap();

        let reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.duration(), 5096);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 3276);
        assert_eq!(samples[4096], -9830);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let bytes = encode_wav(&[[1.5f32, 1.0, -2.0, -1.0]], 44100).unwrap();
        assert_eq!(pcm_at(&bytes, 0), i16::MAX);
        assert_eq!(pcm_at(&bytes, 1), i16::MAX);
        assert_eq!(pcm_at(&bytes, 2), -32767);
        assert_eq!(pcm_at(&bytes, 3), -32767);
    }

    #[test]
    fn conversion_truncates_toward_zero() {
        assert_eq!(sample_to_pcm16(0.0), 0);
        assert_eq!(sample_to_pcm16(0.99999), 32766);
        assert_eq!(sample_to_pcm16(-0.00001), 0);
        assert_eq!(sample_to_pcm16(f32::NAN), 0);
        assert_eq!(sample_to_pcm16(f32::INFINITY), i16::MAX);
        assert_eq!(sample_to_pcm16(f32::NEG_INFINITY), -32767);
    }

    #[test]
    fn empty_input_is_header_only() {
        let chunks: Vec<Vec<f32>> = Vec::new();
        let bytes = encode_wav(&chunks, 44100).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&bytes, 4), 36);
        assert_eq!(u32_at(&bytes, 40), 0);

        let only_empty: [&[f32]; 2] = [&[], &[]];
        assert_eq!(encode_wav(&only_empty, 44100).unwrap(), bytes);
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let a: Vec<f32> = (0..300).map(|i| (i as f32 / 150.0) - 1.0).collect();
        let b: Vec<f32> = (0..77).map(|i| (i as f32 * 0.37).sin()).collect();
        let joined: Vec<f32> = a.iter().chain(b.iter()).copied().collect();

        let split = encode_wav(&[a, b], 44100).unwrap();
        let whole = encode_wav(&[joined], 44100).unwrap();
        assert_eq!(split, whole);
    }

    #[test]
    fn non_positive_sample_rate_is_rejected() {
        let chunks = vec![vec![0.0f32; 10]];
        for rate in [0, -1, i64::MIN] {
            assert!(matches!(
                encode_wav(&chunks, rate),
                Err(AudioError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn oversized_sample_rate_is_rejected() {
        let chunks: Vec<Vec<f32>> = Vec::new();
        assert!(matches!(
            encode_wav(&chunks, u32::MAX as i64 + 1),
            Err(AudioError::InvalidArgument(_))
        ));
        assert!(matches!(
            encode_wav(&chunks, u32::MAX as i64),
            Err(AudioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn input_is_left_untouched() {
        let chunks = vec![vec![3.0f32, -3.0]];
        let _ = encode_wav(&chunks, 16000).unwrap();
        assert_eq!(chunks, vec![vec![3.0f32, -3.0]]);
    }

    #[test]
    fn inspect_reads_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let bytes = encode_wav(&[vec![0.2f32; 22050]], 44100).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let summary = inspect_wav(&path).unwrap();
        assert_eq!(
            summary,
            WavSummary {
                sample_rate: 44100,
                channels: 1,
                bits_per_sample: 16,
                samples: 22050,
            }
        );
        assert_eq!(summary.duration(), Duration::from_millis(500));
    }
}
