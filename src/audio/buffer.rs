use std::time::Duration;

use super::wav::encode_wav;
use crate::error::AudioError;

/// Ordered capture chunks of one take, in recording order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkSequence {
    chunks: Vec<Vec<f32>>,
}

impl ChunkSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one capture callback's worth of samples
    pub fn push(&mut self, chunk: Vec<f32>) {
        self.chunks.push(chunk);
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Number of chunks (not samples)
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn chunks(&self) -> &[Vec<f32>] {
        &self.chunks
    }

    pub fn duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total_samples() as f64 / sample_rate as f64)
    }

    /// Encode the whole sequence as a single WAV file
    pub fn encode(&self, sample_rate: u32) -> Result<Vec<u8>, AudioError> {
        encode_wav(&self.chunks, sample_rate as i64)
    }
}
