use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::{debug, warn};

use crate::error::AudioError;

/// Frames handed to the sinc resampler per pass
const BLOCK_FRAMES: usize = 256;

/// Mono sample rate converter that keeps its state between capture callbacks,
/// so a take split into many chunks resamples exactly like one long buffer.
pub struct StreamResampler {
    inner: Option<SincFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, AudioError> {
        if source_rate == target_rate {
            return Ok(Self {
                inner: None,
                pending: Vec::new(),
            });
        }
        if source_rate == 0 || target_rate == 0 {
            return Err(AudioError::ConfigError(format!(
                "Cannot resample {} Hz to {} Hz",
                source_rate, target_rate
            )));
        }

        let params = SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = target_rate as f64 / source_rate as f64;
        let inner = SincFixedIn::<f32>::new(ratio, 2.0, params, BLOCK_FRAMES, 1)
            .map_err(|e| AudioError::ConfigError(format!("Failed to build resampler: {}", e)))?;

        debug!("Resampling {} Hz -> {} Hz", source_rate, target_rate);
        Ok(Self {
            inner: Some(inner),
            pending: Vec::with_capacity(BLOCK_FRAMES * 2),
        })
    }

    /// Feed one chunk and return every output sample that is ready.
    /// Input short of a full block waits for the next chunk.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(inner) = self.inner.as_mut() else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        let mut consumed = 0;
        loop {
            let needed = inner.input_frames_next();
            if self.pending.len() - consumed < needed {
                break;
            }

            let block = &self.pending[consumed..consumed + needed];
            match inner.process(std::slice::from_ref(&block), None) {
                Ok(mut frames) => output.append(&mut frames[0]),
                Err(e) => warn!("Resampler dropped a block: {}", e),
            }
            consumed += needed;
        }

        self.pending.drain(..consumed);
        output
    }
}
