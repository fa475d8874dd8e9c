use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::resample::StreamResampler;
use crate::error::AudioError;

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rate every delivered chunk is converted to (default: 44100)
    pub sample_rate: u32,
    /// Input device name (None = default)
    pub device_name: Option<String>,
    /// Capture backlog in samples; the chunk channel holds `buffer_size / 64` chunks (at least 32)
    pub buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            device_name: None,
            buffer_size: 4096,
        }
    }
}

/// Microphone capture that hands out one mono chunk per device callback
pub struct AudioCapture {
    device: Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    target_sample_rate: u32,
    channel_capacity: usize,
    is_recording: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new(config: CaptureConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = if let Some(ref name) = config.device_name {
            host.input_devices()
                .map_err(|e| AudioError::DeviceError(e.to_string()))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceError(format!("Device '{}' not found", name)))?
        } else {
            host.default_input_device()
                .ok_or(AudioError::NoInputDevice)?
        };

        info!("Using audio input device: {:?}", device.name());

        let supported_config = device
            .default_input_config()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?;

        debug!("Supported config: {:?}", supported_config);

        let sample_format = supported_config.sample_format();
        let stream_config: StreamConfig = supported_config.config();

        Ok(Self {
            device,
            stream_config,
            sample_format,
            target_sample_rate: config.sample_rate,
            channel_capacity: channel_capacity(config.buffer_size),
            is_recording: Arc::new(AtomicBool::new(false)),
        })
    }

    /// List available input devices
    pub fn list_devices() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .input_devices()
            .map_err(|e| AudioError::DeviceError(e.to_string()))?
            .filter_map(|d| d.name().ok())
            .collect();
        Ok(devices)
    }

    /// Start recording and return a receiver for captured chunks
    pub fn start(&self) -> Result<(Stream, mpsc::Receiver<Vec<f32>>), AudioError> {
        let (tx, rx) = mpsc::channel::<Vec<f32>>(self.channel_capacity);
        let is_recording = self.is_recording.clone();
        is_recording.store(true, Ordering::SeqCst);

        let err_fn = |err: cpal::StreamError| error!("Audio stream error: {}", err);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(tx, is_recording, err_fn)?,
            SampleFormat::I16 => self.build_stream::<i16>(tx, is_recording, err_fn)?,
            SampleFormat::U16 => self.build_stream::<u16>(tx, is_recording, err_fn)?,
            other => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(AudioError::ConfigError(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        info!(
            "Audio recording started ({} Hz, {} ch -> {} Hz mono)",
            self.stream_config.sample_rate.0, self.stream_config.channels, self.target_sample_rate
        );
        Ok((stream, rx))
    }

    fn build_stream<T>(
        &self,
        tx: mpsc::Sender<Vec<f32>>,
        is_recording: Arc<AtomicBool>,
        err_fn: impl Fn(cpal::StreamError) + Send + 'static,
    ) -> Result<Stream, AudioError>
    where
        T: cpal::Sample + cpal::SizedSample + Send + 'static,
        f32: cpal::FromSample<T>,
    {
        let channels = self.stream_config.channels as usize;
        let mut resampler =
            StreamResampler::new(self.stream_config.sample_rate.0, self.target_sample_rate)?;

        let stream = self
            .device
            .build_input_stream(
                &self.stream_config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !is_recording.load(Ordering::SeqCst) {
                        return;
                    }

                    let samples: Vec<f32> = data
                        .iter()
                        .map(|s| cpal::Sample::from_sample(*s))
                        .collect();
                    let mono = downmix(&samples, channels);
                    let chunk = resampler.process(&mono);
                    if chunk.is_empty() {
                        return;
                    }

                    // A closed channel means the take already ended
                    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(chunk) {
                        warn!("Capture consumer is behind, dropping a chunk");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        Ok(stream)
    }

    /// Stop delivering chunks; callbacks after this are ignored
    pub fn stop(&self) {
        self.is_recording.store(false, Ordering::SeqCst);
        info!("Audio recording stopped");
    }

    /// Flag the stream callback checks; clearing it stops delivery from any thread
    pub fn recording_flag(&self) -> Arc<AtomicBool> {
        self.is_recording.clone()
    }
}

/// Chunks the channel may hold for a backlog of `buffer_size` samples.
/// Chunks are small; the channel only needs to absorb scheduler hiccups.
fn channel_capacity(buffer_size: usize) -> usize {
    (buffer_size / 64).max(32)
}

/// Average interleaved frames down to one channel
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
