//! Take recorder: tracks one prompt's recording from the first chunk to a
//! submitted WAV.
//!
//! ```text
//! Idle --start--> Recording --stop--> StoppedReady --begin_save--> Saving
//!  ^                                     |    ^                      |
//!  +--------------retake-----------------+    +----finish_save(err)--+
//!  +----------------------------finish_save(ok)----------------------+
//! ```

use std::time::Duration;
use tracing::{debug, info};

use crate::audio::ChunkSequence;
use crate::error::RecorderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Waiting for the contributor to press record
    Idle,
    /// Capture chunks are being retained
    Recording,
    /// Recording stopped; the take can be saved or retaken
    StoppedReady,
    /// The take is being submitted
    Saving,
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "idle"),
            RecorderState::Recording => write!(f, "recording"),
            RecorderState::StoppedReady => write!(f, "stopped"),
            RecorderState::Saving => write!(f, "saving"),
        }
    }
}

#[derive(Debug)]
pub struct Recorder {
    state: RecorderState,
    sample_rate: u32,
    chunks: ChunkSequence,
    take: Option<Vec<u8>>,
}

impl Recorder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            state: RecorderState::Idle,
            sample_rate,
            chunks: ChunkSequence::new(),
            take: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Length of the audio captured so far
    pub fn recorded(&self) -> Duration {
        self.chunks.duration(self.sample_rate)
    }

    /// Encoded WAV of the last stopped take, if it had any audio
    pub fn take(&self) -> Option<&[u8]> {
        self.take.as_deref()
    }

    pub fn start(&mut self) -> Result<(), RecorderError> {
        self.expect(RecorderState::Idle, "start recording")?;
        self.chunks.clear();
        self.take = None;
        self.transition(RecorderState::Recording);
        Ok(())
    }

    /// Retain a capture chunk. Returns false (and drops it) unless recording.
    pub fn push_chunk(&mut self, chunk: Vec<f32>) -> bool {
        if self.state != RecorderState::Recording {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    /// Stop recording and encode the take
    pub fn stop(&mut self) -> Result<Option<&[u8]>, RecorderError> {
        self.expect(RecorderState::Recording, "stop recording")?;

        self.take = if self.chunks.total_samples() == 0 {
            None
        } else {
            Some(self.chunks.encode(self.sample_rate)?)
        };
        self.transition(RecorderState::StoppedReady);

        info!(
            "Take stopped: {} chunks, {:.2}s",
            self.chunks.len(),
            self.recorded().as_secs_f32()
        );
        Ok(self.take.as_deref())
    }

    /// Throw the take away and go back to idle
    pub fn retake(&mut self) -> Result<(), RecorderError> {
        self.expect(RecorderState::StoppedReady, "retake")?;
        self.clear();
        self.transition(RecorderState::Idle);
        Ok(())
    }

    /// Hand out the take for submission
    pub fn begin_save(&mut self) -> Result<Vec<u8>, RecorderError> {
        self.expect(RecorderState::StoppedReady, "save")?;
        let wav = self.take.clone().ok_or(RecorderError::NothingRecorded)?;
        self.transition(RecorderState::Saving);
        Ok(wav)
    }

    /// Submission finished. A failed save keeps the take so it can be retried.
    pub fn finish_save(&mut self, saved: bool) -> Result<(), RecorderError> {
        self.expect(RecorderState::Saving, "finish saving")?;
        if saved {
            self.clear();
            self.transition(RecorderState::Idle);
        } else {
            self.transition(RecorderState::StoppedReady);
        }
        Ok(())
    }

    /// Drop everything, whatever the state
    pub fn reset(&mut self) {
        self.clear();
        self.transition(RecorderState::Idle);
    }

    fn clear(&mut self) {
        self.chunks.clear();
        self.take = None;
    }

    fn expect(&self, state: RecorderState, action: &'static str) -> Result<(), RecorderError> {
        if self.state == state {
            Ok(())
        } else {
            Err(RecorderError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, state: RecorderState) {
        debug!("Recorder: {} -> {}", self.state, state);
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_wav;

    fn stopped_with(chunks: &[Vec<f32>]) -> Recorder {
        let mut recorder = Recorder::new(44100);
        recorder.start().unwrap();
        for chunk in chunks {
            assert!(recorder.push_chunk(chunk.clone()));
        }
        recorder.stop().unwrap();
        recorder
    }

    #[test]
    fn stop_encodes_all_chunks() {
        let chunks = vec![vec![0.1; 4096], vec![0.2; 4096]];
        let recorder = stopped_with(&chunks);

        assert_eq!(recorder.state(), RecorderState::StoppedReady);
        assert_eq!(recorder.take(), Some(encode_wav(&chunks, 44100).unwrap().as_slice()));
    }

    #[test]
    fn chunks_outside_recording_are_dropped() {
        let mut recorder = Recorder::new(44100);
        assert!(!recorder.push_chunk(vec![0.5; 10]));

        recorder.start().unwrap();
        assert!(recorder.push_chunk(vec![0.5; 10]));
        recorder.stop().unwrap();
        assert!(!recorder.push_chunk(vec![0.5; 10]));

        assert_eq!(recorder.take().map(<[u8]>::len), Some(44 + 20));
    }

    #[test]
    fn empty_take_cannot_be_saved() {
        let mut recorder = stopped_with(&[]);
        assert_eq!(recorder.take(), None);
        assert!(matches!(
            recorder.begin_save(),
            Err(RecorderError::NothingRecorded)
        ));
        assert_eq!(recorder.state(), RecorderState::StoppedReady);
    }

    #[test]
    fn take_of_empty_chunks_cannot_be_saved() {
        let mut recorder = stopped_with(&[Vec::new(), Vec::new()]);
        assert_eq!(recorder.take(), None);
        assert!(matches!(
            recorder.begin_save(),
            Err(RecorderError::NothingRecorded)
        ));
    }

    #[test]
    fn retake_discards_audio() {
        let mut recorder = stopped_with(&[vec![0.3; 100]]);
        recorder.retake().unwrap();

        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.take(), None);
        assert_eq!(recorder.recorded(), Duration::ZERO);
    }

    #[test]
    fn failed_save_keeps_take_for_retry() {
        let mut recorder = stopped_with(&[vec![0.3; 100]]);
        let wav = recorder.begin_save().unwrap();
        assert_eq!(recorder.state(), RecorderState::Saving);

        recorder.finish_save(false).unwrap();
        assert_eq!(recorder.state(), RecorderState::StoppedReady);
        assert_eq!(recorder.begin_save().unwrap(), wav);

        recorder.finish_save(true).unwrap();
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.take(), None);
    }

    #[test]
    fn invalid_transitions_are_reported() {
        let mut recorder = Recorder::new(44100);
        assert!(matches!(
            recorder.stop(),
            Err(RecorderError::InvalidTransition {
                from: RecorderState::Idle,
                ..
            })
        ));
        assert!(recorder.retake().is_err());
        assert!(recorder.begin_save().is_err());
        assert!(recorder.finish_save(true).is_err());

        recorder.start().unwrap();
        assert!(recorder.start().is_err());
    }

    #[test]
    fn start_clears_previous_take() {
        let mut recorder = stopped_with(&[vec![0.3; 100]]);
        recorder.reset();
        recorder.start().unwrap();
        recorder.stop().unwrap();
        assert_eq!(recorder.take(), None);
    }

    #[test]
    fn zero_rate_surfaces_encode_error() {
        let mut recorder = Recorder::new(0);
        recorder.start().unwrap();
        recorder.push_chunk(vec![0.0; 4]);
        assert!(matches!(recorder.stop(), Err(RecorderError::Encode(_))));
        assert_eq!(recorder.state(), RecorderState::Recording);
    }
}
