pub mod buffer;
pub mod capture;
pub mod resample;
pub mod wav;

pub use buffer::ChunkSequence;
pub use capture::{AudioCapture, CaptureConfig};
pub use wav::{encode_wav, inspect_wav, WavSummary};
