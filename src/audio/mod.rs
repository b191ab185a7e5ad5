//! Audio subsystem module

pub mod buffer;
pub mod pacing;
pub mod pcm;

pub use buffer::{DataBuffer, PcmBuffer, StagingBuffer};
pub use pacing::PacingClock;
pub use pcm::{PcmReader, PcmSink, PcmSource, PcmWriter, StaleFlag};
