//! mSBC codec session
//!
//! The SBC bitstream transform itself is supplied through [`SbcCodec`];
//! this module wraps it with the eSCO framing (H2 synchronization header,
//! sequence numbering, padding) and the staging buffers the worker loops
//! drive.

pub mod h2;
pub mod msbc;

pub use msbc::MsbcSession;

use crate::error::CodecError;

/// PCM samples consumed/produced per mSBC frame
pub const MSBC_CODESAMPLES: usize = 120;

/// Length of one mSBC encoded SBC frame
pub const MSBC_FRAMELEN: usize = 57;

/// First byte of every SBC frame header of an mSBC stream
pub const MSBC_SYNCWORD: u8 = 0xAD;

/// mSBC sampling rate
pub const MSBC_SAMPLE_RATE: u32 = 16000;

/// Length of one eSCO packet: H2 header, SBC frame, one padding byte
pub const ESCO_FRAME_LEN: usize = h2::H2_HEADER_LEN + MSBC_FRAMELEN + 1;

/// SBC transform of a single mSBC block
///
/// Implementations are pure transforms between one block of
/// [`MSBC_CODESAMPLES`] mono samples and one [`MSBC_FRAMELEN`]-byte SBC
/// frame starting with [`MSBC_SYNCWORD`].
pub trait SbcCodec: Send {
    /// (Re)initialize the transform state
    fn reset(&mut self) -> Result<(), CodecError>;

    /// Encode one block of samples into `frame`, returning the frame length
    fn encode(&mut self, pcm: &[i16], frame: &mut [u8]) -> Result<usize, CodecError>;

    /// Decode one SBC frame into `pcm`, returning the number of samples
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, CodecError>;

    /// Release any internal state
    fn finish(&mut self) {}
}

impl<C: SbcCodec + ?Sized> SbcCodec for Box<C> {
    fn reset(&mut self) -> Result<(), CodecError> {
        (**self).reset()
    }

    fn encode(&mut self, pcm: &[i16], frame: &mut [u8]) -> Result<usize, CodecError> {
        (**self).encode(pcm, frame)
    }

    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, CodecError> {
        (**self).decode(frame, pcm)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}
