//! mSBC codec session handle
//!
//! A session owns the transform state and the two staging buffers of one
//! direction: decoded PCM and eSCO framed data. The encoder direction
//! fills PCM and drains data, the decoder direction does the reverse.

use super::{h2, SbcCodec, ESCO_FRAME_LEN, MSBC_CODESAMPLES, MSBC_FRAMELEN};
use crate::audio::buffer::{DataBuffer, PcmBuffer};
use crate::error::CodecError;

/// Minimum number of eSCO frames the data buffer holds
const MIN_DATA_FRAMES: usize = 3;

/// Codec session for one direction of an mSBC stream
pub struct MsbcSession<C: SbcCodec> {
    codec: C,
    pcm: PcmBuffer,
    data: DataBuffer,
    /// Transform ready for use
    initialized: bool,
    /// Transform may hold state that `finish` must release
    live: bool,
    /// Frames produced since the last pacing sync
    frames: usize,
    /// H2 sequence number of the next encoded frame
    seq: u8,
    /// H2 sequence number expected from the next decoded frame
    expected_seq: Option<u8>,
}

impl<C: SbcCodec> MsbcSession<C> {
    /// Create and initialize a session for a link with the given MTU
    ///
    /// The data buffer always has room for the unwritten remainder of an
    /// MTU-chunked write plus one more frame.
    pub fn new(codec: C, mtu: usize) -> Result<Self, CodecError> {
        let frames = MIN_DATA_FRAMES.max((mtu + 2 * ESCO_FRAME_LEN - 1) / ESCO_FRAME_LEN);

        let mut session = Self {
            codec,
            pcm: PcmBuffer::new(MSBC_CODESAMPLES * frames),
            data: DataBuffer::new(ESCO_FRAME_LEN * frames),
            initialized: false,
            live: false,
            frames: 0,
            seq: 0,
            expected_seq: None,
        };

        // on failure the session is dropped here, which finalizes it
        session.init()?;
        Ok(session)
    }

    /// (Re)initialize the transform and drop everything staged
    pub fn init(&mut self) -> Result<(), CodecError> {
        self.initialized = false;
        self.live = true;
        self.codec.reset()?;

        self.pcm.rewind();
        self.data.rewind();
        self.frames = 0;
        self.seq = 0;
        self.expected_seq = None;
        self.initialized = true;
        Ok(())
    }

    /// Release the transform state
    ///
    /// Safe to call any number of times, including after a failed init.
    pub fn finalize(&mut self) {
        if self.live {
            self.codec.finish();
            self.live = false;
        }
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Encode one block of staged PCM into an eSCO frame
    ///
    /// Returns the number of frames produced: 0 if less than a block of
    /// PCM is staged or the data buffer has no room for another frame. A
    /// block the transform fails on is dropped.
    pub fn encode_step(&mut self) -> Result<usize, CodecError> {
        if !self.initialized {
            return Err(CodecError::NotInitialized);
        }
        if self.pcm.len_out() < MSBC_CODESAMPLES || self.data.len_in() < ESCO_FRAME_LEN {
            return Ok(0);
        }

        let frame = &mut self.data.tail_mut()[..ESCO_FRAME_LEN];
        frame[..h2::H2_HEADER_LEN].copy_from_slice(&h2::header(self.seq));
        let result = self.codec.encode(
            &self.pcm.data()[..MSBC_CODESAMPLES],
            &mut frame[h2::H2_HEADER_LEN..h2::H2_HEADER_LEN + MSBC_FRAMELEN],
        );
        self.pcm.shift(MSBC_CODESAMPLES);

        match result? {
            MSBC_FRAMELEN => {}
            len => return Err(CodecError::InvalidFrameSize(len)),
        }
        frame[ESCO_FRAME_LEN - 1] = 0;

        self.data.seek(ESCO_FRAME_LEN);
        self.seq = (self.seq + 1) & 0x03;
        self.frames += 1;
        Ok(1)
    }

    /// Decode one eSCO frame from the staged data
    ///
    /// Returns 1 if a frame was consumed and 0 if a full frame is not
    /// staged yet (or there is no room for its PCM). Bytes preceding the
    /// next H2 header are dropped. A frame the transform rejects is
    /// consumed and reported as an error.
    pub fn decode_step(&mut self) -> Result<usize, CodecError> {
        if !self.initialized {
            return Err(CodecError::NotInitialized);
        }

        match h2::find(self.data.data()) {
            Some(0) => {}
            Some(offset) => {
                tracing::debug!("Dropped {} bytes to resynchronize mSBC stream", offset);
                self.data.shift(offset);
            }
            None => {
                // keep what may be the beginning of a split header
                let len = self.data.len_out();
                self.data.shift(len.saturating_sub(h2::H2_HEADER_LEN));
                return Ok(0);
            }
        }

        if self.data.len_out() < ESCO_FRAME_LEN || self.pcm.len_in() < MSBC_CODESAMPLES {
            return Ok(0);
        }

        let seq = h2::parse(self.data.data()).unwrap_or_default();
        if let Some(expected) = self.expected_seq {
            if seq != expected {
                let missing = usize::from((seq + 4 - expected) & 0x03);
                tracing::warn!("Missing mSBC packets: {}", missing);
                self.conceal(missing);
            }
        }
        self.expected_seq = Some((seq + 1) & 0x03);

        let frame = &self.data.data()[h2::H2_HEADER_LEN..h2::H2_HEADER_LEN + MSBC_FRAMELEN];
        let result = self
            .codec
            .decode(frame, &mut self.pcm.tail_mut()[..MSBC_CODESAMPLES]);
        self.data.shift(ESCO_FRAME_LEN);

        let samples = result?;
        self.pcm.seek(samples.min(MSBC_CODESAMPLES));
        Ok(1)
    }

    /// Fill in silence for lost frames, leaving room for the current one
    fn conceal(&mut self, missing: usize) {
        for _ in 0..missing {
            if self.pcm.len_in() < 2 * MSBC_CODESAMPLES {
                break;
            }
            self.pcm.tail_mut()[..MSBC_CODESAMPLES].fill(0);
            self.pcm.seek(MSBC_CODESAMPLES);
        }
    }

    /// Frames produced since the last [`reset_frames`](Self::reset_frames)
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn reset_frames(&mut self) {
        self.frames = 0;
    }

    pub fn pcm(&self) -> &PcmBuffer {
        &self.pcm
    }

    pub fn pcm_mut(&mut self) -> &mut PcmBuffer {
        &mut self.pcm
    }

    pub fn data(&self) -> &DataBuffer {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBuffer {
        &mut self.data
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<C: SbcCodec> Drop for MsbcSession<C> {
    fn drop(&mut self) {
        self.finalize();
    }
}
