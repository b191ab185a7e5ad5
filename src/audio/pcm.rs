//! Local PCM endpoint I/O
//!
//! The worker loops talk to the PCM side through [`PcmSource`] and
//! [`PcmSink`]. [`PcmReader`] and [`PcmWriter`] implement them over any
//! byte stream (typically a FIFO shared with an audio client) carrying
//! signed 16-bit little-endian mono samples.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::PcmConfig;
use crate::error::PcmError;

/// Blocking PCM input
pub trait PcmSource: Send {
    /// Wait for samples and read at most `buf.len()` of them
    ///
    /// `Ok(0)` means no data is flowing (e.g. no client attached).
    /// [`PcmError::Stale`] reports a discontinuity: everything read so far
    /// must be considered invalid.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, PcmError>;
}

/// Blocking PCM output
pub trait PcmSink: Send {
    /// Write samples, returning how many were written
    ///
    /// `Ok(0)` means there is no consumer.
    fn write(&mut self, samples: &[i16]) -> Result<usize, PcmError>;
}

/// Shared discontinuity flag
///
/// Raised by whoever controls the PCM stream (for example on a drop
/// request); the next read on the associated reader reports
/// [`PcmError::Stale`].
#[derive(Debug, Clone, Default)]
pub struct StaleFlag(Arc<AtomicBool>);

impl StaleFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear the flag, returning whether it was raised
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// Delay between polls once the client side has closed
const CLOSED_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// PCM source reading little-endian `i16` samples from a byte stream
pub struct PcmReader<R> {
    inner: R,
    stale: StaleFlag,
    /// Raw bytes; a trailing half sample is carried to the next read
    scratch: Vec<u8>,
    carry: Option<u8>,
    closed: bool,
    poll_interval: Duration,
}

impl<R: Read + Send> PcmReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            stale: StaleFlag::new(),
            scratch: Vec::new(),
            carry: None,
            closed: false,
            poll_interval: CLOSED_POLL_INTERVAL,
        }
    }

    /// Handle for signaling discontinuities to this reader
    pub fn stale_flag(&self) -> StaleFlag {
        self.stale.clone()
    }

    /// Reader polling at the configured idle interval
    pub fn from_config(inner: R, config: &PcmConfig) -> Self {
        Self::new(inner).with_poll_interval(config.idle_poll())
    }

    /// Set how long a read on a closed stream waits before reporting no data
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether the writing side has closed the stream
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<R: Read + Send> PcmSource for PcmReader<R> {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, PcmError> {
        if self.stale.take() {
            self.carry = None;
            return Err(PcmError::Stale);
        }

        if self.closed {
            thread::sleep(self.poll_interval);
            return Ok(0);
        }

        if buf.is_empty() {
            return Ok(0);
        }

        let bytes = buf.len() * 2;
        if self.scratch.len() < bytes {
            self.scratch.resize(bytes, 0);
        }

        let offset = match self.carry.take() {
            Some(byte) => {
                self.scratch[0] = byte;
                1
            }
            None => 0,
        };

        let n = match self.inner.read(&mut self.scratch[offset..bytes]) {
            Ok(0) => {
                tracing::debug!("PCM client closed the stream");
                self.closed = true;
                return Ok(0);
            }
            Ok(n) => n,
            Err(e) => {
                if offset == 1 {
                    self.carry = Some(self.scratch[0]);
                }
                return Err(PcmError::Io(e));
            }
        };

        let total = offset + n;
        let samples = total / 2;
        for (sample, chunk) in buf.iter_mut().zip(self.scratch[..samples * 2].chunks_exact(2)) {
            *sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        }
        if total % 2 == 1 {
            self.carry = Some(self.scratch[total - 1]);
        }

        Ok(samples)
    }
}

/// PCM sink writing little-endian `i16` samples to a byte stream
pub struct PcmWriter<W> {
    inner: W,
    scratch: Vec<u8>,
    closed: bool,
}

impl<W: Write + Send> PcmWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
            closed: false,
        }
    }

    /// Whether the reading side has gone away
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<W: Write + Send> PcmSink for PcmWriter<W> {
    fn write(&mut self, samples: &[i16]) -> Result<usize, PcmError> {
        if self.closed {
            return Ok(0);
        }

        self.scratch.clear();
        self.scratch.reserve(samples.len() * 2);
        for sample in samples {
            self.scratch.extend_from_slice(&sample.to_le_bytes());
        }

        match self.inner.write_all(&self.scratch) {
            Ok(()) => Ok(samples.len()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("PCM client closed the stream");
                self.closed = true;
                Ok(0)
            }
            Err(e) => Err(PcmError::Io(e)),
        }
    }
}
