//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::pcm::{PcmSink, PcmSource};
use crate::codec::{SbcCodec, MSBC_CODESAMPLES, MSBC_FRAMELEN, MSBC_SYNCWORD};
use crate::error::{CodecError, PcmError};
use crate::network::sco::{LinkReader, LinkWriter};
use crate::transport::Endpoint;
use crate::worker::CancelToken;

/// Lifecycle counters of a [`TestCodec`]
#[derive(Debug, Clone, Default)]
pub struct CodecStats {
    resets: Arc<AtomicUsize>,
    finishes: Arc<AtomicUsize>,
}

impl CodecStats {
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn finishes(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }
}

/// Lossy stand-in for the SBC transform
///
/// Keeps the high byte of every other sample, so the frame layout and
/// block sizes match mSBC while the audio is only roughly preserved.
pub struct TestCodec {
    stats: CodecStats,
    fail_reset: bool,
    fail_encode: bool,
    fail_decode: bool,
}

impl TestCodec {
    pub fn new() -> Self {
        Self {
            stats: CodecStats::default(),
            fail_reset: false,
            fail_encode: false,
            fail_decode: false,
        }
    }

    pub fn failing_reset() -> Self {
        Self {
            fail_reset: true,
            ..Self::new()
        }
    }

    pub fn stats(&self) -> CodecStats {
        self.stats.clone()
    }

    pub fn fail_next_encode(&mut self) {
        self.fail_encode = true;
    }

    pub fn fail_next_decode(&mut self) {
        self.fail_decode = true;
    }
}

impl SbcCodec for TestCodec {
    fn reset(&mut self) -> Result<(), CodecError> {
        self.stats.resets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reset {
            return Err(CodecError::Init("test codec refused to start".into()));
        }
        Ok(())
    }

    fn encode(&mut self, pcm: &[i16], frame: &mut [u8]) -> Result<usize, CodecError> {
        if std::mem::take(&mut self.fail_encode) {
            return Err(CodecError::EncodingFailed("injected".into()));
        }
        if pcm.len() != MSBC_CODESAMPLES {
            return Err(CodecError::InvalidFrameSize(pcm.len()));
        }
        frame[0] = MSBC_SYNCWORD;
        for (i, byte) in frame[1..MSBC_FRAMELEN].iter_mut().enumerate() {
            *byte = (pcm[i * 2] >> 8) as u8;
        }
        Ok(MSBC_FRAMELEN)
    }

    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<usize, CodecError> {
        if std::mem::take(&mut self.fail_decode) {
            return Err(CodecError::DecodingFailed("injected".into()));
        }
        if frame.first() != Some(&MSBC_SYNCWORD) {
            return Err(CodecError::SyncLost);
        }
        for (i, sample) in pcm[..MSBC_CODESAMPLES].iter_mut().enumerate() {
            let byte = frame[1 + (i / 2).min(MSBC_FRAMELEN - 2)];
            *sample = i16::from(byte as i8) << 8;
        }
        Ok(MSBC_CODESAMPLES)
    }

    fn finish(&mut self) {
        self.stats.finishes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted result of one PCM read
pub enum PcmStep {
    /// Read this many samples of a ramp signal
    Samples(usize),
    Zero,
    Stale,
    Error,
}

/// PCM source replaying a script; reads zero once the script runs out
pub struct ScriptedPcm {
    steps: VecDeque<PcmStep>,
    reads: Arc<AtomicUsize>,
    consumed: Arc<AtomicUsize>,
    next: i16,
    done: Option<CancelToken>,
}

impl ScriptedPcm {
    pub fn new(steps: Vec<PcmStep>) -> Self {
        Self {
            steps: steps.into(),
            reads: Arc::new(AtomicUsize::new(0)),
            consumed: Arc::new(AtomicUsize::new(0)),
            next: 0,
            done: None,
        }
    }

    /// Cancel `token` once the script is exhausted
    pub fn cancel_when_done(mut self, token: &CancelToken) -> Self {
        self.done = Some(token.clone());
        self
    }

    /// Number of read calls made so far
    pub fn reads(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }

    /// Number of samples handed out so far
    pub fn consumed(&self) -> Arc<AtomicUsize> {
        self.consumed.clone()
    }
}

impl PcmSource for ScriptedPcm {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, PcmError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(PcmStep::Samples(n)) => {
                let n = n.min(buf.len());
                for sample in &mut buf[..n] {
                    *sample = self.next;
                    self.next = self.next.wrapping_add(97);
                }
                self.consumed.fetch_add(n, Ordering::SeqCst);
                Ok(n)
            }
            Some(PcmStep::Stale) => Err(PcmError::Stale),
            Some(PcmStep::Error) => Err(PcmError::Io(io::Error::other("injected"))),
            Some(PcmStep::Zero) => Ok(0),
            None => {
                if let Some(token) = &self.done {
                    token.cancel();
                }
                Ok(0)
            }
        }
    }
}

/// PCM sink collecting everything written to it
#[derive(Clone, Default)]
pub struct CollectingPcm {
    samples: Arc<Mutex<Vec<i16>>>,
    /// Accept nothing (no consumer attached)
    refuse: Arc<AtomicBool>,
    /// Accept at most this many samples per write
    limit: Option<usize>,
}

impl CollectingPcm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let sink = Self::new();
        sink.refuse.store(true, Ordering::SeqCst);
        sink
    }

    /// Sink doing short writes of at most `limit` samples
    pub fn limited(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn samples(&self) -> Vec<i16> {
        self.samples.lock().clone()
    }
}

impl PcmSink for CollectingPcm {
    fn write(&mut self, samples: &[i16]) -> Result<usize, PcmError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let n = self.limit.map_or(samples.len(), |limit| limit.min(samples.len()));
        self.samples.lock().extend_from_slice(&samples[..n]);
        Ok(n)
    }
}

/// Link writer recording every packet, optionally failing
#[derive(Clone, Default)]
pub struct RecordingLink {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Number of writes to accept before failing, if limited
    fail_after: Option<usize>,
    /// Fail with an error instead of a zero-length write
    fail_with_error: bool,
    attempts: Arc<AtomicUsize>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` writes, then report a zero-length write
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Accept `n` writes, then report a write error
    pub fn erroring_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            fail_with_error: true,
            ..Self::default()
        }
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl LinkWriter for RecordingLink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| attempt >= n) {
            if self.fail_with_error {
                return Err(io::Error::from(io::ErrorKind::ConnectionReset));
            }
            return Ok(0);
        }
        self.packets.lock().push(data.to_vec());
        Ok(data.len())
    }
}

/// Scripted result of one link read
pub enum LinkStep {
    Packet(Vec<u8>),
    Error,
    TimedOut,
}

/// Link reader replaying a script; reports end-of-stream once it runs out
pub struct ScriptedLink {
    steps: VecDeque<LinkStep>,
}

impl ScriptedLink {
    pub fn new(steps: Vec<LinkStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Steps not consumed yet
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Split a byte stream into packets of `mtu` bytes
    pub fn packets(stream: &[u8], mtu: usize) -> Self {
        Self::new(
            stream
                .chunks(mtu)
                .map(|chunk| LinkStep::Packet(chunk.to_vec()))
                .collect(),
        )
    }
}

impl LinkReader for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(LinkStep::Packet(packet)) => {
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                Ok(n)
            }
            Some(LinkStep::Error) => Err(io::Error::other("injected")),
            Some(LinkStep::TimedOut) => Err(io::Error::from(io::ErrorKind::TimedOut)),
            None => Ok(0),
        }
    }
}

/// Endpoint counting every call the worker loops make
pub struct TestEndpoint {
    mtu: usize,
    /// MTU reported from the second query on, if it changes
    grown_mtu: Option<usize>,
    mtu_reads: AtomicUsize,
    active: AtomicBool,
    running: AtomicBool,
    delay: AtomicU32,
    delay_updates: AtomicUsize,
    stop_checks: AtomicUsize,
    cleanups: AtomicUsize,
}

impl TestEndpoint {
    pub fn new(mtu: usize) -> Arc<Self> {
        Arc::new(Self {
            mtu,
            grown_mtu: None,
            mtu_reads: AtomicUsize::new(0),
            active: AtomicBool::new(true),
            running: AtomicBool::new(false),
            delay: AtomicU32::new(0),
            delay_updates: AtomicUsize::new(0),
            stop_checks: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        })
    }

    /// Endpoint reporting `mtu` once, then `grown` on every later query
    pub fn with_mtu_growth(mtu: usize, grown: usize) -> Arc<Self> {
        let mut endpoint = Self::new(mtu);
        if let Some(inner) = Arc::get_mut(&mut endpoint) {
            inner.grown_mtu = Some(grown);
        }
        endpoint
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn delay_updates(&self) -> usize {
        self.delay_updates.load(Ordering::SeqCst)
    }

    pub fn stop_checks(&self) -> usize {
        self.stop_checks.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

impl Endpoint for TestEndpoint {
    fn mtu_write(&self) -> usize {
        let reads = self.mtu_reads.fetch_add(1, Ordering::SeqCst);
        match self.grown_mtu {
            Some(grown) if reads > 0 => grown,
            _ => self.mtu,
        }
    }

    fn set_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop_if_no_clients(&self) {
        self.stop_checks.fetch_add(1, Ordering::SeqCst);
    }

    fn set_delay(&self, delay: u32) {
        self.delay.store(delay, Ordering::SeqCst);
        self.delay_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}
