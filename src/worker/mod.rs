//! SCO mSBC worker threads
//!
//! Each active SCO session runs two long-lived threads: the encoder
//! (PCM → mSBC → link) and the decoder (link → mSBC → PCM). They share
//! nothing but the transport [`Endpoint`]. Whatever way a worker loop
//! ends, its codec session is finalized and the endpoint's cleanup hook
//! runs, in that order.

pub mod decoder;
pub mod encoder;

pub use decoder::run_decoder;
pub use encoder::run_encoder;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};

use crate::audio::pcm::{PcmSink, PcmSource};
use crate::codec::SbcCodec;
use crate::network::sco::{LinkReader, LinkWriter};
use crate::transport::Endpoint;

/// Cooperative cancellation flag, polled at the top of every iteration
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why a worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Cancellation was requested
    Cancelled,
    /// The codec session could not be (re)initialized
    InitFailed,
    /// The link reported end-of-stream or a zero-length write
    LinkClosed,
    /// A link write failed
    LinkError,
}

/// Runs the endpoint's cleanup hook when the worker loop is left
struct CleanupGuard<'a, E: Endpoint + ?Sized> {
    endpoint: &'a E,
    name: &'static str,
}

impl<'a, E: Endpoint + ?Sized> CleanupGuard<'a, E> {
    fn new(endpoint: &'a E, name: &'static str) -> Self {
        Self { endpoint, name }
    }
}

impl<E: Endpoint + ?Sized> Drop for CleanupGuard<'_, E> {
    fn drop(&mut self) {
        tracing::debug!("{}: EXIT", self.name);
        self.endpoint.cleanup();
    }
}

/// Handle to a running worker thread
///
/// Dropping the handle cancels the worker and joins it.
pub struct WorkerHandle {
    name: String,
    cancel: CancelToken,
    thread: Option<JoinHandle<ExitReason>>,
    exited: Receiver<ExitReason>,
}

impl WorkerHandle {
    fn spawn<F>(name: &str, cancel: CancelToken, body: F) -> io::Result<Self>
    where
        F: FnOnce() -> ExitReason + Send + 'static,
    {
        let (exit_tx, exit_rx) = bounded::<ExitReason>(1);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let reason = body();
                let _ = exit_tx.send(reason);
                reason
            })?;

        Ok(Self {
            name: name.to_string(),
            cancel,
            thread: Some(thread),
            exited: exit_rx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request cancellation without waiting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait up to `timeout` for the worker to end on its own
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExitReason> {
        self.exited.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel the worker and join it
    ///
    /// Returns `None` if the worker panicked or was already joined.
    pub fn stop(&mut self) -> Option<ExitReason> {
        self.cancel.cancel();
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(reason) => Some(reason),
            Err(_) => {
                tracing::error!("{}: worker panicked", self.name);
                None
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the encoder thread of a session
pub fn spawn_encoder<E, C, S, L>(
    endpoint: Arc<E>,
    codec: C,
    mut source: S,
    mut link: L,
) -> io::Result<WorkerHandle>
where
    E: Endpoint + ?Sized + 'static,
    C: SbcCodec + 'static,
    S: PcmSource + 'static,
    L: LinkWriter + 'static,
{
    let cancel = CancelToken::new();
    let token = cancel.clone();
    WorkerHandle::spawn("sco-msbc-enc", cancel, move || {
        run_encoder(&*endpoint, codec, &mut source, &mut link, &token)
    })
}

/// Spawn the decoder thread of a session
pub fn spawn_decoder<E, C, L, K>(
    endpoint: Arc<E>,
    codec: C,
    mut link: L,
    mut sink: K,
) -> io::Result<WorkerHandle>
where
    E: Endpoint + ?Sized + 'static,
    C: SbcCodec + 'static,
    L: LinkReader + 'static,
    K: PcmSink + 'static,
{
    let cancel = CancelToken::new();
    let token = cancel.clone();
    WorkerHandle::spawn("sco-msbc-dec", cancel, move || {
        run_decoder(&*endpoint, codec, &mut link, &mut sink, &token)
    })
}

/// Both worker threads of one SCO session
pub struct SessionWorkers {
    pub encoder: WorkerHandle,
    pub decoder: WorkerHandle,
}

impl SessionWorkers {
    /// Start the encoder and decoder over one link
    ///
    /// Each direction gets its own codec instance and its own handle on
    /// the link.
    pub fn start<E, C, S, K, L>(
        encoder_endpoint: Arc<E>,
        decoder_endpoint: Arc<E>,
        codecs: (C, C),
        source: S,
        sink: K,
        link: L,
    ) -> io::Result<Self>
    where
        E: Endpoint + ?Sized + 'static,
        C: SbcCodec + 'static,
        S: PcmSource + 'static,
        K: PcmSink + 'static,
        L: LinkReader + LinkWriter + TryCloneLink + 'static,
    {
        let (encoder_codec, decoder_codec) = codecs;
        let link_tx = link.try_clone_link()?;
        let encoder = spawn_encoder(encoder_endpoint, encoder_codec, source, link_tx)?;
        let decoder = spawn_decoder(decoder_endpoint, decoder_codec, link, sink)?;
        tracing::info!("SCO mSBC session workers started");
        Ok(Self { encoder, decoder })
    }

    /// Cancel and join both workers
    pub fn stop(mut self) -> (Option<ExitReason>, Option<ExitReason>) {
        self.encoder.cancel();
        self.decoder.cancel();
        (self.encoder.stop(), self.decoder.stop())
    }
}

/// Links that can hand out a second handle for the other direction
pub trait TryCloneLink: Sized {
    fn try_clone_link(&self) -> io::Result<Self>;
}

impl TryCloneLink for crate::network::sco::ScoSocket {
    fn try_clone_link(&self) -> io::Result<Self> {
        self.try_clone()
    }
}
