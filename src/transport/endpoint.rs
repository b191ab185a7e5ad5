//! Transport PCM endpoint
//!
//! The endpoint is the object both worker loops of a session share with
//! the rest of the system. The loops only read its status (MTU, activity)
//! and publish to it (running state, processing delay); every field is an
//! independent atomic, so reads may be stale and writes are plain stores.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{BridgeConfig, MAX_VOLUME};

/// Contract the worker loops depend on
pub trait Endpoint: Send + Sync {
    /// Maximum payload of one link write
    fn mtu_write(&self) -> usize;

    /// Mark the endpoint's worker as running
    fn set_running(&self);

    /// Whether a consumer is attached to the PCM side
    fn is_active(&self) -> bool;

    /// Ask the transport to stop if no PCM client is connected
    fn stop_if_no_clients(&self);

    /// Publish the processing delay, in units of 0.1 ms
    fn set_delay(&self, delay: u32);

    /// Apply volume to decoded samples in place
    fn scale(&self, _samples: &mut [i16]) {}

    /// Worker exit hook, run once per worker exit
    fn cleanup(&self);
}

impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    fn mtu_write(&self) -> usize {
        (**self).mtu_write()
    }

    fn set_running(&self) {
        (**self).set_running()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn stop_if_no_clients(&self) {
        (**self).stop_if_no_clients()
    }

    fn set_delay(&self, delay: u32) {
        (**self).set_delay(delay)
    }

    fn scale(&self, samples: &mut [i16]) {
        (**self).scale(samples)
    }

    fn cleanup(&self) {
        (**self).cleanup()
    }
}

/// Lifecycle state of an endpoint's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PcmState {
    Idle = 0,
    Running = 1,
    Paused = 2,
    Terminated = 3,
}

impl PcmState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PcmState::Running,
            2 => PcmState::Paused,
            3 => PcmState::Terminated,
            _ => PcmState::Idle,
        }
    }
}

type TerminateHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Atomics-backed endpoint
pub struct PcmEndpoint {
    name: String,
    mtu_write: AtomicUsize,
    state: AtomicU8,
    active: AtomicBool,
    clients: AtomicUsize,
    delay: AtomicU32,
    volume: AtomicU8,
    muted: AtomicBool,
    stop_requested: AtomicBool,
    cleanups: AtomicUsize,
    on_terminate: Mutex<Vec<TerminateHook>>,
}

impl PcmEndpoint {
    /// Create an endpoint with the given write MTU and no clients
    pub fn new(name: impl Into<String>, mtu_write: usize) -> Self {
        Self {
            name: name.into(),
            mtu_write: AtomicUsize::new(mtu_write),
            state: AtomicU8::new(PcmState::Idle as u8),
            active: AtomicBool::new(false),
            clients: AtomicUsize::new(0),
            delay: AtomicU32::new(0),
            volume: AtomicU8::new(MAX_VOLUME),
            muted: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            cleanups: AtomicUsize::new(0),
            on_terminate: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &BridgeConfig) -> Self {
        let endpoint = Self::new(name, config.sco.mtu);
        endpoint.set_volume(config.pcm.volume);
        endpoint.set_muted(config.pcm.muted);
        endpoint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish the negotiated write MTU
    ///
    /// Workers read the MTU once when they start; running ones keep theirs.
    pub fn set_mtu_write(&self, mtu: usize) {
        self.mtu_write.store(mtu, Ordering::Relaxed);
    }

    pub fn state(&self) -> PcmState {
        PcmState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Register a PCM client; the endpoint becomes active
    pub fn attach_client(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
        self.stop_requested.store(false, Ordering::Relaxed);
        self.active.store(true, Ordering::Relaxed);
    }

    /// Unregister a PCM client; the last one leaving deactivates the endpoint
    pub fn detach_client(&self) {
        let previous = self
            .clients
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous <= 1 {
            self.active.store(false, Ordering::Relaxed);
        }
    }

    pub fn clients(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    /// Pause the PCM: the decoder discards link data while paused
    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
        if self.state() == PcmState::Running {
            self.state.store(PcmState::Paused as u8, Ordering::Relaxed);
        }
    }

    pub fn resume(&self) {
        if self.clients() > 0 {
            self.active.store(true, Ordering::Relaxed);
        }
        if self.state() == PcmState::Paused {
            self.state.store(PcmState::Running as u8, Ordering::Relaxed);
        }
    }

    /// Last published processing delay, in units of 0.1 ms
    pub fn delay(&self) -> u32 {
        self.delay.load(Ordering::Relaxed)
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: u8) {
        self.volume.store(volume.min(MAX_VOLUME), Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Whether a worker asked for the transport to stop
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Number of worker exits seen
    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::Relaxed)
    }

    /// Run `hook` with the endpoint name whenever a worker exits
    pub fn on_terminate<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_terminate.lock().push(Arc::new(hook));
    }
}

impl Endpoint for PcmEndpoint {
    fn mtu_write(&self) -> usize {
        self.mtu_write.load(Ordering::Relaxed)
    }

    fn set_running(&self) {
        self.state.store(PcmState::Running as u8, Ordering::Relaxed);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn stop_if_no_clients(&self) {
        if self.clients() > 0 {
            return;
        }
        if !self.stop_requested.swap(true, Ordering::Relaxed) {
            tracing::info!("{}: no PCM clients, requesting transport stop", self.name);
        }
    }

    fn set_delay(&self, delay: u32) {
        self.delay.store(delay, Ordering::Relaxed);
    }

    fn scale(&self, samples: &mut [i16]) {
        if self.is_muted() {
            samples.fill(0);
            return;
        }
        let volume = i32::from(self.volume());
        if volume == i32::from(MAX_VOLUME) {
            return;
        }
        for sample in samples {
            *sample = (i32::from(*sample) * volume / i32::from(MAX_VOLUME)) as i16;
        }
    }

    fn cleanup(&self) {
        self.state.store(PcmState::Terminated as u8, Ordering::Relaxed);
        self.cleanups.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("{}: worker cleanup", self.name);
        // hooks run unlocked, so they may register further hooks
        let hooks = self.on_terminate.lock().clone();
        for hook in hooks {
            hook(&self.name);
        }
    }
}
