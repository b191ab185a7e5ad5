//! # mSBC SCO Bridge
//!
//! Bidirectional mSBC (wideband speech) codec workers for Bluetooth SCO
//! links.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LOCAL PCM ENDPOINT                        │
//! │     capture FIFO (PcmReader)           playback FIFO (PcmWriter) │
//! └───────────────┬──────────────────────────────────▲───────────────┘
//!                 │ 16 kHz s16le                     │ 16 kHz s16le
//!                 ▼                                  │
//! ┌───────────────────────────────┐  ┌───────────────┴───────────────┐
//! │  Encoder thread (worker)      │  │  Decoder thread (worker)      │
//! │  PcmBuffer ─► SBC ─► H2 frame │  │  H2 resync ─► SBC ─► PcmBuffer│
//! │  DataBuffer ─► MTU chunks     │  │  DataBuffer ◄─ link packets   │
//! │  PacingClock (16 kHz)         │  │  volume scaling               │
//! └───────────────┬───────────────┘  └───────────────▲───────────────┘
//!                 │ eSCO packets (60 byte frames)    │
//!                 ▼                                  │
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     SCO socket (network::sco)                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both threads share a [`transport::Endpoint`] and nothing else. Each
//! owns an [`codec::MsbcSession`] that is finalized, followed by the
//! endpoint's cleanup hook, however the worker ends.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
