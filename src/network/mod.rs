//! Bluetooth SCO link transport

pub mod sco;

pub use sco::{LinkReader, LinkWriter, ScoSocket};
