//! Transport endpoint shared by the worker loops

pub mod endpoint;

pub use endpoint::{Endpoint, PcmEndpoint, PcmState};
