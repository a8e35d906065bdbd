//! LAN discovery over UDP.
//!
//! Flakes find the host by sending a datagram to the discovery port; the
//! host answers each datagram with its identity document.
//!
//! ```text
//! flake ──(any datagram / probe)──► host:7042
//! flake ◄──(identity JSON)───────── host:7042
//! ```

mod probe;
mod responder;

pub use probe::{
    DiscoveredHost, DiscoveryProbe, PROBE_TYPE, PROTOCOL_VERSION, ProbePolicy, probe,
};
pub use responder::DiscoveryResponder;

/// Largest datagram read or written by discovery.
pub const MAX_DATAGRAM: usize = 8192;
