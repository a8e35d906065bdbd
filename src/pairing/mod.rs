//! Flake pairing.
//!
//! A flake's preboot agent files a pairing request with the host; an
//! operator approves or dismisses it; approval is confirmed back to the
//! preboot before the request is considered done.

pub mod clock;
pub mod confirm;
mod registry;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use confirm::{PREBOOT_APPROVE_PATH, PrebootConfirmer, RemoteConfirmer};
pub use registry::{PairingEvent, PairingRegistry};
pub use types::{
    ApproveOutcome, DEFAULT_MESSAGE, PairingNotice, PairingRequest, PairingStatus, PairingSummary,
};
