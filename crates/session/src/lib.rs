#![warn(missing_docs)]
//! Spatial session lifecycle.
//!
//! [`SessionManager`] owns the single active session, its reference space, and
//! the presentation canvases, and walks the negotiation state machine:
//!
//! ```text
//! Unvalidated -> Negotiating(mode) -> Active(mode) -> Ending -> Unvalidated
//!                      |                                           |
//!                      +-- rejected: immersive falls back to inline-+
//! ```
//!
//! Host requests complete asynchronously; the application pumps
//! [`xrinteract_core::HostEvent`]s into [`SessionManager::handle_event`].

mod failure;
mod manager;
mod state;

pub use failure::{NegotiationFailure, NegotiationStage};
pub use manager::{SessionConfig, SessionManager};
pub use state::{ActivePhase, ControlFallback, SessionSignal, SessionState};
