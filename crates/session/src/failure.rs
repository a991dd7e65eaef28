//! Typed negotiation failures feeding the fallback chain.

use thiserror::Error;
use xrinteract_core::{HostError, SessionMode};

/// Step of session negotiation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationStage {
    /// The host does not expose the mode (or any XR API).
    Capability,
    /// The session request itself was rejected.
    SessionRequest,
    /// The rendering context could not be made compatible.
    Compatibility,
    /// No reference space could be acquired.
    ReferenceSpace,
}

/// A failed negotiation step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{mode} negotiation failed at {stage:?}: {reason}")]
pub struct NegotiationFailure {
    /// Mode being negotiated.
    pub mode: SessionMode,
    /// Step that failed.
    pub stage: NegotiationStage,
    /// Host-reported cause.
    pub reason: HostError,
}

impl NegotiationFailure {
    /// Build a failure record.
    pub fn new(mode: SessionMode, stage: NegotiationStage, reason: HostError) -> Self {
        Self { mode, stage, reason }
    }

    /// Whether the failure leaves the session usable.
    ///
    /// A compatibility failure is logged but the session keeps going.
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self.stage, NegotiationStage::Compatibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_mode_and_stage() {
        let failure = NegotiationFailure::new(
            SessionMode::ImmersiveVr,
            NegotiationStage::SessionRequest,
            HostError::Rejected("user declined".into()),
        );
        let message = failure.to_string();
        assert!(message.contains("immersive-vr"));
        assert!(message.contains("SessionRequest"));
        assert!(message.contains("user declined"));
        assert!(failure.is_fatal_to_session());
    }

    #[test]
    fn compatibility_failures_are_not_fatal() {
        let failure = NegotiationFailure::new(
            SessionMode::Inline,
            NegotiationStage::Compatibility,
            HostError::NotCompatible("lost context".into()),
        );
        assert!(!failure.is_fatal_to_session());
    }
}
