//! Session state machine values.

use xrinteract_core::{FrameScheduler, SessionHandle, SessionMode};

/// Progress of an active session through render-target binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivePhase {
    /// Waiting for the rendering context to become device compatible.
    BindingRenderTarget,
    /// Waiting for a reference space.
    AcquiringReferenceSpace,
    /// Fully set up; frames can be rendered.
    Ready,
}

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No session and none requested.
    #[default]
    Unvalidated,
    /// A session request is in flight.
    Negotiating(SessionMode),
    /// A session is granted.
    Active {
        /// Session mode.
        mode: SessionMode,
        /// Host handle.
        session: SessionHandle,
        /// Setup progress.
        phase: ActivePhase,
    },
    /// `end_session` was issued; waiting for the host to confirm.
    Ending {
        /// Session mode.
        mode: SessionMode,
        /// Host handle.
        session: SessionHandle,
    },
}

impl SessionState {
    /// Handle of the live session, if any.
    pub fn session(&self) -> Option<SessionHandle> {
        match self {
            SessionState::Active { session, .. } | SessionState::Ending { session, .. } => Some(*session),
            _ => None,
        }
    }

    /// Mode of the live or requested session.
    pub fn mode(&self) -> Option<SessionMode> {
        match self {
            SessionState::Unvalidated => None,
            SessionState::Negotiating(mode) => Some(*mode),
            SessionState::Active { mode, .. } | SessionState::Ending { mode, .. } => Some(*mode),
        }
    }

    /// Whether a session exists or is being negotiated.
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionState::Unvalidated)
    }

    /// Scheduler frame drivers should request callbacks from.
    pub fn frame_scheduler(&self) -> FrameScheduler {
        match self.session() {
            Some(session) => FrameScheduler::Session(session),
            None => FrameScheduler::Host,
        }
    }
}

/// How the user interacts when no immersive session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlFallback {
    /// Nothing decided yet.
    #[default]
    None,
    /// Inline sessions work; on-screen touch controls are shown.
    TouchControls,
    /// No XR session at all; keyboard and mouse drive the pseudo-pointer.
    ManualPointer,
}

/// Notifications the manager emits for the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSignal {
    /// Every frame driver must cancel its pending callback and reschedule.
    RestartFrameLoop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_follows_session() {
        assert_eq!(SessionState::Unvalidated.frame_scheduler(), FrameScheduler::Host);
        assert_eq!(
            SessionState::Negotiating(SessionMode::Inline).frame_scheduler(),
            FrameScheduler::Host
        );
        let active = SessionState::Active {
            mode: SessionMode::ImmersiveVr,
            session: SessionHandle(4),
            phase: ActivePhase::Ready,
        };
        assert_eq!(active.frame_scheduler(), FrameScheduler::Session(SessionHandle(4)));
        assert_eq!(active.mode(), Some(SessionMode::ImmersiveVr));
        assert!(active.is_busy());
        assert!(!SessionState::Unvalidated.is_busy());
    }
}
