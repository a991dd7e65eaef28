#![warn(missing_docs)]
//! Per-scene frame loop.
//!
//! A [`FrameDriver`] keeps exactly one animation callback in flight, picks the
//! scheduler that matches the session state, renders every eye of the viewer
//! pose (or one full-surface view with no session), and hands the tick to the
//! interaction engine once.

mod driver;
mod renderer;

pub use driver::{FrameContext, FrameDriver, FrameOutcome};
pub use renderer::{FrameRenderer, SceneContent, StaticContent, ViewParams};
