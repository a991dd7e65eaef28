#![warn(missing_docs)]
//! Raycast-driven hover, select, and drag dispatch for spatial pointers.
//!
//! Scene nodes opt into interaction by registering an [`Interactions`]
//! implementation in the engine's [`CapabilityTable`], keyed by [`NodeId`].
//! Every frame the [`InteractionEngine`] casts one ray per input source (or a
//! single pseudo-source when no device is tracked), keeps at most one hovered
//! node and one drag per source, and fires the node's callbacks in a fixed
//! order: drag update, then `hover_end` on the old target, then `hover_start`
//! and `hover` on the new one.
//!
//! [`NodeId`]: xrinteract_scene::NodeId

mod capability;
mod engine;
mod source;

pub use capability::{
    default_anchor, Capabilities, CapabilityTable, DragContext, Hit, InteractionBundle,
    Interactions,
};
pub use engine::{DragState, InteractionEngine};
pub use source::{create_ray, pseudo_ray, InputSource};
