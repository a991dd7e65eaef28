//! Shared log of interaction callbacks, for asserting call order.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use tracing::debug;
use xrinteract_interaction::{default_anchor, Capabilities, InteractionBundle};

/// One recorded callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Label of the node's bundle.
    pub node: String,
    /// Callback name.
    pub event: &'static str,
    /// Transform passed to `drag`, anchor returned by `drag_start`.
    pub matrix: Option<Mat4>,
}

impl Call {
    /// `node.event`, e.g. `"A.hover_start"`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.node, self.event)
    }
}

/// Cloneable handle to a shared call list.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl CallLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn push(&self, node: &str, event: &'static str, matrix: Option<Mat4>) {
        self.calls.borrow_mut().push(Call { node: node.to_string(), event, matrix });
    }

    /// Snapshot of every call.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Every call as `node.event`.
    pub fn labels(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::label).collect()
    }

    /// Drain and return every call.
    pub fn take_calls(&self) -> Vec<Call> {
        self.calls.borrow_mut().drain(..).collect()
    }

    /// Drain and return labels.
    pub fn take_labels(&self) -> Vec<String> {
        self.calls.borrow_mut().drain(..).map(|call| call.label()).collect()
    }

    /// How often `label` was recorded.
    pub fn count(&self, label: &str) -> usize {
        self.calls.borrow().iter().filter(|call| call.label() == label).count()
    }

    /// Matrices recorded with `label`, in order.
    pub fn matrices(&self, label: &str) -> Vec<Mat4> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.label() == label)
            .filter_map(|call| call.matrix)
            .collect()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

/// Bundle defining exactly the callbacks in `caps`, each recording into `log`.
///
/// `drag_start` returns the default anchor; `drag` applies its transform.
pub fn recording_bundle(name: &str, log: &CallLog, caps: Capabilities) -> InteractionBundle {
    let mut bundle = InteractionBundle::new();
    let label = name.to_string();

    if caps.contains(Capabilities::HOVER_START) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_hover_start(move |_| log.push(&label, "hover_start", None));
    }
    if caps.contains(Capabilities::HOVER) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_hover(move |_| log.push(&label, "hover", None));
    }
    if caps.contains(Capabilities::HOVER_END) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_hover_end(move |_| log.push(&label, "hover_end", None));
    }
    if caps.contains(Capabilities::SELECT_START) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_select_start(move |_| log.push(&label, "select_start", None));
    }
    if caps.contains(Capabilities::SELECT_END) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_select_end(move |_| log.push(&label, "select_end", None));
    }
    if caps.contains(Capabilities::SELECT) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_select(move |_| log.push(&label, "select", None));
    }
    if caps.contains(Capabilities::DRAG_START) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_drag_start(move |_, pointer, world| {
            let anchor = default_anchor(pointer, world);
            log.push(&label, "drag_start", Some(anchor));
            anchor
        });
    }
    if caps.contains(Capabilities::DRAG) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_drag(move |mut ctx| {
            log.push(&label, "drag", Some(ctx.transform));
            if let Err(err) = ctx.apply() {
                debug!(%err, node = %label, "drag target vanished");
            }
        });
    }
    if caps.contains(Capabilities::DRAG_END) {
        let (log, label) = (log.clone(), label.clone());
        bundle = bundle.on_drag_end(move |_| log.push(&label, "drag_end", None));
    }
    bundle
}
