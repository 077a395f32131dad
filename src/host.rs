//! Interfaces the engine consumes from its environment.
//!
//! The engine never touches a real document or frame clock directly. A host
//! implements these traits and feeds events back through
//! [`ScrollTimingEngine`](crate::engine::ScrollTimingEngine); scheduled work is
//! identified by plain request tokens that the host hands back when it fires.

use crate::refresh_rate::VsyncSource;
use serde::{Deserialize, Serialize};

/// Milliseconds on the host's monotonic clock.
pub type Timestamp = f64;

/// Identity of a DOM node. Equality is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Document,
    /// Shadow roots and other fragments.
    DocumentFragment,
    Other,
}

/// Anything an event can report as its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Node(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Auto,
    Scroll,
    Overlay,
}

impl Overflow {
    pub fn allows_scrolling(self) -> bool {
        matches!(self, Overflow::Auto | Overflow::Scroll | Overflow::Overlay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverflowStyle {
    pub x: Overflow,
    pub y: Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollGeometry {
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub client_width: f64,
    pub client_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub top: f64,
    pub left: f64,
}

impl ScrollOffset {
    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }
}

pub trait Clock {
    fn now(&self) -> Timestamp;
}

pub trait Dom {
    /// `None` for identities the document does not know about.
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;
    /// Light-tree parent, only if it is an element. Shadow roots have none.
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;
    fn document_element(&self) -> NodeId;
    fn body(&self) -> Option<NodeId>;
    fn scrolling_element(&self) -> Option<NodeId>;
    fn active_element(&self) -> Option<NodeId>;
    fn computed_overflow(&self, element: NodeId) -> OverflowStyle;
    fn scroll_geometry(&self, element: NodeId) -> ScrollGeometry;
    fn scroll_offset(&self, element: NodeId) -> ScrollOffset;
    fn is_connected(&self, node: NodeId) -> bool;
}

/// Identifies one gesture on one target. A new gesture on the same target
/// gets a new id, so callbacks left over from the previous one are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRequest {
    RefreshRateSample,
    Gesture { target: NodeId, gesture: GestureId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerRequest {
    QuietTimeout { target: NodeId, gesture: GestureId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

pub trait Scheduler {
    /// Runs `request` once, when the next frame is about to be presented.
    fn request_animation_frame(&mut self, request: FrameRequest) -> FrameHandle;
    fn cancel_animation_frame(&mut self, handle: FrameHandle);
    fn set_timeout(&mut self, request: TimerRequest, delay_ms: f64) -> TimerHandle;
    fn clear_timeout(&mut self, handle: TimerHandle);
}

pub trait Host: Clock + Dom + Scheduler {
    /// Frame source of an isolated scheduling context, unaffected by
    /// main-thread load. `None` if the environment cannot provide one.
    fn background_vsync(&mut self) -> Option<Box<dyn VsyncSource + Send>>;

    /// True when the environment already reports scroll timing natively.
    fn has_native_scroll_timing(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Wheel,
    TouchStart,
    TouchMove,
    KeyDown { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub target: Option<EventTarget>,
    /// Full dispatch path including shadow-tree boundaries, innermost first.
    pub composed_path: Option<Vec<EventTarget>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub target: Option<EventTarget>,
}
