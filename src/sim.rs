//! A deterministic in-memory host.
//!
//! `VirtualDom` models just enough of a document for target resolution:
//! elements, text, shadow roots, overflow, geometry, offsets and focus.
//! `VirtualHost` adds a clock that only moves when told to, a frame queue and
//! a timer queue. `Simulation` drives an engine over that host.

use crate::config::TimingConfig;
use crate::engine::ScrollTimingEngine;
use crate::entry::ScrollTimingEntry;
use crate::host::{
    Clock, Dom, EventTarget, FrameHandle, FrameRequest, Host, InputEvent, InputKind, NodeId,
    NodeKind, Overflow, OverflowStyle, Scheduler, ScrollEvent, ScrollGeometry, ScrollOffset,
    TimerHandle, TimerRequest, Timestamp,
};
use crate::observer::{ObserveOptions, PerformanceObserverBackend, StaticObserverBackend};
use crate::refresh_rate::VsyncSource;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct VirtualNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    shadow_host: Option<NodeId>,
    overflow: OverflowStyle,
    geometry: ScrollGeometry,
    offset: ScrollOffset,
    detached: bool,
}

impl VirtualNode {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            shadow_host: None,
            overflow: OverflowStyle::default(),
            geometry: ScrollGeometry::default(),
            offset: ScrollOffset::default(),
            detached: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualDom {
    nodes: HashMap<NodeId, VirtualNode>,
    next_id: u64,
    document: NodeId,
    html: NodeId,
    body: NodeId,
    scrolling_element: Option<NodeId>,
    focused: Option<NodeId>,
}

impl Default for VirtualDom {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDom {
    /// A document with `<html>` and `<body>`; `<html>` is the scrolling element.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: HashMap::new(),
            next_id: 1,
            document: NodeId(0),
            html: NodeId(0),
            body: NodeId(0),
            scrolling_element: None,
            focused: None,
        };
        dom.document = dom.insert(VirtualNode::new(NodeKind::Document, None));
        dom.html = dom.create_element(dom.document);
        dom.body = dom.create_element(dom.html);
        dom.scrolling_element = Some(dom.html);
        dom
    }

    fn insert(&mut self, node: VirtualNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn body_element(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, parent: NodeId) -> NodeId {
        self.insert(VirtualNode::new(NodeKind::Element, Some(parent)))
    }

    pub fn create_text(&mut self, parent: NodeId) -> NodeId {
        self.insert(VirtualNode::new(NodeKind::Text, Some(parent)))
    }

    /// Attaches a shadow root to `host` and returns the root.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        let mut root = VirtualNode::new(NodeKind::DocumentFragment, None);
        root.shadow_host = Some(host);
        self.insert(root)
    }

    /// Makes `node` a scroll container whose content overflows its box.
    pub fn make_scroll_container(&mut self, node: NodeId, overflow: Overflow, geometry: ScrollGeometry) {
        self.set_overflow(node, OverflowStyle { x: overflow, y: overflow });
        self.set_geometry(node, geometry);
    }

    pub fn set_overflow(&mut self, node: NodeId, overflow: OverflowStyle) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.overflow = overflow;
        }
    }

    pub fn set_geometry(&mut self, node: NodeId, geometry: ScrollGeometry) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.geometry = geometry;
        }
    }

    pub fn set_scroll_offset(&mut self, node: NodeId, offset: ScrollOffset) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.offset = offset;
        }
    }

    pub fn set_scrolling_element(&mut self, node: Option<NodeId>) {
        self.scrolling_element = node;
    }

    pub fn focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    /// Removes `node` and its subtree from the document.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.detached = true;
        }
        if self.focused.is_some_and(|f| !self.is_connected(f)) {
            self.focused = None;
        }
    }

    fn composed_parent(&self, node: NodeId) -> Option<NodeId> {
        let n = self.nodes.get(&node)?;
        n.parent.or(n.shadow_host)
    }

    /// Dispatch path of an event fired at `target`: the target, its
    /// ancestors across shadow boundaries, the document and the window.
    pub fn composed_path(&self, target: NodeId) -> Vec<EventTarget> {
        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            path.push(EventTarget::Node(node));
            current = self.composed_parent(node);
        }
        path.push(EventTarget::Window);
        path
    }
}

impl Dom for VirtualDom {
    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&node)?.parent?;
        match self.node_kind(parent) {
            Some(NodeKind::Element) => Some(parent),
            _ => None,
        }
    }

    fn document_element(&self) -> NodeId {
        self.html
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn scrolling_element(&self) -> Option<NodeId> {
        self.scrolling_element
    }

    fn active_element(&self) -> Option<NodeId> {
        self.focused.or(Some(self.body))
    }

    fn computed_overflow(&self, element: NodeId) -> OverflowStyle {
        self.nodes
            .get(&element)
            .map(|n| n.overflow)
            .unwrap_or_default()
    }

    fn scroll_geometry(&self, element: NodeId) -> ScrollGeometry {
        self.nodes
            .get(&element)
            .map(|n| n.geometry)
            .unwrap_or_default()
    }

    fn scroll_offset(&self, element: NodeId) -> ScrollOffset {
        self.nodes
            .get(&element)
            .map(|n| n.offset)
            .unwrap_or_default()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(n) = self.nodes.get(&id) else {
                return false;
            };
            if n.detached {
                return false;
            }
            if id == self.document {
                return true;
            }
            current = n.parent.or(n.shadow_host);
        }
        false
    }
}

/// Frame clock that ticks at a fixed interval without waiting.
#[derive(Debug, Clone)]
pub struct FixedVsync {
    next: Timestamp,
    interval: f64,
}

impl FixedVsync {
    pub fn new(start: Timestamp, interval: f64) -> Self {
        Self {
            next: start,
            interval,
        }
    }
}

impl VsyncSource for FixedVsync {
    fn next_frame(&mut self) -> Option<Timestamp> {
        let now = self.next;
        self.next += self.interval;
        Some(now)
    }
}

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    due: Timestamp,
    request: TimerRequest,
}

#[derive(Debug, Clone)]
pub struct VirtualHost {
    pub dom: VirtualDom,
    clock: Timestamp,
    next_handle: u64,
    frames: Vec<(FrameHandle, FrameRequest)>,
    timers: Vec<PendingTimer>,
    native_scroll_timing: bool,
    vsync_interval: Option<f64>,
}

impl VirtualHost {
    pub fn new(dom: VirtualDom) -> Self {
        Self {
            dom,
            clock: 0.0,
            next_handle: 1,
            frames: Vec::new(),
            timers: Vec::new(),
            native_scroll_timing: false,
            vsync_interval: None,
        }
    }

    /// Lets the host provide an isolated frame clock at `interval` ms.
    pub fn with_background_vsync(mut self, interval: f64) -> Self {
        self.vsync_interval = Some(interval);
        self
    }

    pub fn with_native_scroll_timing(mut self) -> Self {
        self.native_scroll_timing = true;
        self
    }

    /// Moves the clock forward. It never goes back.
    pub fn set_time(&mut self, time: Timestamp) {
        self.clock = self.clock.max(time);
    }

    fn next_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Everything waiting for the next frame, in request order.
    pub fn take_frame_requests(&mut self) -> Vec<FrameRequest> {
        self.frames.drain(..).map(|(_, request)| request).collect()
    }

    pub fn pending_frames(&self) -> &[(FrameHandle, FrameRequest)] {
        &self.frames
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_timer_due(&self) -> Option<Timestamp> {
        self.timers.iter().map(|t| t.due).min_by(|a, b| a.total_cmp(b))
    }

    /// Removes the earliest timer due at or before `until`. Ties go to the
    /// one set first.
    pub fn pop_due_timer(&mut self, until: Timestamp) -> Option<(Timestamp, TimerRequest)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)))
            .map(|(i, _)| i)?;
        let timer = self.timers.remove(index);
        Some((timer.due, timer.request))
    }
}

impl Clock for VirtualHost {
    fn now(&self) -> Timestamp {
        self.clock
    }
}

impl Dom for VirtualHost {
    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.dom.node_kind(node)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent_element(node)
    }

    fn document_element(&self) -> NodeId {
        self.dom.document_element()
    }

    fn body(&self) -> Option<NodeId> {
        self.dom.body()
    }

    fn scrolling_element(&self) -> Option<NodeId> {
        self.dom.scrolling_element()
    }

    fn active_element(&self) -> Option<NodeId> {
        self.dom.active_element()
    }

    fn computed_overflow(&self, element: NodeId) -> OverflowStyle {
        self.dom.computed_overflow(element)
    }

    fn scroll_geometry(&self, element: NodeId) -> ScrollGeometry {
        self.dom.scroll_geometry(element)
    }

    fn scroll_offset(&self, element: NodeId) -> ScrollOffset {
        self.dom.scroll_offset(element)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }
}

impl Scheduler for VirtualHost {
    fn request_animation_frame(&mut self, request: FrameRequest) -> FrameHandle {
        let handle = FrameHandle(self.next_handle());
        self.frames.push((handle, request));
        handle
    }

    fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|(h, _)| *h != handle);
    }

    fn set_timeout(&mut self, request: TimerRequest, delay_ms: f64) -> TimerHandle {
        let handle = TimerHandle(self.next_handle());
        self.timers.push(PendingTimer {
            handle,
            due: self.clock + delay_ms.max(0.0),
            request,
        });
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.handle != handle);
    }
}

impl Host for VirtualHost {
    fn background_vsync(&mut self) -> Option<Box<dyn VsyncSource + Send>> {
        let interval = self.vsync_interval?;
        Some(Box::new(FixedVsync::new(self.clock, interval)))
    }

    fn has_native_scroll_timing(&self) -> bool {
        self.native_scroll_timing
    }
}

pub type SharedEntries = Rc<RefCell<Vec<ScrollTimingEntry>>>;

/// Smallest interval [`Simulation::frames`] accepts.
pub const MIN_FRAME_INTERVAL_MS: f64 = 0.001;

/// How many frames `from..=until` holds at `interval`, or `None` if the
/// interval is too small to advance the clock.
pub fn frame_count(from: Timestamp, until: Timestamp, interval: f64) -> Option<u64> {
    if interval.is_nan() || interval < MIN_FRAME_INTERVAL_MS || !from.is_finite() || !until.is_finite() {
        return None;
    }
    if until < from {
        return Some(0);
    }
    Some(((until - from) / interval).floor() as u64 + 1)
}

/// Drives an engine over a [`VirtualHost`] in time order.
pub struct Simulation<B = StaticObserverBackend> {
    engine: ScrollTimingEngine<VirtualHost, B>,
}

impl Simulation<StaticObserverBackend> {
    pub fn with_dom(dom: VirtualDom, config: TimingConfig) -> Self {
        Self::new(ScrollTimingEngine::new(
            VirtualHost::new(dom),
            StaticObserverBackend::default(),
            config,
        ))
    }
}

impl<B: PerformanceObserverBackend> Simulation<B> {
    pub fn new(engine: ScrollTimingEngine<VirtualHost, B>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ScrollTimingEngine<VirtualHost, B> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ScrollTimingEngine<VirtualHost, B> {
        &mut self.engine
    }

    pub fn dom(&self) -> &VirtualDom {
        &self.engine.host().dom
    }

    pub fn dom_mut(&mut self) -> &mut VirtualDom {
        &mut self.engine.host_mut().dom
    }

    pub fn now(&self) -> Timestamp {
        self.engine.host().now()
    }

    /// Subscribes a collecting observer to scroll entries.
    pub fn record_entries(&mut self) -> SharedEntries {
        let entries: SharedEntries = Rc::new(RefCell::new(Vec::new()));
        let sink = entries.clone();
        let id = self.engine.create_observer(Box::new(move |list| {
            sink.borrow_mut().extend(list.get_entries().iter().cloned());
        }));
        // A scroll request is never rejected by the adapter.
        let _ = self.engine.observe(id, &ObserveOptions::of_type("scroll"));
        entries
    }

    /// Fires every timer due up to `time`, in due order, then sets the clock.
    pub fn advance_to(&mut self, time: Timestamp) {
        while let Some((due, request)) = self.engine.host_mut().pop_due_timer(time) {
            self.engine.host_mut().set_time(due);
            self.engine.handle_timer(request);
        }
        self.engine.host_mut().set_time(time);
    }

    /// Presents one frame at `time`, running callbacks requested before it.
    pub fn frame(&mut self, time: Timestamp) {
        self.advance_to(time);
        let requests = self.engine.host_mut().take_frame_requests();
        for request in requests {
            self.engine.handle_frame(request, time);
        }
    }

    /// Presents frames from `from` through `until` every `interval` ms.
    /// Intervals below [`MIN_FRAME_INTERVAL_MS`] present nothing.
    pub fn frames(&mut self, from: Timestamp, until: Timestamp, interval: f64) {
        let Some(count) = frame_count(from, until, interval) else {
            return;
        };
        for i in 0..count {
            self.frame(from + i as f64 * interval);
        }
    }

    fn input(&mut self, time: Timestamp, kind: InputKind, target: Option<NodeId>) {
        self.advance_to(time);
        let event = InputEvent {
            kind,
            target: target.map(EventTarget::Node),
            composed_path: target.map(|t| self.dom().composed_path(t)),
        };
        self.engine.handle_input(&event);
    }

    pub fn wheel(&mut self, time: Timestamp, target: NodeId) {
        self.input(time, InputKind::Wheel, Some(target));
    }

    pub fn touch_start(&mut self, time: Timestamp, target: NodeId) {
        self.input(time, InputKind::TouchStart, Some(target));
    }

    pub fn touch_move(&mut self, time: Timestamp, target: NodeId) {
        self.input(time, InputKind::TouchMove, Some(target));
    }

    pub fn key_down(&mut self, time: Timestamp, key: &str) {
        let focused = self.dom().focused;
        self.input(
            time,
            InputKind::KeyDown {
                key: key.to_string(),
            },
            focused,
        );
    }

    pub fn focus(&mut self, time: Timestamp, node: Option<NodeId>) {
        self.advance_to(time);
        self.dom_mut().focus(node);
    }

    pub fn hint(&mut self, time: Timestamp, target: Option<NodeId>, source: &str) {
        self.advance_to(time);
        self.engine
            .record_hint(target.map(EventTarget::Node), source);
    }

    /// Moves `element` to `offset` and fires a scroll event at it.
    pub fn scroll_to(&mut self, time: Timestamp, element: NodeId, offset: ScrollOffset) {
        self.advance_to(time);
        self.dom_mut().set_scroll_offset(element, offset);
        self.engine.handle_scroll(&ScrollEvent {
            target: Some(EventTarget::Node(element)),
        });
    }

    /// Fires a scroll event at an arbitrary target without moving anything.
    pub fn scroll_event(&mut self, time: Timestamp, target: Option<EventTarget>) {
        self.advance_to(time);
        self.engine.handle_scroll(&ScrollEvent { target });
    }

    pub fn detach(&mut self, time: Timestamp, node: NodeId) {
        self.advance_to(time);
        self.dom_mut().detach(node);
    }

    pub fn sweep(&mut self, time: Timestamp) -> usize {
        self.advance_to(time);
        self.engine.sweep_detached()
    }

    /// Fires timers until none are left. Frames are never presented here,
    /// so gestures end with whatever frames they already saw.
    pub fn run_until_idle(&mut self) {
        while let Some(due) = self.engine.host().next_timer_due() {
            self.advance_to(due);
        }
    }
}
