//! The scroll-timing coordinator.
//!
//! Owns every piece of mutable state: the active-gesture table, the hint
//! tables, the refresh-rate estimator and the observer registry. The host
//! delivers DOM events, frame callbacks and timeouts; everything runs to
//! completion on the caller's thread.

use crate::active_scroll::ActiveScroll;
use crate::config::TimingConfig;
use crate::entry::ScrollTimingEntry;
use crate::error::StResult;
use crate::hints::InputHintCorrelator;
use crate::host::{
    EventTarget, FrameHandle, FrameRequest, GestureId, Host, InputEvent, InputKind, NodeId,
    ScrollEvent, TimerRequest, Timestamp,
};
use crate::observer::{
    ObserveOptions, ObserverCallback, ObserverId, PerformanceObserverBackend,
    ScrollObserverAdapter,
};
use crate::refresh_rate::{RefreshRateEstimator, RefreshRates};
use crate::source::ScrollSource;
use crate::target;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct ScrollTimingEngine<H, B> {
    host: H,
    config: TimingConfig,
    rates: RefreshRateEstimator,
    hints: InputHintCorrelator,
    active: HashMap<NodeId, ActiveScroll>,
    observers: ScrollObserverAdapter<B>,
    next_gesture: u64,
    refresh_frame: Option<FrameHandle>,
    emitted: u64,
}

impl<H: Host, B: PerformanceObserverBackend> ScrollTimingEngine<H, B> {
    /// Builds an engine unless the host already reports scroll timing
    /// natively, in which case nothing should be layered on top.
    pub fn install(host: H, backend: B, config: TimingConfig) -> Option<Self> {
        if host.has_native_scroll_timing() {
            info!("Native scroll timing present, not installing");
            return None;
        }
        Some(Self::new(host, backend, config))
    }

    pub fn new(host: H, backend: B, config: TimingConfig) -> Self {
        Self {
            rates: RefreshRateEstimator::new(&config),
            hints: InputHintCorrelator::new(config.input_hint_timeout_ms),
            active: HashMap::new(),
            observers: ScrollObserverAdapter::new(backend),
            next_gesture: 1,
            refresh_frame: None,
            emitted: 0,
            host,
            config,
        }
    }

    /// Kicks off both refresh-rate measurements.
    pub fn initialize(&mut self) {
        self.start_baseline_measurement();
        self.start_main_thread_measurement();
    }

    pub fn start_baseline_measurement(&mut self) -> bool {
        let host = &mut self.host;
        self.rates
            .start_baseline_measurement(|| host.background_vsync())
    }

    pub fn start_main_thread_measurement(&mut self) -> bool {
        if !self.rates.start_main_thread_measurement() {
            return false;
        }
        self.refresh_frame = Some(
            self.host
                .request_animation_frame(FrameRequest::RefreshRateSample),
        );
        true
    }

    // --- DOM EVENTS ---

    /// Wheel, touch and scroll-key presses leave a hint on the scroller they
    /// would move. Other keys are ignored.
    pub fn handle_input(&mut self, event: &InputEvent) {
        let Some(source) = ScrollSource::from_input(&event.kind) else {
            return;
        };

        let scroller = match &event.kind {
            InputKind::KeyDown { .. } => {
                // Keys scroll the focused container, not the event target.
                let focused = self.host.active_element().map(EventTarget::Node);
                let path: Vec<EventTarget> = focused.into_iter().collect();
                target::find_scrollable_ancestor(&self.host, focused, Some(&path))
            }
            _ => target::find_scrollable_ancestor(
                &self.host,
                event.target,
                event.composed_path.as_deref(),
            ),
        };

        let origin = self.host.scroll_offset(scroller);
        let now = self.host.now();
        self.hints
            .record_hint(Some(scroller), source, now, Some(origin));
    }

    /// Attributes upcoming scrolls of `scroller` to a source named by the
    /// page, e.g. "programmatic" before calling a scroll API. Unknown names
    /// become "other".
    pub fn record_hint(&mut self, scroller: Option<EventTarget>, source: &str) {
        let source = ScrollSource::parse_or_other(source);
        let scroller = target::normalize(&self.host, scroller);
        let origin = self.host.scroll_offset(scroller);
        let now = self.host.now();
        self.hints
            .record_hint(Some(scroller), source, now, Some(origin));
    }

    pub fn handle_scroll(&mut self, event: &ScrollEvent) {
        let now = self.host.now();
        let root = target::root_scroller(&self.host);
        let mut scroller = target::normalize(&self.host, event.target);

        // Element scrolls can surface with a document target when observed
        // from a document-level capture listener. A fresh hint on a specific
        // container is the better guess.
        if scroller == root {
            if let Some(hint) = self.hints.peek_global_hint(now) {
                if hint.scroller != root {
                    scroller = hint.scroller;
                }
            }
        }

        let hint = self.hints.take_hint(scroller, now);
        let offset = self.host.scroll_offset(scroller);

        if let Some(state) = self.active.get_mut(&scroller) {
            if let Some(hint) = hint {
                if state.upgrade_source(hint.source) {
                    debug!("Gesture {:?} source upgraded to {}", state.gesture, hint.source);
                }
            }
            state.record_scroll(now, offset);
            self.arm_quiet_timer(scroller);
            return;
        }

        let gesture = GestureId(self.next_gesture);
        self.next_gesture += 1;

        let source = hint.map(|h| h.source).unwrap_or_default();
        let start_time = hint.map(|h| h.time).unwrap_or(now);
        let origin = hint.and_then(|h| h.origin).unwrap_or(offset);

        let mut state = ActiveScroll::new(gesture, source, scroller, start_time, origin);
        state.record_scroll(now, offset);
        state.frame_handle = Some(self.host.request_animation_frame(FrameRequest::Gesture {
            target: scroller,
            gesture,
        }));
        debug!(
            "Gesture {:?} started on {:?} (source {}, start {:.2})",
            gesture, scroller, source, start_time
        );
        self.active.insert(scroller, state);
        self.arm_quiet_timer(scroller);
    }

    fn arm_quiet_timer(&mut self, scroller: NodeId) {
        let Some(state) = self.active.get_mut(&scroller) else {
            return;
        };
        if let Some(handle) = state.timer_handle.take() {
            self.host.clear_timeout(handle);
        }
        state.timer_handle = Some(self.host.set_timeout(
            TimerRequest::QuietTimeout {
                target: scroller,
                gesture: state.gesture,
            },
            self.config.scroll_end_timeout_ms,
        ));
    }

    // --- SCHEDULED CALLBACKS ---

    pub fn handle_frame(&mut self, request: FrameRequest, timestamp: Timestamp) {
        self.rates.poll_baseline();
        match request {
            FrameRequest::RefreshRateSample => {
                self.refresh_frame = None;
                if self.rates.record_main_thread_frame(timestamp) {
                    self.refresh_frame = Some(
                        self.host
                            .request_animation_frame(FrameRequest::RefreshRateSample),
                    );
                }
            }
            FrameRequest::Gesture { target, gesture } => self.gesture_frame(target, gesture, timestamp),
        }
    }

    fn gesture_frame(&mut self, target: NodeId, gesture: GestureId, timestamp: Timestamp) {
        if !self.host.is_connected(target) && self.active.contains_key(&target) {
            warn!("Scroll target {:?} left the document mid-gesture, finalizing", target);
            self.finalize(target);
            return;
        }

        let now = self.host.now();
        let budget = self.rates.target_frame_duration();
        let Some(state) = self.active.get_mut(&target) else {
            return;
        };
        if state.gesture != gesture || state.ended {
            return;
        }

        state.record_frame(timestamp, now, budget);
        state.frame_handle = Some(
            self.host
                .request_animation_frame(FrameRequest::Gesture { target, gesture }),
        );
    }

    pub fn handle_timer(&mut self, request: TimerRequest) {
        let TimerRequest::QuietTimeout { target, gesture } = request;
        let now = self.host.now();
        let quiet = self.config.scroll_end_timeout_ms;

        let Some(state) = self.active.get_mut(&target) else {
            return;
        };
        if state.gesture != gesture || state.ended {
            return;
        }
        state.timer_handle = None;

        // A host may fire a timer a touch early. Re-arm for what is left.
        let remaining = quiet - state.quiet_for(now);
        if remaining > 0.5 {
            state.timer_handle = Some(self.host.set_timeout(request, remaining));
            return;
        }

        self.finalize(target);
    }

    /// Ends the gesture on `target`, emits its entry and forgets it. The
    /// frame loop and timer are cancelled in the same step, so no callback
    /// of this gesture can act afterwards.
    fn finalize(&mut self, target: NodeId) -> Option<ScrollTimingEntry> {
        let now = self.host.now();
        let mut state = self.active.remove(&target)?;

        if let Some(handle) = state.frame_handle.take() {
            self.host.cancel_animation_frame(handle);
        }
        if let Some(handle) = state.timer_handle.take() {
            self.host.clear_timeout(handle);
        }

        let raw = state.finish(now)?;
        let entry = ScrollTimingEntry::new(raw);
        debug!(
            "Gesture {:?} ended: {} frames of {} expected over {:.1} ms",
            state.gesture,
            entry.frames_produced(),
            entry.frames_expected(),
            entry.duration()
        );

        self.emitted += 1;
        self.observers.dispatch(&entry);
        Some(entry)
    }

    /// Finalizes every gesture whose target has left the document, and drops
    /// stale hints. Returns how many gestures were finalized.
    pub fn sweep_detached(&mut self) -> usize {
        let now = self.host.now();
        self.hints.prune(now);

        let detached: Vec<NodeId> = self
            .active
            .keys()
            .copied()
            .filter(|node| !self.host.is_connected(*node))
            .collect();
        detached
            .into_iter()
            .filter_map(|node| self.finalize(node))
            .count()
    }

    // --- OBSERVERS ---

    pub fn create_observer(&mut self, callback: ObserverCallback) -> ObserverId {
        self.observers.create(callback)
    }

    pub fn observe(&mut self, observer: ObserverId, options: &ObserveOptions) -> StResult<()> {
        self.observers.observe(observer, options)
    }

    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.disconnect(observer)
    }

    pub fn drop_observer(&mut self, observer: ObserverId) {
        self.observers.drop_observer(observer)
    }

    // --- INSPECTION ---

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn rates(&self) -> RefreshRates {
        self.rates.rates()
    }

    pub fn estimator_mut(&mut self) -> &mut RefreshRateEstimator {
        &mut self.rates
    }

    pub fn active_scroll(&self, target: NodeId) -> Option<&ActiveScroll> {
        self.active.get(&target)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted
    }
}
