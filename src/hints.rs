//! Input-source correlation.
//!
//! Scroll events do not say what caused them. Wheel, touch and key events
//! leave a short-lived hint on the scroller they would move; the next
//! gesture on that scroller consumes it.

use crate::host::{NodeId, ScrollOffset, Timestamp};
use crate::source::ScrollSource;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputHint {
    pub scroller: NodeId,
    pub source: ScrollSource,
    pub time: Timestamp,
    /// Scroller position when the input arrived, before it moved.
    pub origin: Option<ScrollOffset>,
}

#[derive(Debug, Clone)]
pub struct InputHintCorrelator {
    per_scroller: HashMap<NodeId, InputHint>,
    last: Option<InputHint>,
    timeout_ms: f64,
}

impl InputHintCorrelator {
    pub fn new(timeout_ms: f64) -> Self {
        Self {
            per_scroller: HashMap::new(),
            last: None,
            timeout_ms,
        }
    }

    fn expired(&self, hint: &InputHint, now: Timestamp) -> bool {
        now - hint.time > self.timeout_ms
    }

    /// Overwrites both the per-scroller and the global hint.
    pub fn record_hint(
        &mut self,
        scroller: Option<NodeId>,
        source: ScrollSource,
        now: Timestamp,
        origin: Option<ScrollOffset>,
    ) {
        let Some(scroller) = scroller else {
            return;
        };
        let hint = InputHint {
            scroller,
            source,
            time: now,
            origin,
        };
        self.per_scroller.insert(scroller, hint);
        self.last = Some(hint);
    }

    /// Most recent hint regardless of scroller. An expired one is dropped.
    pub fn peek_global_hint(&mut self, now: Timestamp) -> Option<InputHint> {
        let hint = self.last?;
        if self.expired(&hint, now) {
            self.last = None;
            return None;
        }
        Some(hint)
    }

    /// Removes the scroller's hint whether or not it is still fresh, and
    /// returns it only if it is.
    pub fn take_hint(&mut self, scroller: NodeId, now: Timestamp) -> Option<InputHint> {
        let hint = self.per_scroller.remove(&scroller)?;
        if self.expired(&hint, now) {
            return None;
        }
        Some(hint)
    }

    /// Drops every expired per-scroller hint. Hints for scrollers that never
    /// scroll would otherwise stay until overwritten.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let before = self.per_scroller.len();
        let timeout = self.timeout_ms;
        self.per_scroller.retain(|_, hint| now - hint.time <= timeout);
        if self.last.is_some_and(|h| now - h.time > timeout) {
            self.last = None;
        }
        before - self.per_scroller.len()
    }

    pub fn len(&self) -> usize {
        self.per_scroller.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_scroller.is_empty()
    }
}
