//! Observer registration.
//!
//! [`ScrollObserverAdapter`] wraps the host's own performance-observer
//! mechanism. Subscriptions that include the "scroll" kind are recorded in
//! the adapter's registry; every call is still forwarded to the wrapped
//! backend unchanged.

use crate::entry::{EntryList, ScrollTimingEntry, SCROLL_ENTRY_TYPE};
use crate::error::StResult;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Either a single `entry_type` or a list of `entry_types`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObserveOptions {
    pub entry_type: Option<String>,
    pub entry_types: Option<Vec<String>>,
}

impl ObserveOptions {
    pub fn of_type(entry_type: &str) -> Self {
        Self {
            entry_type: Some(entry_type.to_string()),
            ..Default::default()
        }
    }

    pub fn of_types(entry_types: &[&str]) -> Self {
        Self {
            entry_types: Some(entry_types.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn wants(&self, kind: &str) -> bool {
        self.entry_type.as_deref() == Some(kind)
            || self
                .entry_types
                .as_ref()
                .is_some_and(|types| types.iter().any(|t| t == kind))
    }

    pub fn wants_scroll(&self) -> bool {
        self.wants(SCROLL_ENTRY_TYPE)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObserveError {
    #[error("entry type '{0}' is not supported")]
    UnsupportedEntryType(String),

    #[error("invalid observe options: {0}")]
    InvalidOptions(String),

    #[error("unknown observer {0:?}")]
    UnknownObserver(ObserverId),
}

/// The host's standard observer mechanism.
pub trait PerformanceObserverBackend {
    fn observe(&mut self, observer: ObserverId, options: &ObserveOptions) -> Result<(), ObserveError>;
    fn disconnect(&mut self, observer: ObserverId);
}

pub type ObserverCallback = Box<dyn FnMut(&EntryList)>;

/// Callbacks of every created observer, and the subset currently subscribed
/// to scroll entries.
#[derive(Default)]
pub struct ObserverRegistry {
    callbacks: HashMap<ObserverId, ObserverCallback>,
    subscribed: BTreeSet<ObserverId>,
}

impl ObserverRegistry {
    pub fn insert(&mut self, id: ObserverId, callback: ObserverCallback) {
        self.callbacks.insert(id, callback);
    }

    /// Forgets the observer and its callback. Returns `false` if it was
    /// never created or is already gone.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.subscribed.remove(&id);
        self.callbacks.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.callbacks.contains_key(&id)
    }

    pub fn observer_count(&self) -> usize {
        self.callbacks.len()
    }

    pub fn subscribe(&mut self, id: ObserverId) -> bool {
        self.callbacks.contains_key(&id) && self.subscribed.insert(id)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.subscribed.remove(&id)
    }

    pub fn is_subscribed(&self, id: ObserverId) -> bool {
        self.subscribed.contains(&id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribed.len()
    }

    /// Calls every subscriber once, in subscription id order, with a list
    /// holding just this entry.
    pub fn broadcast(&mut self, entry: &ScrollTimingEntry) {
        let list = EntryList::new(vec![entry.clone()]);
        for id in &self.subscribed {
            if let Some(callback) = self.callbacks.get_mut(id) {
                callback(&list);
            }
        }
    }
}

pub struct ScrollObserverAdapter<B> {
    inner: B,
    registry: ObserverRegistry,
    next_id: u64,
}

impl<B: PerformanceObserverBackend> ScrollObserverAdapter<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            registry: ObserverRegistry::default(),
            next_id: 1,
        }
    }

    pub fn create(&mut self, callback: ObserverCallback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registry.insert(id, callback);
        id
    }

    /// Forwards to the backend. A rejection is swallowed only if the request
    /// asked for scroll entries, which the backend is not expected to know.
    pub fn observe(&mut self, id: ObserverId, options: &ObserveOptions) -> StResult<()> {
        if !self.registry.contains(id) {
            return Err(ObserveError::UnknownObserver(id).into());
        }
        let wants_scroll = options.wants_scroll();
        if wants_scroll && self.registry.subscribe(id) {
            debug!("Observer {:?} subscribed to scroll entries", id);
        }

        match self.inner.observe(id, options) {
            Ok(()) => Ok(()),
            Err(e) if wants_scroll => {
                debug!("Backend rejected scroll observation ({}), handled here", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        if self.registry.unsubscribe(id) {
            debug!("Observer {:?} unsubscribed from scroll entries", id);
        }
        self.inner.disconnect(id);
    }

    /// Disconnects the observer and releases its callback. Its id cannot be
    /// observed again.
    pub fn drop_observer(&mut self, id: ObserverId) {
        if !self.registry.contains(id) {
            return;
        }
        self.disconnect(id);
        self.registry.remove(id);
        debug!("Observer {:?} dropped", id);
    }

    pub fn dispatch(&mut self, entry: &ScrollTimingEntry) {
        self.registry.broadcast(entry);
    }

    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

/// A backend that knows a fixed set of entry kinds, like a browser without
/// native scroll timing. Rejects a single-type request for anything else.
#[derive(Debug, Clone)]
pub struct StaticObserverBackend {
    supported: HashSet<String>,
    observing: HashMap<ObserverId, ObserveOptions>,
}

impl StaticObserverBackend {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            observing: HashMap::new(),
        }
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.observing.contains_key(&id)
    }
}

impl Default for StaticObserverBackend {
    fn default() -> Self {
        Self::new(&[
            "mark",
            "measure",
            "navigation",
            "resource",
            "paint",
            "longtask",
            "event",
            "first-input",
            "layout-shift",
            "largest-contentful-paint",
        ])
    }
}

impl PerformanceObserverBackend for StaticObserverBackend {
    fn observe(&mut self, observer: ObserverId, options: &ObserveOptions) -> Result<(), ObserveError> {
        match (&options.entry_type, &options.entry_types) {
            (Some(_), Some(_)) => {
                return Err(ObserveError::InvalidOptions(
                    "entryType and entryTypes are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(ObserveError::InvalidOptions(
                    "one of entryType or entryTypes is required".to_string(),
                ))
            }
            (Some(kind), None) if !self.supported.contains(kind) => {
                return Err(ObserveError::UnsupportedEntryType(kind.clone()))
            }
            _ => {}
        }
        self.observing.insert(observer, options.clone());
        Ok(())
    }

    fn disconnect(&mut self, observer: ObserverId) {
        self.observing.remove(&observer);
    }
}
