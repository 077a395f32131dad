use scroll_timing::entry::{EntryList, RawScrollTiming, TargetRef};
use scroll_timing::host::{NodeId, NodeKind};
use scroll_timing::observer::{
    ObserveError, ObserveOptions, ObserverId, PerformanceObserverBackend, ScrollObserverAdapter,
    StaticObserverBackend,
};
use scroll_timing::{ScrollTimingEntry, ScrollTimingError};
use std::cell::RefCell;
use std::rc::Rc;

fn entry() -> ScrollTimingEntry {
    ScrollTimingEntry::new(RawScrollTiming {
        start_time: 0.0,
        first_frame_time: 16.0,
        duration: 200.0,
        frames_expected: 3.0,
        frames_produced: 3.0,
        checkerboard_time: 0.0,
        scroll_source: "wheel".to_string(),
        target: Some(TargetRef {
            node: NodeId(4),
            kind: NodeKind::Element,
        }),
        delta_x: 0.0,
        delta_y: 120.0,
    })
}

fn counter() -> (Rc<RefCell<usize>>, Box<dyn FnMut(&EntryList)>) {
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let callback: Box<dyn FnMut(&EntryList)> = Box::new(move |list: &EntryList| {
        assert_eq!(list.len(), 1);
        assert_eq!(list.get_entries_by_type("scroll").len(), 1);
        assert!(list.get_entries_by_type("paint").is_empty());
        *sink.borrow_mut() += list.len();
    });
    (count, callback)
}

#[test]
fn test_other_kinds_pass_through() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);

    adapter.observe(id, &ObserveOptions::of_type("paint")).unwrap();
    assert!(adapter.inner().is_observing(id));
    assert!(!adapter.registry().is_subscribed(id));

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_scroll_rejection_is_swallowed() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);

    adapter.observe(id, &ObserveOptions::of_type("scroll")).unwrap();
    assert!(adapter.registry().is_subscribed(id));
    assert!(!adapter.inner().is_observing(id));

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_mixed_list_reaches_backend() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);

    adapter
        .observe(id, &ObserveOptions::of_types(&["scroll", "longtask"]))
        .unwrap();
    assert!(adapter.inner().is_observing(id));
    assert!(adapter.registry().is_subscribed(id));

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_unrelated_rejection_propagates() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (_, callback) = counter();
    let id = adapter.create(callback);

    let err = adapter
        .observe(id, &ObserveOptions::of_type("element-timing"))
        .unwrap_err();
    assert!(matches!(
        err,
        ScrollTimingError::Registration(ObserveError::UnsupportedEntryType(ref kind)) if kind == "element-timing"
    ));

    let err = adapter.observe(id, &ObserveOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ScrollTimingError::Registration(ObserveError::InvalidOptions(_))
    ));
}

#[test]
fn test_repeat_observe_does_not_double_deliver() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);

    adapter.observe(id, &ObserveOptions::of_type("scroll")).unwrap();
    adapter
        .observe(id, &ObserveOptions::of_types(&["scroll", "paint"]))
        .unwrap();
    assert_eq!(adapter.registry().subscriber_count(), 1);

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_disconnect_stops_delivery() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);
    adapter
        .observe(id, &ObserveOptions::of_types(&["scroll", "paint"]))
        .unwrap();

    adapter.disconnect(id);
    assert!(!adapter.registry().is_subscribed(id));
    assert!(!adapter.inner().is_observing(id));

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_unknown_observer_is_rejected() {
    let mut adapter = ScrollObserverAdapter::new(Permissive::default());
    let stranger = ObserverId(42);

    let err = adapter
        .observe(stranger, &ObserveOptions::of_type("scroll"))
        .unwrap_err();
    assert!(matches!(
        err,
        ScrollTimingError::Registration(ObserveError::UnknownObserver(id)) if id == stranger
    ));
    assert_eq!(adapter.inner().calls, 0);
    assert_eq!(adapter.registry().subscriber_count(), 0);
}

#[test]
fn test_dropped_observer_releases_callback() {
    let mut adapter = ScrollObserverAdapter::new(StaticObserverBackend::default());
    let (count, callback) = counter();
    let id = adapter.create(callback);
    let (_, other) = counter();
    let kept = adapter.create(other);
    adapter
        .observe(id, &ObserveOptions::of_types(&["scroll", "paint"]))
        .unwrap();
    assert_eq!(Rc::strong_count(&count), 2);

    adapter.drop_observer(id);
    assert_eq!(adapter.registry().observer_count(), 1);
    assert!(!adapter.registry().is_subscribed(id));
    assert!(!adapter.inner().is_observing(id));
    assert_eq!(Rc::strong_count(&count), 1);

    adapter.dispatch(&entry());
    assert_eq!(*count.borrow(), 0);
    assert!(adapter.observe(id, &ObserveOptions::of_type("scroll")).is_err());
    assert!(adapter.observe(kept, &ObserveOptions::of_type("scroll")).is_ok());

    // Dropping twice is harmless.
    adapter.drop_observer(id);
    assert_eq!(adapter.registry().observer_count(), 1);
}

/// A host that does know scroll entries natively.
#[derive(Default)]
struct Permissive {
    calls: usize,
}

impl PerformanceObserverBackend for Permissive {
    fn observe(&mut self, _: ObserverId, _: &ObserveOptions) -> Result<(), ObserveError> {
        self.calls += 1;
        Ok(())
    }

    fn disconnect(&mut self, _: ObserverId) {}
}

#[test]
fn test_backend_always_sees_the_call() {
    let mut adapter = ScrollObserverAdapter::new(Permissive::default());
    let (_, callback) = counter();
    let id = adapter.create(callback);
    adapter.observe(id, &ObserveOptions::of_type("scroll")).unwrap();
    adapter.observe(id, &ObserveOptions::of_type("mark")).unwrap();
    assert_eq!(adapter.inner().calls, 2);
}
