use scroll_timing::config::TimingConfig;
use scroll_timing::host::{EventTarget, NodeId, Overflow, ScrollGeometry, ScrollOffset};
use scroll_timing::observer::StaticObserverBackend;
use scroll_timing::sim::{SharedEntries, Simulation, VirtualDom, VirtualHost};
use scroll_timing::{ScrollSource, ScrollTimingEngine};

const FRAME: f64 = 1000.0 / 60.0;

struct Page {
    sim: Simulation,
    scroller: NodeId,
    entries: SharedEntries,
}

fn tall() -> ScrollGeometry {
    ScrollGeometry {
        scroll_width: 300.0,
        scroll_height: 2000.0,
        client_width: 300.0,
        client_height: 500.0,
    }
}

/// A body with one overflow:auto container that has room to scroll.
fn page() -> Page {
    let mut dom = VirtualDom::new();
    let scroller = dom.create_element(dom.body_element());
    dom.make_scroll_container(scroller, Overflow::Auto, tall());
    let mut sim = Simulation::with_dom(dom, TimingConfig::default());
    let entries = sim.record_entries();
    Page {
        sim,
        scroller,
        entries,
    }
}

fn at(top: f64) -> ScrollOffset {
    ScrollOffset::new(top, 0.0)
}

#[test]
fn test_wheel_gesture_end_to_end() {
    let mut p = page();
    p.sim.wheel(0.0, p.scroller);
    p.sim.scroll_to(5.0, p.scroller, at(40.0));
    p.sim.frame(20.0);
    p.sim.frame(36.0);
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.entry_type(), "scroll");
    assert_eq!(e.name(), "scroll");
    assert_eq!(e.scroll_source(), ScrollSource::Wheel);
    assert_eq!(e.start_time(), 0.0);
    assert_eq!(e.first_frame_time(), 20.0);
    assert_eq!(e.scroll_start_latency(), 20.0);
    assert_eq!(e.duration(), 155.0);
    assert_eq!(e.frames_produced(), 2);
    assert_eq!(e.frames_expected(), 2);
    assert_eq!(e.delta_y(), 40.0);
    assert_eq!(e.delta_x(), 0.0);
    assert_eq!(e.checkerboard_time(), 0.0);
    assert_eq!(e.target(), Some(p.scroller));
}

#[test]
fn test_scroll_without_input_is_other() {
    let mut p = page();
    p.sim.scroll_to(100.0, p.scroller, at(10.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].scroll_source(), ScrollSource::Other);
    assert_eq!(entries[0].start_time(), 100.0);
    assert_eq!(entries[0].duration(), 150.0);
    // Without a hint there is no position from before the first event.
    assert_eq!(entries[0].delta_y(), 0.0);
}

#[test]
fn test_stale_hint_is_ignored() {
    let mut p = page();
    p.sim.wheel(0.0, p.scroller);
    p.sim.scroll_to(260.0, p.scroller, at(40.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].scroll_source(), ScrollSource::Other);
    assert_eq!(entries[0].start_time(), 260.0);
}

#[test]
fn test_one_gesture_per_target_until_quiet() {
    let mut p = page();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.scroll_to(50.0, p.scroller, at(30.0));
    p.sim.scroll_to(120.0, p.scroller, at(60.0));
    assert_eq!(p.sim.engine().active_count(), 1);
    let active = p.sim.engine().active_scroll(p.scroller).unwrap();
    assert_eq!(active.start_time, 0.0);
    assert_eq!(active.last_scroll_event_time, 120.0);

    // Quiet timer restarts with every event.
    p.sim.advance_to(200.0);
    assert!(p.entries.borrow().is_empty());
    p.sim.advance_to(270.0);
    assert_eq!(p.entries.borrow().len(), 1);
    assert_eq!(p.sim.engine().active_count(), 0);

    p.sim.scroll_to(400.0, p.scroller, at(70.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].delta_y(), 50.0);
    assert_eq!(entries[0].duration(), 270.0);
    assert_eq!(entries[1].start_time(), 400.0);
}

#[test]
fn test_separate_targets_scroll_independently() {
    let mut p = page();
    let other = p.sim.dom_mut().create_element(p.scroller);
    p.sim
        .dom_mut()
        .make_scroll_container(other, Overflow::Scroll, tall());

    p.sim.wheel(0.0, other);
    p.sim.scroll_to(2.0, other, at(5.0));
    p.sim.scroll_to(3.0, p.scroller, at(8.0));
    assert_eq!(p.sim.engine().active_count(), 2);
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 2);
    let inner = entries.iter().find(|e| e.target() == Some(other)).unwrap();
    let outer = entries.iter().find(|e| e.target() == Some(p.scroller)).unwrap();
    assert_eq!(inner.scroll_source(), ScrollSource::Wheel);
    assert_eq!(outer.scroll_source(), ScrollSource::Other);
}

#[test]
fn test_late_hint_upgrades_other() {
    let mut p = page();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.touch_start(10.0, p.scroller);
    p.sim.scroll_to(20.0, p.scroller, at(20.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].scroll_source(), ScrollSource::Touch);
    assert_eq!(entries[0].start_time(), 0.0);
}

#[test]
fn test_attributed_source_is_kept() {
    let mut p = page();
    p.sim.wheel(0.0, p.scroller);
    p.sim.scroll_to(5.0, p.scroller, at(10.0));
    p.sim.touch_move(10.0, p.scroller);
    p.sim.scroll_to(20.0, p.scroller, at(20.0));
    p.sim.run_until_idle();

    assert_eq!(p.entries.borrow()[0].scroll_source(), ScrollSource::Wheel);
}

#[test]
fn test_wheel_over_text_resolves_to_container() {
    let mut p = page();
    let text = p.sim.dom_mut().create_text(p.scroller);
    p.sim.wheel(0.0, text);
    p.sim.scroll_to(4.0, p.scroller, at(100.0));
    p.sim.run_until_idle();

    assert_eq!(p.entries.borrow()[0].scroll_source(), ScrollSource::Wheel);
}

#[test]
fn test_wheel_inside_shadow_tree() {
    let mut p = page();
    let host = p.sim.dom_mut().create_element(p.scroller);
    let root = p.sim.dom_mut().attach_shadow(host);
    let inner = p.sim.dom_mut().create_element(root);

    p.sim.wheel(0.0, inner);
    p.sim.scroll_to(4.0, p.scroller, at(100.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].scroll_source(), ScrollSource::Wheel);
    assert_eq!(entries[0].target(), Some(p.scroller));
}

#[test]
fn test_document_scroll_uses_fresh_container_hint() {
    let mut p = page();
    p.sim.wheel(0.0, p.scroller);
    p.sim.dom_mut().set_scroll_offset(p.scroller, at(40.0));
    let document = p.sim.dom().document();
    p.sim.scroll_event(5.0, Some(EventTarget::Node(document)));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].target(), Some(p.scroller));
    assert_eq!(entries[0].scroll_source(), ScrollSource::Wheel);
    assert_eq!(entries[0].delta_y(), 40.0);
}

#[test]
fn test_window_scroll_without_hint_targets_root() {
    let mut p = page();
    let html = p.sim.dom().html();
    p.sim.dom_mut().set_scroll_offset(html, at(300.0));
    p.sim.scroll_event(0.0, Some(EventTarget::Window));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].target(), Some(html));
    assert_eq!(entries[0].delta_y(), 0.0);
}

#[test]
fn test_keyboard_scroll_follows_focus() {
    let mut p = page();
    p.sim.focus(0.0, Some(p.scroller));
    p.sim.key_down(1.0, "PageDown");
    p.sim.scroll_to(6.0, p.scroller, at(450.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].scroll_source(), ScrollSource::Keyboard);
    assert_eq!(entries[0].start_time(), 1.0);
    assert_eq!(entries[0].delta_y(), 450.0);
}

#[test]
fn test_keyboard_without_focus_hints_root() {
    let mut p = page();
    p.sim.key_down(0.0, "ArrowDown");
    p.sim.scroll_event(3.0, None);
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].scroll_source(), ScrollSource::Keyboard);
    assert_eq!(entries[0].target(), Some(p.sim.dom().html()));
}

#[test]
fn test_non_scroll_key_leaves_no_hint() {
    let mut p = page();
    p.sim.focus(0.0, Some(p.scroller));
    p.sim.key_down(1.0, "a");
    p.sim.scroll_to(6.0, p.scroller, at(20.0));
    p.sim.run_until_idle();

    assert_eq!(p.entries.borrow()[0].scroll_source(), ScrollSource::Other);
}

#[test]
fn test_programmatic_hint_by_name() {
    let mut p = page();
    p.sim.hint(0.0, Some(p.scroller), "programmatic");
    p.sim.scroll_to(1.0, p.scroller, at(500.0));
    p.sim.hint(300.0, Some(p.scroller), "trackpad");
    p.sim.scroll_to(301.0, p.scroller, at(600.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].scroll_source(), ScrollSource::Programmatic);
    assert_eq!(entries[1].scroll_source(), ScrollSource::Other);
}

#[test]
fn test_gesture_without_frames_still_reports() {
    let mut p = page();
    p.sim.wheel(10.0, p.scroller);
    p.sim.scroll_to(12.0, p.scroller, at(40.0));
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].frames_produced(), 0);
    assert_eq!(entries[0].frames_expected(), 0);
    assert_eq!(entries[0].first_frame_time(), entries[0].start_time());
    assert_eq!(entries[0].scroll_start_latency(), 0.0);
    assert_eq!(entries[0].smoothness(), 1.0);
}

#[test]
fn test_dropped_frames_raise_expected() {
    let mut p = page();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.frame(FRAME);
    p.sim.frame(2.0 * FRAME);
    // Three vsyncs missed.
    p.sim.frame(6.0 * FRAME);
    p.sim.run_until_idle();

    let entries = p.entries.borrow();
    assert_eq!(entries[0].frames_produced(), 3);
    assert_eq!(entries[0].frames_expected(), 6);
    assert!(entries[0].smoothness() < 1.0);
}

#[test]
fn test_no_frames_counted_after_end() {
    let mut p = page();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.frame(10.0);
    p.sim.run_until_idle();
    assert!(p.sim.engine().host().pending_frames().is_empty());
    assert_eq!(p.sim.engine().host().pending_timers(), 0);

    p.sim.frame(200.0);
    p.sim.frame(216.0);
    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].frames_produced(), 1);
    assert_eq!(p.sim.engine().emitted_count(), 1);
}

#[test]
fn test_detached_target_finalized_on_next_frame() {
    let mut p = page();
    p.sim.wheel(0.0, p.scroller);
    p.sim.scroll_to(2.0, p.scroller, at(10.0));
    p.sim.detach(10.0, p.scroller);
    p.sim.frame(16.0);

    let entries = p.entries.borrow();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].duration(), 16.0);
    assert_eq!(entries[0].frames_produced(), 0);
    assert_eq!(p.sim.engine().active_count(), 0);
    assert_eq!(p.sim.engine().host().pending_timers(), 0);
}

#[test]
fn test_sweep_finalizes_detached_targets() {
    let mut p = page();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.detach(5.0, p.scroller);
    assert_eq!(p.sim.sweep(6.0), 1);
    assert_eq!(p.sim.sweep(7.0), 0);
    p.sim.run_until_idle();
    assert_eq!(p.entries.borrow().len(), 1);
}

#[test]
fn test_entries_reach_every_observer() {
    let mut p = page();
    let second = p.sim.record_entries();
    p.sim.scroll_to(0.0, p.scroller, at(10.0));
    p.sim.run_until_idle();

    assert_eq!(p.entries.borrow().len(), 1);
    assert_eq!(second.borrow().len(), 1);
    assert_eq!(p.entries.borrow()[0], second.borrow()[0]);
}

#[test]
fn test_install_skips_native_hosts() {
    let host = VirtualHost::new(VirtualDom::new()).with_native_scroll_timing();
    let engine =
        ScrollTimingEngine::install(host, StaticObserverBackend::default(), TimingConfig::default());
    assert!(engine.is_none());

    let host = VirtualHost::new(VirtualDom::new());
    let engine =
        ScrollTimingEngine::install(host, StaticObserverBackend::default(), TimingConfig::default());
    assert!(engine.is_some());
}
