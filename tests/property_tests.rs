use proptest::prelude::*;
use scroll_timing::active_scroll::{expected_for_gap, ActiveScroll};
use scroll_timing::config::TimingConfig;
use scroll_timing::entry::{RawScrollTiming, TargetRef};
use scroll_timing::host::{GestureId, NodeId, NodeKind, ScrollOffset};
use scroll_timing::refresh_rate::{estimate_rate, median, FrameSampler, SampleProgress};
use scroll_timing::{ScrollSource, ScrollTimingEntry};

// --- STRATEGIES ---

prop_compose! {
    fn arb_deltas()(deltas in prop::collection::vec(1.0..50.0f64, 10..120)) -> Vec<f64> {
        deltas
    }
}

prop_compose! {
    fn arb_offsets()(offsets in prop::collection::vec((-5000.0..5000.0f64, -500.0..500.0f64), 1..40)) -> Vec<ScrollOffset> {
        offsets.into_iter().map(|(top, left)| ScrollOffset::new(top, left)).collect()
    }
}

fn arb_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1e6..1e6f64,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(-0.0),
        0.0..100.0f64,
    ]
}

prop_compose! {
    fn arb_raw()(
        start_time in arb_number(),
        first_frame_time in arb_number(),
        duration in arb_number(),
        frames_expected in arb_number(),
        frames_produced in arb_number(),
        checkerboard_time in arb_number(),
        delta_x in arb_number(),
        delta_y in arb_number(),
        source in prop_oneof![
            Just("touch"), Just("wheel"), Just("keyboard"), Just("other"),
            Just("programmatic"), Just("Touch"), Just(""), Just("trackpad")
        ],
        kind in prop_oneof![Just(NodeKind::Element), Just(NodeKind::Text), Just(NodeKind::Document)],
        has_target in any::<bool>()
    ) -> RawScrollTiming {
        RawScrollTiming {
            start_time,
            first_frame_time,
            duration,
            frames_expected,
            frames_produced,
            checkerboard_time,
            scroll_source: source.to_string(),
            target: has_target.then_some(TargetRef { node: NodeId(9), kind }),
            delta_x,
            delta_y,
        }
    }
}

proptest! {
    #[test]
    fn prop_rate_is_inverse_median(deltas in arb_deltas()) {
        let est = estimate_rate(&deltas, 10).unwrap();
        let m = median(&deltas).unwrap();
        prop_assert!((est.rate - 1000.0 / m).abs() < 1e-9);
        prop_assert_eq!(est.samples, deltas.len());
    }

    #[test]
    fn prop_median_is_a_member(deltas in arb_deltas()) {
        let m = median(&deltas).unwrap();
        prop_assert!(deltas.contains(&m));
        let below = deltas.iter().filter(|d| **d < m).count();
        prop_assert!(below <= deltas.len() / 2);
    }

    #[test]
    fn prop_too_few_samples_keeps_default(deltas in prop::collection::vec(1.0..50.0f64, 0..10)) {
        prop_assert!(estimate_rate(&deltas, 10).is_none());
    }

    #[test]
    fn prop_sampler_stops_at_window(interval in 4.0..40.0f64, extra in 0usize..20) {
        let config = TimingConfig::default();
        let mut sampler = FrameSampler::new(&config);
        let mut done_at = None;
        for i in 0..(config.refresh_rate_samples + extra) {
            if let SampleProgress::Done(est) = sampler.record(i as f64 * interval) {
                done_at = Some((i + 1, est));
                break;
            }
        }
        let (callbacks, est) = done_at.unwrap();
        prop_assert_eq!(callbacks, config.refresh_rate_samples);
        let est = est.unwrap();
        prop_assert!((est.rate - 1000.0 / interval).abs() < 1e-6);
    }

    #[test]
    fn prop_expected_at_least_one(gap in -100.0..1000.0f64, budget in 1.0..50.0f64) {
        prop_assert!(expected_for_gap(gap, budget) >= 1);
    }

    #[test]
    fn prop_cumulative_delta_is_net_motion(offsets in arb_offsets()) {
        let origin = ScrollOffset::default();
        let mut state = ActiveScroll::new(GestureId(1), ScrollSource::Wheel, NodeId(3), 0.0, origin);
        for (i, offset) in offsets.iter().enumerate() {
            state.record_scroll(i as f64, *offset);
        }
        let last = offsets.last().unwrap();
        prop_assert!((state.cumulative_delta_y - last.top).abs() < 1e-6);
        prop_assert!((state.cumulative_delta_x - last.left).abs() < 1e-6);
    }

    #[test]
    fn prop_frames_expected_covers_produced(gaps in prop::collection::vec(1.0..120.0f64, 1..60)) {
        let budget = 1000.0 / 60.0;
        let mut state = ActiveScroll::new(GestureId(1), ScrollSource::Touch, NodeId(3), 0.0, ScrollOffset::default());
        let mut t = 0.0;
        for gap in &gaps {
            t += gap;
            state.record_frame(t, t, budget);
        }
        prop_assert_eq!(state.frame_count as usize, gaps.len());
        prop_assert!(state.expected_frames >= state.frame_count);
        let raw = state.finish(t + 150.0).unwrap();
        let entry = ScrollTimingEntry::new(raw);
        prop_assert!(entry.first_frame_time() >= entry.start_time());
    }

    #[test]
    fn prop_entry_fields_always_sane(raw in arb_raw()) {
        let entry = ScrollTimingEntry::new(raw.clone());
        prop_assert!(entry.start_time().is_finite() && entry.start_time() >= 0.0);
        prop_assert!(entry.first_frame_time() >= entry.start_time());
        prop_assert!(entry.duration().is_finite() && entry.duration() >= 0.0);
        prop_assert!(entry.checkerboard_time() >= 0.0);
        prop_assert!(entry.delta_x().is_finite());
        prop_assert!(entry.delta_y().is_finite());
        prop_assert!(entry.scroll_start_latency() >= 0.0);
        prop_assert_eq!(entry.entry_type(), "scroll");
        if entry.target().is_some() {
            prop_assert_eq!(raw.target.map(|t| t.kind), Some(NodeKind::Element));
        }
        if raw.scroll_source == "trackpad" || raw.scroll_source == "Touch" || raw.scroll_source.is_empty() {
            prop_assert_eq!(entry.scroll_source(), ScrollSource::Other);
        }
    }
}
