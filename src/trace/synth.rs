use super::{Action, NodeDecl, NodeKindDecl, Step, Trace};
use crate::host::{Overflow, ScrollGeometry, ScrollOffset};
use crate::source::ScrollSource;

pub const SYNTH_SCROLLER_ID: &str = "feed";

const VIEWPORT_HEIGHT: f64 = 600.0;
/// Input lands a little before the first scroll event it causes.
const INPUT_LEAD_MS: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct SynthParams {
    pub source: ScrollSource,
    /// Total vertical distance in pixels. Negative scrolls up.
    pub distance: f64,
    /// Number of scroll events the distance is spread over.
    pub steps: usize,
    /// Vsync interval in milliseconds.
    pub interval_ms: f64,
    /// Probability that any given frame is dropped.
    pub jank: f64,
    pub seed: Option<u64>,
    pub quiet_timeout_ms: f64,
    pub with_baseline: bool,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            source: ScrollSource::Wheel,
            distance: 800.0,
            steps: 10,
            interval_ms: 1000.0 / 60.0,
            jank: 0.0,
            seed: None,
            quiet_timeout_ms: 150.0,
            with_baseline: true,
        }
    }
}

/// One gesture on a single scroll container, one scroll event per vsync.
pub fn synthesize(params: &SynthParams) -> Trace {
    let mut rng = match params.seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    };
    let interval = params.interval_ms.max(1.0);
    let steps = params.steps.max(1);
    let start_offset = if params.distance < 0.0 { -params.distance } else { 0.0 };

    let scroller = NodeDecl {
        id: SYNTH_SCROLLER_ID.to_string(),
        kind: NodeKindDecl::Element,
        parent: None,
        overflow_x: Overflow::Hidden,
        overflow_y: Overflow::Auto,
        geometry: ScrollGeometry {
            scroll_width: 400.0,
            scroll_height: VIEWPORT_HEIGHT + params.distance.abs() + 100.0,
            client_width: 400.0,
            client_height: VIEWPORT_HEIGHT,
        },
        offset: ScrollOffset::new(start_offset, 0.0),
    };

    let mut out = Vec::new();
    let target = SYNTH_SCROLLER_ID.to_string();
    match params.source {
        ScrollSource::Wheel => out.push(Step {
            at: 0.0,
            action: Action::Wheel { target },
        }),
        ScrollSource::Touch => {
            out.push(Step {
                at: 0.0,
                action: Action::TouchStart {
                    target: target.clone(),
                },
            });
            out.push(Step {
                at: 0.0,
                action: Action::TouchMove { target },
            });
        }
        ScrollSource::Keyboard => {
            out.push(Step {
                at: 0.0,
                action: Action::Focus {
                    target: Some(target),
                },
            });
            out.push(Step {
                at: 0.0,
                action: Action::KeyDown {
                    key: if params.distance < 0.0 { "PageUp" } else { "PageDown" }.to_string(),
                },
            });
        }
        ScrollSource::Programmatic => out.push(Step {
            at: 0.0,
            action: Action::Hint {
                target: Some(target),
                source: ScrollSource::Programmatic.to_string(),
            },
        }),
        ScrollSource::Other => {}
    }

    let mut last_scroll = 0.0;
    for i in 0..steps {
        let at = INPUT_LEAD_MS + i as f64 * interval;
        let progress = (i + 1) as f64 / steps as f64;
        out.push(Step {
            at,
            action: Action::Scroll {
                target: Some(SYNTH_SCROLLER_ID.to_string()),
                top: Some(start_offset + params.distance * progress),
                left: None,
            },
        });
        last_scroll = at;
    }

    // Frames keep coming until the gesture has certainly timed out.
    let end = last_scroll + params.quiet_timeout_ms + interval;
    let mut k = 1;
    loop {
        let at = k as f64 * interval;
        if at > end {
            break;
        }
        if rng.f64() >= params.jank {
            out.push(Step {
                at,
                action: Action::Frame,
            });
        }
        k += 1;
    }

    out.sort_by(|a, b| a.at.total_cmp(&b.at));

    Trace {
        baseline_interval_ms: params.with_baseline.then_some(interval),
        nodes: vec![scroller],
        steps: out,
    }
}
