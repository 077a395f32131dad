//! Replayable interaction traces.
//!
//! A trace declares a small document and a time-ordered list of steps.
//! Replaying it runs the engine over a [`VirtualHost`] and collects every
//! entry the engine emits.

pub mod synth;

use crate::config::TimingConfig;
use crate::engine::ScrollTimingEngine;
use crate::entry::ScrollTimingEntry;
use crate::error::{ScrollTimingError, StResult};
use crate::host::{
    Dom, EventTarget, NodeId, Overflow, OverflowStyle, ScrollGeometry, ScrollOffset,
};
use crate::observer::StaticObserverBackend;
use crate::refresh_rate::RefreshRates;
use crate::sim::{frame_count, Simulation, VirtualDom, VirtualHost, MIN_FRAME_INTERVAL_MS};
use crate::target::root_scroller;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Node ids that always exist.
pub const HTML_ID: &str = "html";
pub const BODY_ID: &str = "body";

/// Upper bound on the frames a single `frames` step may present.
pub const MAX_FRAMES_PER_STEP: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKindDecl {
    #[default]
    Element,
    Text,
    ShadowRoot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKindDecl,
    /// Defaults to `body`. For shadow roots, the host element.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub overflow_x: Overflow,
    #[serde(default)]
    pub overflow_y: Overflow,
    #[serde(default)]
    pub geometry: ScrollGeometry,
    #[serde(default)]
    pub offset: ScrollOffset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Wheel {
        target: String,
    },
    TouchStart {
        target: String,
    },
    TouchMove {
        target: String,
    },
    KeyDown {
        key: String,
    },
    Focus {
        #[serde(default)]
        target: Option<String>,
    },
    /// Moves the target (the root scroller when absent) and fires a scroll
    /// event at it. Omitted offsets keep their current value.
    Scroll {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        top: Option<f64>,
        #[serde(default)]
        left: Option<f64>,
    },
    Frame,
    Frames {
        until: f64,
        interval: f64,
    },
    Hint {
        #[serde(default)]
        target: Option<String>,
        source: String,
    },
    Detach {
        target: String,
    },
    Sweep,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Frame interval of the isolated context. Absent means the host has
    /// none and the baseline stays at its default.
    #[serde(default)]
    pub baseline_interval_ms: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<NodeDecl>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Trace {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json_pretty(&self) -> StResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub entries: Vec<ScrollTimingEntry>,
    pub rates: RefreshRates,
}

struct NodeTable {
    ids: HashMap<String, NodeId>,
}

impl NodeTable {
    fn get(&self, name: &str) -> StResult<NodeId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ScrollTimingError::UnknownNode(name.to_string()))
    }

    fn get_opt(&self, name: &Option<String>) -> StResult<Option<NodeId>> {
        name.as_deref().map(|n| self.get(n)).transpose()
    }
}

fn build_dom(nodes: &[NodeDecl]) -> StResult<(VirtualDom, NodeTable)> {
    let mut dom = VirtualDom::new();
    let mut table = NodeTable {
        ids: HashMap::from([
            (HTML_ID.to_string(), dom.html()),
            (BODY_ID.to_string(), dom.body_element()),
        ]),
    };

    for decl in nodes {
        if table.ids.contains_key(&decl.id) {
            return Err(ScrollTimingError::Trace(format!(
                "node '{}' declared twice",
                decl.id
            )));
        }
        let parent = match &decl.parent {
            Some(p) => table.get(p)?,
            None => dom.body_element(),
        };
        let node = match decl.kind {
            NodeKindDecl::Element => dom.create_element(parent),
            NodeKindDecl::Text => dom.create_text(parent),
            NodeKindDecl::ShadowRoot => dom.attach_shadow(parent),
        };
        dom.set_overflow(
            node,
            OverflowStyle {
                x: decl.overflow_x,
                y: decl.overflow_y,
            },
        );
        dom.set_geometry(node, decl.geometry);
        dom.set_scroll_offset(node, decl.offset);
        table.ids.insert(decl.id.clone(), node);
    }

    Ok((dom, table))
}

/// Runs `trace` to completion and returns what the engine reported.
pub fn replay(trace: &Trace, config: &TimingConfig) -> StResult<ReplayOutcome> {
    let (dom, table) = build_dom(&trace.nodes)?;

    let mut host = VirtualHost::new(dom);
    if let Some(interval) = trace.baseline_interval_ms {
        host = host.with_background_vsync(interval);
    }

    let engine = ScrollTimingEngine::new(host, StaticObserverBackend::default(), config.clone());
    let mut sim = Simulation::new(engine);
    let entries = sim.record_entries();
    sim.engine_mut().initialize();

    let mut steps: Vec<&Step> = trace.steps.iter().collect();
    steps.sort_by(|a, b| a.at.total_cmp(&b.at));

    for step in steps {
        debug!("t={:.2} {:?}", step.at, step.action);
        apply(&mut sim, &table, step)?;
    }
    sim.run_until_idle();

    let estimator = sim.engine_mut().estimator_mut();
    if estimator.is_baseline_running() {
        estimator.wait_for_baseline(Duration::from_millis(500));
    } else {
        estimator.poll_baseline();
    }

    let rates = sim.engine().rates();
    let entries = entries.borrow().clone();
    info!("Replay produced {} entries", entries.len());
    Ok(ReplayOutcome { entries, rates })
}

fn apply(sim: &mut Simulation, table: &NodeTable, step: &Step) -> StResult<()> {
    let at = step.at;
    match &step.action {
        Action::Wheel { target } => sim.wheel(at, table.get(target)?),
        Action::TouchStart { target } => sim.touch_start(at, table.get(target)?),
        Action::TouchMove { target } => sim.touch_move(at, table.get(target)?),
        Action::KeyDown { key } => sim.key_down(at, key),
        Action::Focus { target } => {
            let node = table.get_opt(target)?;
            sim.focus(at, node);
        }
        Action::Scroll { target, top, left } => {
            let element = match target {
                Some(t) => table.get(t)?,
                None => root_scroller(sim.dom()),
            };
            let current = sim.dom().scroll_offset(element);
            let offset = ScrollOffset {
                top: top.unwrap_or(current.top),
                left: left.unwrap_or(current.left),
            };
            match target {
                Some(_) => sim.scroll_to(at, element, offset),
                None => {
                    // Document-level scrolls report the document as target.
                    sim.advance_to(at);
                    sim.dom_mut().set_scroll_offset(element, offset);
                    let document = sim.dom().document();
                    sim.scroll_event(at, Some(EventTarget::Node(document)));
                }
            }
        }
        Action::Frame => sim.frame(at),
        Action::Frames { until, interval } => {
            match frame_count(at, *until, *interval) {
                None => {
                    return Err(ScrollTimingError::Trace(format!(
                        "frames interval must be at least {} ms, got {}",
                        MIN_FRAME_INTERVAL_MS, interval
                    )))
                }
                Some(count) if count > MAX_FRAMES_PER_STEP => {
                    return Err(ScrollTimingError::Trace(format!(
                        "frames step at {} would present {} frames, limit is {}",
                        at, count, MAX_FRAMES_PER_STEP
                    )))
                }
                Some(_) => {}
            }
            sim.frames(at, *until, *interval)
        }
        Action::Hint { target, source } => {
            let node = table.get_opt(target)?;
            sim.hint(at, node, source);
        }
        Action::Detach { target } => sim.detach(at, table.get(target)?),
        Action::Sweep => {
            sim.sweep(at);
        }
        Action::Idle => sim.advance_to(at),
    }
    Ok(())
}
