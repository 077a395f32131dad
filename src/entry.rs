use crate::host::{NodeId, NodeKind, Timestamp};
use crate::source::ScrollSource;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

pub const SCROLL_ENTRY_TYPE: &str = "scroll";

/// What a caller claims the scrolled target is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRef {
    pub node: NodeId,
    pub kind: NodeKind,
}

/// Unchecked input to [`ScrollTimingEntry::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawScrollTiming {
    pub start_time: f64,
    pub first_frame_time: f64,
    pub duration: f64,
    pub frames_expected: f64,
    pub frames_produced: f64,
    pub checkerboard_time: f64,
    pub scroll_source: String,
    pub target: Option<TargetRef>,
    pub delta_x: f64,
    pub delta_y: f64,
}

/// Timing of one finished scroll gesture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollTimingEntry {
    entry_type: &'static str,
    name: &'static str,
    start_time: Timestamp,
    first_frame_time: Timestamp,
    duration: f64,
    frames_expected: u32,
    frames_produced: u32,
    checkerboard_time: f64,
    scroll_source: ScrollSource,
    target: Option<NodeId>,
    delta_x: f64,
    delta_y: f64,
    #[serde(skip)]
    scroll_start_latency: f64,
}

fn non_negative(field: &str, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        return value;
    }
    warn!("Invalid {}: {}, defaulting to 0", field, value);
    0.0
}

fn frame_count(field: &str, value: f64) -> u32 {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        return value as u32;
    }
    warn!("Invalid {}: {}, defaulting to 0", field, value);
    if value.is_finite() {
        // `as` saturates, so oversized counts pin to u32::MAX.
        value.floor().max(0.0) as u32
    } else {
        0
    }
}

fn signed_delta(field: &str, value: f64) -> f64 {
    if value.is_finite() {
        return value;
    }
    warn!("Invalid {}: {}, defaulting to 0", field, value);
    0.0
}

impl ScrollTimingEntry {
    /// Builds an entry, coercing every bad field to a safe default instead
    /// of failing. Reporting must never be the thing that breaks.
    pub fn new(raw: RawScrollTiming) -> Self {
        let start_time = non_negative("startTime", raw.start_time);
        let mut first_frame_time = non_negative("firstFrameTime", raw.first_frame_time);
        if first_frame_time < start_time {
            warn!(
                "firstFrameTime {} precedes startTime {}, clamping",
                first_frame_time, start_time
            );
            first_frame_time = start_time;
        }

        let scroll_source = match ScrollSource::from_str(&raw.scroll_source) {
            Ok(source) => source,
            Err(_) => {
                warn!(
                    "Invalid scrollSource: {:?}, defaulting to 'other'",
                    raw.scroll_source
                );
                ScrollSource::Other
            }
        };

        let target = match raw.target {
            None => None,
            Some(TargetRef {
                node,
                kind: NodeKind::Element,
            }) => Some(node),
            Some(_) => {
                warn!("Invalid target, setting to null");
                None
            }
        };

        Self {
            entry_type: SCROLL_ENTRY_TYPE,
            name: SCROLL_ENTRY_TYPE,
            start_time,
            first_frame_time,
            duration: non_negative("duration", raw.duration),
            frames_expected: frame_count("framesExpected", raw.frames_expected),
            frames_produced: frame_count("framesProduced", raw.frames_produced),
            checkerboard_time: non_negative("checkerboardTime", raw.checkerboard_time),
            scroll_source,
            target,
            delta_x: signed_delta("deltaX", raw.delta_x),
            delta_y: signed_delta("deltaY", raw.delta_y),
            scroll_start_latency: first_frame_time - start_time,
        }
    }

    pub fn entry_type(&self) -> &'static str {
        self.entry_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn first_frame_time(&self) -> Timestamp {
        self.first_frame_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frames_expected(&self) -> u32 {
        self.frames_expected
    }

    pub fn frames_produced(&self) -> u32 {
        self.frames_produced
    }

    pub fn checkerboard_time(&self) -> f64 {
        self.checkerboard_time
    }

    pub fn scroll_source(&self) -> ScrollSource {
        self.scroll_source
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn delta_x(&self) -> f64 {
        self.delta_x
    }

    pub fn delta_y(&self) -> f64 {
        self.delta_y
    }

    /// Time from the initiating input to the first frame.
    pub fn scroll_start_latency(&self) -> f64 {
        self.scroll_start_latency
    }

    /// Produced over expected frames. 1.0 when nothing was expected.
    pub fn smoothness(&self) -> f64 {
        if self.frames_expected == 0 {
            return 1.0;
        }
        self.frames_produced as f64 / self.frames_expected as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The entries handed to one observer callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryList {
    entries: Vec<ScrollTimingEntry>,
}

impl EntryList {
    pub fn new(entries: Vec<ScrollTimingEntry>) -> Self {
        Self { entries }
    }

    pub fn get_entries(&self) -> &[ScrollTimingEntry] {
        &self.entries
    }

    pub fn get_entries_by_type(&self, entry_type: &str) -> Vec<&ScrollTimingEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
