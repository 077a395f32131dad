use crate::entry::{RawScrollTiming, TargetRef};
use crate::host::{FrameHandle, GestureId, NodeId, NodeKind, ScrollOffset, TimerHandle, Timestamp};
use crate::source::ScrollSource;

/// Bookkeeping for one gesture on one scroller, from its first scroll event
/// until the quiet timeout ends it.
#[derive(Debug, Clone)]
pub struct ActiveScroll {
    pub gesture: GestureId,
    pub source: ScrollSource,
    pub target: NodeId,
    pub start_time: Timestamp,
    pub first_frame_time: Option<Timestamp>,
    pub frame_count: u32,
    pub expected_frames: u32,
    pub last_frame_time: Option<Timestamp>,
    pub last_scroll_event_time: Timestamp,
    pub last_offset: ScrollOffset,
    pub cumulative_delta_x: f64,
    pub cumulative_delta_y: f64,
    pub frame_handle: Option<FrameHandle>,
    pub timer_handle: Option<TimerHandle>,
    pub ended: bool,
}

impl ActiveScroll {
    pub fn new(
        gesture: GestureId,
        source: ScrollSource,
        target: NodeId,
        start_time: Timestamp,
        origin: ScrollOffset,
    ) -> Self {
        Self {
            gesture,
            source,
            target,
            start_time,
            first_frame_time: None,
            frame_count: 0,
            expected_frames: 0,
            last_frame_time: None,
            last_scroll_event_time: start_time,
            last_offset: origin,
            cumulative_delta_x: 0.0,
            cumulative_delta_y: 0.0,
            frame_handle: None,
            timer_handle: None,
            ended: false,
        }
    }

    /// Counts one presented frame.
    ///
    /// `now` stamps the first frame and is clamped to the start time, since
    /// frame timestamps may come from a clock that runs slightly behind.
    /// Gaps between frames are measured on `timestamp` and converted to
    /// expected frames at `target_frame_duration`.
    pub fn record_frame(&mut self, timestamp: Timestamp, now: Timestamp, target_frame_duration: f64) {
        if self.ended {
            return;
        }
        if self.frame_count == 0 {
            self.first_frame_time = Some(now.max(self.start_time));
        }
        self.frame_count = self.frame_count.saturating_add(1);

        let expected = match self.last_frame_time {
            None => 1,
            Some(last) => expected_for_gap(timestamp - last, target_frame_duration),
        };
        self.expected_frames = self.expected_frames.saturating_add(expected);
        self.last_frame_time = Some(timestamp);
    }

    /// Folds the scroller's current position into the running delta.
    pub fn record_scroll(&mut self, now: Timestamp, offset: ScrollOffset) {
        if self.ended {
            return;
        }
        self.last_scroll_event_time = now;
        self.cumulative_delta_y += offset.top - self.last_offset.top;
        self.cumulative_delta_x += offset.left - self.last_offset.left;
        self.last_offset = offset;
    }

    /// Replaces an undetermined source. Anything already attributed stays.
    pub fn upgrade_source(&mut self, source: ScrollSource) -> bool {
        if self.ended || self.source != ScrollSource::Other || source == ScrollSource::Other {
            return false;
        }
        self.source = source;
        true
    }

    pub fn quiet_for(&self, now: Timestamp) -> f64 {
        now - self.last_scroll_event_time
    }

    /// Marks the gesture ended and produces its record. Returns `None` if it
    /// had already ended. Cancelling the frame and timer handles is left to
    /// the caller.
    pub fn finish(&mut self, now: Timestamp) -> Option<RawScrollTiming> {
        if self.ended {
            return None;
        }
        self.ended = true;

        Some(RawScrollTiming {
            start_time: self.start_time,
            first_frame_time: self.first_frame_time.unwrap_or(self.start_time),
            duration: now - self.start_time,
            frames_expected: self.expected_frames as f64,
            frames_produced: self.frame_count as f64,
            checkerboard_time: 0.0,
            scroll_source: self.source.to_string(),
            target: Some(TargetRef {
                node: self.target,
                kind: NodeKind::Element,
            }),
            delta_x: self.cumulative_delta_x,
            delta_y: self.cumulative_delta_y,
        })
    }
}

/// Frames a gap should have held at the target rate, never less than one.
pub fn expected_for_gap(gap: f64, target_frame_duration: f64) -> u32 {
    if !(gap.is_finite() && target_frame_duration > 0.0) {
        return 1;
    }
    let frames = (gap / target_frame_duration).round();
    if frames < 1.0 {
        1
    } else {
        frames.min(u32::MAX as f64) as u32
    }
}
