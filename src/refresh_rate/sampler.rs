use crate::config::TimingConfig;
use crate::host::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    /// Frames per second.
    pub rate: f64,
    /// Accepted deltas the median was taken over.
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleProgress {
    Continue,
    /// The window is full. `None` if too few deltas passed the range filter.
    Done(Option<RateEstimate>),
}

/// One measurement cycle over a fixed number of frame callbacks.
///
/// Shared by the background and the main-thread measurement so both apply
/// the same range filter and the same median.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    deltas: Vec<f64>,
    last_timestamp: Option<Timestamp>,
    callbacks: usize,
    window: usize,
    min_samples: usize,
    min_delta: f64,
    max_delta: f64,
}

impl FrameSampler {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            deltas: Vec::with_capacity(config.refresh_rate_samples),
            last_timestamp: None,
            callbacks: 0,
            window: config.refresh_rate_samples,
            min_samples: config.min_samples_for_calculation,
            min_delta: config.frame_time_min_ms,
            max_delta: config.frame_time_max_ms,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp) -> SampleProgress {
        if let Some(last) = self.last_timestamp {
            let delta = timestamp - last;
            if delta > self.min_delta && delta < self.max_delta {
                self.deltas.push(delta);
            }
        }
        self.last_timestamp = Some(timestamp);
        self.callbacks += 1;

        if self.callbacks < self.window {
            SampleProgress::Continue
        } else {
            SampleProgress::Done(estimate_rate(&self.deltas, self.min_samples))
        }
    }

    pub fn accepted(&self) -> usize {
        self.deltas.len()
    }

    pub fn callbacks(&self) -> usize {
        self.callbacks
    }
}

/// Upper median. Sorting uses a total order so stray NaNs cannot panic.
pub fn median(deltas: &[f64]) -> Option<f64> {
    if deltas.is_empty() {
        return None;
    }
    let mut sorted = deltas.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

pub fn estimate_rate(deltas: &[f64], min_samples: usize) -> Option<RateEstimate> {
    if deltas.len() < min_samples {
        return None;
    }
    let median = median(deltas)?;
    if median <= 0.0 {
        return None;
    }
    Some(RateEstimate {
        rate: 1000.0 / median,
        samples: deltas.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_counts_callbacks_not_deltas() {
        let config = TimingConfig::default();
        let mut sampler = FrameSampler::new(&config);
        let mut progress = SampleProgress::Continue;
        for i in 0..config.refresh_rate_samples {
            progress = sampler.record(i as f64 * 10.0);
        }
        assert_eq!(sampler.callbacks(), 60);
        assert_eq!(sampler.accepted(), 59);
        match progress {
            SampleProgress::Done(Some(est)) => assert!((est.rate - 100.0).abs() < 1e-9),
            other => panic!("expected a finished estimate, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_deltas_are_dropped() {
        let config = TimingConfig::default();
        let mut sampler = FrameSampler::new(&config);
        sampler.record(0.0);
        sampler.record(0.0); // zero delta
        sampler.record(500.0); // tab switch
        sampler.record(516.0);
        assert_eq!(sampler.accepted(), 1);
    }

    #[test]
    fn median_is_upper_middle() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
        assert_eq!(median(&[]), None);
    }
}
