//! Refresh-rate estimation.
//!
//! Two measurements run side by side. The baseline is sampled on a
//! background thread against the host's isolated frame clock, so main-thread
//! stalls cannot bias it. The main-thread rate is sampled from ordinary frame
//! callbacks and is the one gesture accounting uses; the baseline only feeds
//! the divergence diagnostic.

pub mod baseline;
pub mod sampler;

pub use baseline::{BaselineWorker, PublishedRate, VsyncSource, WorkerCommand, WorkerMessage};
pub use sampler::{estimate_rate, median, FrameSampler, RateEstimate, SampleProgress};

use crate::config::TimingConfig;
use crate::host::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshRates {
    pub baseline: f64,
    pub main_thread: f64,
}

impl RefreshRates {
    /// Relative shortfall of the main-thread rate. Zero or negative when the
    /// main thread keeps up with the baseline.
    pub fn divergence(&self) -> f64 {
        if self.baseline <= 0.0 {
            return 0.0;
        }
        1.0 - self.main_thread / self.baseline
    }
}

pub struct RefreshRateEstimator {
    config: TimingConfig,
    estimated: f64,
    baseline: Arc<PublishedRate>,
    main_sampler: Option<FrameSampler>,
    worker: Option<BaselineWorker>,
    baseline_unavailable: bool,
}

impl RefreshRateEstimator {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            config: config.clone(),
            estimated: config.default_refresh_rate,
            baseline: Arc::new(PublishedRate::new(config.default_refresh_rate)),
            main_sampler: None,
            worker: None,
            baseline_unavailable: false,
        }
    }

    /// Starts the background measurement. `open_source` is only called the
    /// first time, to create the isolated context. Returns `true` if a new
    /// cycle was started.
    pub fn start_baseline_measurement<F>(&mut self, open_source: F) -> bool
    where
        F: FnOnce() -> Option<Box<dyn VsyncSource + Send>>,
    {
        if let Some(worker) = self.worker.as_mut() {
            return worker.start();
        }
        if self.baseline_unavailable {
            return false;
        }

        let Some(source) = open_source() else {
            warn!(
                "Background context unavailable, using default baseline of {} Hz",
                self.config.default_refresh_rate
            );
            self.baseline_unavailable = true;
            return false;
        };

        match BaselineWorker::spawn(source, &self.config, self.baseline.clone()) {
            Ok(mut worker) => {
                let started = worker.start();
                self.worker = Some(worker);
                started
            }
            Err(e) => {
                warn!(
                    "{}, using default baseline of {} Hz",
                    e, self.config.default_refresh_rate
                );
                self.baseline_unavailable = true;
                false
            }
        }
    }

    /// Returns `true` if a new cycle was started; the caller must then
    /// schedule the first frame callback.
    pub fn start_main_thread_measurement(&mut self) -> bool {
        if self.main_sampler.is_some() {
            return false;
        }
        self.main_sampler = Some(FrameSampler::new(&self.config));
        true
    }

    pub fn is_measuring_main_thread(&self) -> bool {
        self.main_sampler.is_some()
    }

    /// Feeds one main-thread frame. Returns `true` while the cycle wants
    /// another frame.
    pub fn record_main_thread_frame(&mut self, timestamp: Timestamp) -> bool {
        let Some(sampler) = self.main_sampler.as_mut() else {
            return false;
        };
        match sampler.record(timestamp) {
            SampleProgress::Continue => true,
            SampleProgress::Done(estimate) => {
                self.main_sampler = None;
                if let Some(est) = estimate {
                    self.estimated = est.rate;
                    info!(
                        "Main thread measured refresh rate: {:.2} Hz ({} samples)",
                        est.rate, est.samples
                    );
                    self.check_divergence();
                }
                false
            }
        }
    }

    /// Takes a finished background report, if any. Cheap enough to call
    /// every frame. Returns `None` for a cycle that saw too few samples.
    pub fn poll_baseline(&mut self) -> Option<RateEstimate> {
        let message = self.worker.as_mut()?.try_recv()?;
        self.take_report(message)
    }

    /// Blocks up to `timeout` for a background report. Only meant for
    /// tooling that wants the baseline before printing a summary.
    pub fn wait_for_baseline(&mut self, timeout: Duration) -> Option<RateEstimate> {
        let message = self.worker.as_mut()?.recv_timeout(timeout)?;
        self.take_report(message)
    }

    fn take_report(&self, message: WorkerMessage) -> Option<RateEstimate> {
        let WorkerMessage::RefreshRate { rate, samples } = message;
        if samples < self.config.min_samples_for_calculation {
            warn!(
                "Baseline cycle saw only {} usable samples, keeping {:.2} Hz",
                samples, rate
            );
            return None;
        }
        info!(
            "Worker measured baseline refresh rate: {:.2} Hz ({} samples)",
            rate, samples
        );
        self.check_divergence();
        Some(RateEstimate { rate, samples })
    }

    fn check_divergence(&self) {
        let rates = self.rates();
        let divergence = rates.divergence();
        if divergence > self.config.divergence_warn_ratio {
            warn!(
                "Main thread rate {:.2} Hz trails baseline {:.2} Hz by {:.0}%, main thread is likely janky",
                rates.main_thread,
                rates.baseline,
                divergence * 100.0
            );
        }
    }

    pub fn is_baseline_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }

    pub fn estimated_rate(&self) -> f64 {
        self.estimated
    }

    pub fn baseline_rate(&self) -> f64 {
        self.baseline.load()
    }

    pub fn rates(&self) -> RefreshRates {
        RefreshRates {
            baseline: self.baseline_rate(),
            main_thread: self.estimated,
        }
    }

    /// Frame budget at the main-thread rate, in milliseconds.
    pub fn target_frame_duration(&self) -> f64 {
        1000.0 / self.estimated
    }
}
