use super::sampler::{FrameSampler, RateEstimate, SampleProgress};
use crate::config::TimingConfig;
use crate::error::{ScrollTimingError, StResult};
use crate::host::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Frame clock of an isolated scheduling context. Blocks until the next
/// frame and returns its timestamp, or `None` once the source is gone.
pub trait VsyncSource {
    fn next_frame(&mut self) -> Option<Timestamp>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerCommand {
    Start,
}

/// Sent once per cycle. When too few deltas passed the range filter, `rate`
/// is the previously published figure and `samples` stays below the minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerMessage {
    RefreshRate { rate: f64, samples: usize },
}

/// A rate written by one context and read by another.
#[derive(Debug)]
pub struct PublishedRate(AtomicU64);

impl PublishedRate {
    pub fn new(rate: f64) -> Self {
        Self(AtomicU64::new(rate.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, rate: f64) {
        self.0.store(rate.to_bits(), Ordering::Release);
    }
}

/// Main-side handle of the background measurement thread.
///
/// A cycle stays in flight from `start` until its report has been taken off
/// the channel, not merely until the thread stops sampling.
pub struct BaselineWorker {
    commands: Sender<WorkerCommand>,
    reports: Receiver<WorkerMessage>,
    in_flight: bool,
}

impl BaselineWorker {
    pub fn spawn(
        source: Box<dyn VsyncSource + Send>,
        config: &TimingConfig,
        published: Arc<PublishedRate>,
    ) -> StResult<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();
        let worker_config = config.clone();
        thread::Builder::new()
            .name("scroll-timing-baseline".to_string())
            .spawn(move || {
                worker_loop(
                    source,
                    worker_config,
                    command_rx,
                    report_tx,
                    published,
                )
            })
            .map_err(|e| ScrollTimingError::BackgroundUnavailable(e.to_string()))?;

        Ok(Self {
            commands: command_tx,
            reports: report_rx,
            in_flight: false,
        })
    }

    /// Requests one measurement cycle. Returns `false` without doing anything
    /// while a cycle is in flight, or if the thread has gone away.
    pub fn start(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        if self.commands.send(WorkerCommand::Start).is_err() {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn is_running(&self) -> bool {
        self.in_flight
    }

    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        match self.reports.try_recv() {
            Ok(message) => {
                self.in_flight = false;
                Some(message)
            }
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                None
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<WorkerMessage> {
        match self.reports.recv_timeout(timeout) {
            Ok(message) => {
                self.in_flight = false;
                Some(message)
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                None
            }
            Err(RecvTimeoutError::Timeout) => None,
        }
    }
}

fn worker_loop(
    mut source: Box<dyn VsyncSource + Send>,
    config: TimingConfig,
    commands: Receiver<WorkerCommand>,
    reports: Sender<WorkerMessage>,
    published: Arc<PublishedRate>,
) {
    for command in commands.iter() {
        match command {
            WorkerCommand::Start => {
                let message = match measure(source.as_mut(), &config) {
                    Ok(est) => {
                        published.store(est.rate);
                        WorkerMessage::RefreshRate {
                            rate: est.rate,
                            samples: est.samples,
                        }
                    }
                    Err(accepted) => {
                        debug!("Baseline cycle finished with only {} samples", accepted);
                        WorkerMessage::RefreshRate {
                            rate: published.load(),
                            samples: accepted,
                        }
                    }
                };
                if reports.send(message).is_err() {
                    return;
                }
            }
        }
    }
}

/// Runs one window. On failure returns how many deltas were accepted.
fn measure(source: &mut dyn VsyncSource, config: &TimingConfig) -> Result<RateEstimate, usize> {
    let mut sampler = FrameSampler::new(config);
    while let Some(timestamp) = source.next_frame() {
        if let SampleProgress::Done(estimate) = sampler.record(timestamp) {
            return estimate.ok_or(sampler.accepted());
        }
    }
    debug!(
        "Baseline frame source closed after {} callbacks",
        sampler.callbacks()
    );
    Err(sampler.accepted())
}
