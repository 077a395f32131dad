use super::OutputFormat;
use clap::Args;
use scroll_timing::config::TimingConfig;
use scroll_timing::trace::synth::{synthesize, SynthParams};
use scroll_timing::trace;
use scroll_timing::{ScrollSource, ScrollTimingError, StResult};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: TimingConfig,

    /// Input that drives the gesture: touch, wheel, keyboard, other or programmatic.
    #[arg(long, default_value = "wheel")]
    pub source: String,

    /// Vertical distance in pixels.
    #[arg(long, default_value_t = 800.0, allow_negative_numbers = true)]
    pub distance: f64,

    /// Scroll events the distance is spread over.
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Vsync interval in milliseconds.
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    pub interval: f64,

    /// Probability of dropping each frame (0.0 - 1.0).
    #[arg(long, default_value_t = 0.0)]
    pub jank: f64,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Simulate a host without an isolated frame clock.
    #[arg(long, default_value_t = false)]
    pub no_baseline: bool,

    /// Also write the generated trace here.
    #[arg(long)]
    pub save_trace: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: &SimulateArgs, config: &TimingConfig) -> StResult<()> {
    if !(0.0..=1.0).contains(&args.jank) {
        return Err(ScrollTimingError::Config(format!(
            "--jank must be within 0.0..=1.0, got {}",
            args.jank
        )));
    }

    let source: ScrollSource = args.source.parse().map_err(|_| {
        ScrollTimingError::Config(format!(
            "unknown --source {:?}, expected one of: {}",
            args.source,
            ScrollSource::known_names()
        ))
    })?;

    let params = SynthParams {
        source,
        distance: args.distance,
        steps: args.steps,
        interval_ms: args.interval,
        jank: args.jank,
        seed: args.seed,
        quiet_timeout_ms: config.scroll_end_timeout_ms,
        with_baseline: !args.no_baseline,
    };
    info!(
        "🎲 Synthesizing {} gesture: {} px in {} steps, jank {:.0}%",
        params.source,
        params.distance,
        params.steps,
        params.jank * 100.0
    );

    let trace = synthesize(&params);
    if let Some(path) = &args.save_trace {
        fs::write(path, trace.to_json_pretty()?)?;
        info!("💾 Trace written to {}", path.display());
    }

    let outcome = trace::replay(&trace, config)?;
    super::emit(&outcome, args.format)
}
