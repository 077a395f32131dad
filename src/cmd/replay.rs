use super::OutputFormat;
use clap::Args;
use scroll_timing::config::TimingConfig;
use scroll_timing::trace::{self, Trace};
use scroll_timing::StResult;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub config: TimingConfig,

    /// JSON trace to replay.
    pub trace: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: &ReplayArgs, config: &TimingConfig) -> StResult<()> {
    info!("📂 Loading trace: {}", args.trace.display());
    let trace = Trace::load_from_file(&args.trace)?;
    info!(
        "▶️  Replaying {} steps over {} declared nodes",
        trace.steps.len(),
        trace.nodes.len()
    );

    let outcome = trace::replay(&trace, config)?;
    super::emit(&outcome, args.format)
}
