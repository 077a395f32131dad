use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use scroll_timing::config::TimingConfig;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON timing config. Flags given on the command line override it.
    #[arg(global = true, long = "config")]
    config_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded interaction trace.
    Replay(cmd::replay::ReplayArgs),
    /// Generate and replay a synthetic gesture.
    Simulate(cmd::simulate::SimulateArgs),
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let (cli_config, sub_name) = match &cli.command {
        Commands::Replay(args) => (&args.config, "replay"),
        Commands::Simulate(args) => (&args.config, "simulate"),
    };

    let config = match &cli.config_file {
        Some(path) => {
            info!("⚙️  Loading config from: {}", path.display());
            let mut file_config = TimingConfig::load_from_file(path).unwrap_or_else(|e| {
                error!("{}", e);
                process::exit(1);
            });
            if let Some(sub_matches) = matches.subcommand_matches(sub_name) {
                file_config.merge_from_cli(cli_config, sub_matches);
            }
            file_config
        }
        None => cli_config.clone(),
    };

    if let Err(e) = config.validate() {
        error!("{}", e);
        process::exit(1);
    }

    let result = match &cli.command {
        Commands::Replay(args) => cmd::replay::run(args, &config),
        Commands::Simulate(args) => cmd::simulate::run(args, &config),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
