pub mod replay;
pub mod simulate;

use crate::reports;
use clap::ValueEnum;
use scroll_timing::trace::ReplayOutcome;
use scroll_timing::StResult;
use std::io;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

pub fn emit(outcome: &ReplayOutcome, format: OutputFormat) -> StResult<()> {
    match format {
        OutputFormat::Table => {
            reports::print_entries_table(&outcome.entries);
            reports::print_summary(&outcome.entries, &outcome.rates);
        }
        OutputFormat::Json => reports::write_json(&outcome.entries, io::stdout().lock())?,
        OutputFormat::Csv => reports::write_csv(&outcome.entries, io::stdout().lock())?,
    }
    Ok(())
}
