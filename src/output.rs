use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Renders progress as log lines on stderr and a summary on stdout.
pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        for search in &report.searches {
            writeln!(
                stdout,
                "> {} search: {} rows -> {}",
                search.result_type, search.rows, search.results_file
            )?;
        }
        writeln!(
            stdout,
            "> sequences: {} records -> {}",
            report.sequences.records, report.sequences.output
        )?;
        writeln!(
            stdout,
            "> merged: {} of {} metadata rows matched {} lineage rows -> {}",
            report.merge.merged_rows,
            report.merge.metadata_rows,
            report.merge.lineage_rows,
            report.merge.output
        )?;
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}
