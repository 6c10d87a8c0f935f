use std::path::Path;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::PipelineError;
use crate::table::Table;
use crate::workspace::Workspace;

/// Captured output of a finished download step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait Downloader {
    /// Fetches the sequences listed in `metadata_file`.
    fn download(&self, metadata_file: &Utf8Path) -> Result<DownloadOutput, PipelineError>;
}

/// Runs the bulk FASTA download script with the results file as its only
/// argument.
#[derive(Debug, Clone)]
pub struct ScriptDownloader {
    script: Utf8PathBuf,
    cwd: Option<Utf8PathBuf>,
}

impl ScriptDownloader {
    pub fn new(script: Utf8PathBuf) -> Self {
        Self { script, cwd: None }
    }

    pub fn in_dir(mut self, cwd: Utf8PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }
}

impl Downloader for ScriptDownloader {
    fn download(&self, metadata_file: &Utf8Path) -> Result<DownloadOutput, PipelineError> {
        let mut cmd = Command::new(self.script.as_std_path());
        cmd.arg(metadata_file.as_std_path());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir.as_std_path());
        }
        let output = cmd.output().map_err(|err| PipelineError::DownloadSpawn {
            script: self.script.to_string(),
            message: err.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stdout.is_empty() {
            tracing::info!(target: "download", "{stdout}");
        }
        if !stderr.is_empty() {
            tracing::warn!(target: "download", "{stderr}");
        }

        if output.status.success() {
            return Ok(DownloadOutput { stdout, stderr });
        }
        let status = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        };
        Err(PipelineError::DownloadFailed { status, stderr })
    }
}

pub fn parse_search_results(body: &str) -> Result<Table, PipelineError> {
    Ok(Table::from_tsv_str(body)?.with_label("search results"))
}

/// Writes `table` to `path` unchanged, replacing any earlier file.
pub fn materialize(table: &Table, path: &Utf8Path) -> Result<(), PipelineError> {
    let content = table.to_tsv_bytes()?;
    Workspace::write_bytes_atomic(path, &content)?;
    tracing::info!(rows = table.len(), path = %path, "search results written");
    Ok(())
}

pub fn read_search_results(path: &Path) -> Result<Table, PipelineError> {
    Ok(Table::read_tsv(path)?.with_label("search results"))
}
