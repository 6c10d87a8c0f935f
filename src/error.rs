use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("malformed table: {0}")]
    MalformedTable(String),

    #[error("missing column `{column}` in {table}")]
    #[diagnostic(help("check the requested search fields and the input file header"))]
    MissingColumn { table: String, column: String },

    #[error("no `|`-delimited accession in sequence header: {0}")]
    MissingAccession(String),

    #[error("accession not found in metadata table: {0}")]
    AccessionNotFound(String),

    #[error("failed to start download script {script}: {message}")]
    DownloadSpawn { script: String, message: String },

    #[error("download script exited with {status}: {stderr}")]
    DownloadFailed { status: String, stderr: String },

    #[error("sequence I/O error: {0}")]
    SequenceIo(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
