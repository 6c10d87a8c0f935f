use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ena_metadata::app::{App, ProgressSink};
use ena_metadata::config::ConfigLoader;
use ena_metadata::domain::Credentials;
use ena_metadata::ena::EnaHttpClient;
use ena_metadata::error::PipelineError;
use ena_metadata::output::{JsonOutput, OutputMode, TextOutput};
use ena_metadata::retrieval::ScriptDownloader;
use ena_metadata::workspace::Workspace;

#[derive(Parser)]
#[command(name = "ena-metadata")]
#[command(
    about = "Fetch ENA sequence metadata, clean downloaded sequences and merge them with a Nextclade report"
)]
#[command(version, author)]
struct Cli {
    /// JSON config file (default: ena-metadata.json in the workdir when present)
    #[arg(long)]
    config: Option<String>,

    /// Directory that relative input and output paths resolve against
    #[arg(long)]
    workdir: Option<Utf8PathBuf>,

    /// ENA username for authenticated searches (or ENA_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// ENA password for authenticated searches (or ENA_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Print the run report as JSON instead of progress logs
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::EnaHttp(_) | PipelineError::EnaStatus { .. } => 3,
        PipelineError::DownloadSpawn { .. } | PipelineError::DownloadFailed { .. } => 4,
        PipelineError::MalformedTable(_)
        | PipelineError::MissingColumn { .. }
        | PipelineError::MissingAccession(_)
        | PipelineError::AccessionNotFound(_)
        | PipelineError::SequenceIo(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let workspace = match cli.workdir {
        Some(dir) => Workspace::new(dir),
        None => Workspace::current()?,
    };

    let config = ConfigLoader::resolve(cli.config.as_deref(), &workspace)?;
    let credentials = resolve_credentials(cli.username, cli.password);
    if config.requires_credentials() && credentials.is_none() {
        return Err(PipelineError::InvalidConfig(
            "authenticated search configured but no ENA credentials given".to_string(),
        )
        .into());
    }
    let downloader = ScriptDownloader::new(workspace.resolve(&config.download_script))
        .in_dir(workspace.root().to_path_buf());
    let app = App::new(workspace, EnaHttpClient::new()?, downloader);
    let today = chrono::Local::now().date_naive();

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &TextOutput,
    };
    let report = app.run(&config, credentials.as_ref(), today, sink)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_report(&report).into_diagnostic(),
        OutputMode::Interactive => TextOutput::print_report(&report).into_diagnostic(),
    }
}

fn resolve_credentials(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    let username = username.or_else(|| non_empty_env("ENA_USERNAME"))?;
    let password = password
        .or_else(|| non_empty_env("ENA_PASSWORD"))
        .unwrap_or_default();
    Some(Credentials { username, password })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
