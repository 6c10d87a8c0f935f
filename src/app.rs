use std::time::{Duration, Instant};

use camino::Utf8Path;
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{Credentials, SearchSpec};
use crate::ena::SearchClient;
use crate::error::PipelineError;
use crate::query::SearchParams;
use crate::reconcile::{self, MergeSummary};
use crate::retrieval::{self, DownloadOutput, Downloader};
use crate::sequences::{NormalizeSummary, SequenceNormalizer};
use crate::table::Table;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub result_type: String,
    pub params: SearchParams,
    pub rows: usize,
    pub results_file: String,
    pub download: DownloadOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub date: String,
    pub searches: Vec<SearchResult>,
    pub sequences: NormalizeSummary,
    pub merge: MergeSummary,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<S: SearchClient, D: Downloader> {
    workspace: Workspace,
    search: S,
    downloader: D,
}

impl<S: SearchClient, D: Downloader> App<S, D> {
    pub fn new(workspace: Workspace, search: S, downloader: D) -> Self {
        Self {
            workspace,
            search,
            downloader,
        }
    }

    /// Runs every configured search, then normalizes the downloaded
    /// sequences and merges the last search's results with the lineage
    /// report. The first failing stage aborts the run.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        credentials: Option<&Credentials>,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let mut searches = Vec::with_capacity(config.searches.len());
        let mut metadata = None;
        for spec in &config.searches {
            let (table, result) = self.retrieve(spec, credentials, date, sink)?;
            searches.push(result);
            metadata = Some(table);
        }
        let metadata = metadata
            .ok_or_else(|| PipelineError::InvalidConfig("no searches configured".to_string()))?;

        let lineage_path = self.workspace.resolve(&config.lineage_file);
        let lineage = Table::read_tsv(lineage_path.as_std_path())?.with_label("lineage report");

        let sequences = self.normalize(config, &metadata, sink)?;

        let start = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=Merge; joining metadata with lineage report".to_string(),
            elapsed: None,
        });
        let merged_path = self.workspace.resolve(&config.merged_file);
        let merge = reconcile::reconcile(metadata, lineage, &merged_path)?;
        sink.event(ProgressEvent {
            message: format!("phase=Merge; {} rows [DONE]", merge.merged_rows),
            elapsed: Some(start.elapsed()),
        });

        Ok(RunReport {
            date: date.format("%d%m%Y").to_string(),
            searches,
            sequences,
            merge,
        })
    }

    /// Query, fetch, materialize and download for one search.
    pub fn retrieve(
        &self,
        spec: &SearchSpec,
        credentials: Option<&Credentials>,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<(Table, SearchResult), PipelineError> {
        let credentials = if spec.authentication {
            Some(credentials.ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "search for `{}` requires credentials",
                    spec.result_type
                ))
            })?)
        } else {
            None
        };

        let params = SearchParams::from_spec(spec);
        tracing::debug!(?params, "search parameters");

        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Search; running data request ({})", spec.result_type),
            elapsed: None,
        });
        let body = self.search.search(&params, credentials)?;
        let table = retrieval::parse_search_results(&body)?;
        let results_path = self.workspace.search_results_path(&spec.result_type, date);
        retrieval::materialize(&table, &results_path)?;
        sink.event(ProgressEvent {
            message: format!("phase=Search; {} rows [DONE]", table.len()),
            elapsed: Some(start.elapsed()),
        });

        let start = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=Download; downloading FASTA sequences".to_string(),
            elapsed: None,
        });
        let file_name = results_path
            .file_name()
            .ok_or_else(|| PipelineError::Filesystem(format!("invalid path {results_path}")))?;
        let download = self.downloader.download(Utf8Path::new(file_name))?;
        sink.event(ProgressEvent {
            message: "phase=Download; [DONE]".to_string(),
            elapsed: Some(start.elapsed()),
        });

        let result = SearchResult {
            result_type: spec.result_type.clone(),
            params,
            rows: table.len(),
            results_file: results_path.to_string(),
            download,
        };
        Ok((table, result))
    }

    fn normalize(
        &self,
        config: &ResolvedConfig,
        metadata: &Table,
        sink: &dyn ProgressSink,
    ) -> Result<NormalizeSummary, PipelineError> {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=Sequences; cleaning sequence headers".to_string(),
            elapsed: None,
        });
        let normalizer = SequenceNormalizer::new(
            metadata,
            self.workspace.resolve(&config.sequences_file),
            config.sequence_format,
        )
        .annotate_descriptions(config.annotate_descriptions);
        let summary =
            normalizer.process(&self.workspace.resolve(&config.cleaned_sequences_file))?;
        sink.event(ProgressEvent {
            message: format!("phase=Sequences; {} records [DONE]", summary.records),
            elapsed: Some(start.elapsed()),
        });
        Ok(summary)
    }
}
