use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;

use crate::domain::SequenceFormat;
use crate::error::PipelineError;

pub const DEFAULT_SEQUENCES_FILE: &str = "sequences.fasta";
pub const DEFAULT_LINEAGE_FILE: &str = "output/nextclade.tsv";
pub const DEFAULT_MERGED_FILE: &str = "metadata.tsv";

/// Cleaned sequence output name, with the extension of the record format.
pub fn default_cleaned_sequences_file(format: SequenceFormat) -> &'static str {
    match format {
        SequenceFormat::Fasta => "insdc_cleaned_sequences.fasta",
        SequenceFormat::Fastq => "insdc_cleaned_sequences.fastq",
    }
}

/// Working directory of one pipeline run. Relative paths resolve against it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn current() -> Result<Self, PipelineError> {
        let cwd =
            std::env::current_dir().map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| PipelineError::Filesystem("invalid working directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn search_results_path(&self, result_type: &str, date: NaiveDate) -> Utf8PathBuf {
        self.root.join(results_file_name(result_type, date))
    }

    /// Replaces `path` with `content` through a sibling temp file, so a
    /// rerun never appends to or half-overwrites an earlier output.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PipelineError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".ena-metadata")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("write {path}: {err}")))?;
        Ok(())
    }
}

/// `ENA_Search_<result_type>_<DDMMYYYY>.tsv`
pub fn results_file_name(result_type: &str, date: NaiveDate) -> String {
    format!("ENA_Search_{result_type}_{}.tsv", date.format("%d%m%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_results_name() {
        let date = NaiveDate::from_ymd_opt(2022, 9, 7).unwrap();
        assert_eq!(
            results_file_name("sequence", date),
            "ENA_Search_sequence_07092022.tsv"
        );
    }

    #[test]
    fn cleaned_output_follows_format() {
        assert_eq!(
            default_cleaned_sequences_file(SequenceFormat::Fasta),
            "insdc_cleaned_sequences.fasta"
        );
        assert_eq!(
            default_cleaned_sequences_file(SequenceFormat::Fastq),
            "insdc_cleaned_sequences.fastq"
        );
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let workspace = Workspace::new(Utf8PathBuf::from("/data/run"));
        assert_eq!(
            workspace.resolve(Utf8Path::new("output/nextclade.tsv")),
            Utf8PathBuf::from("/data/run/output/nextclade.tsv")
        );
        assert_eq!(
            workspace.resolve(Utf8Path::new("/tmp/x.tsv")),
            Utf8PathBuf::from("/tmp/x.tsv")
        );
    }
}
