use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use serde::Serialize;

use crate::error::PipelineError;
use crate::table::{Cell, Table};
use crate::workspace::Workspace;

pub const ACCESSION_COLUMN: &str = "accession";
pub const LINEAGE_NAME_COLUMN: &str = "seqName";
pub const VERSIONED_ACCESSION_COLUMN: &str = "genbank_accession_rev";

/// Metadata column renames applied before the merge.
pub const COLUMN_RENAMES: [(&str, &str); 3] = [
    ("collection_date", "date"),
    ("collected_by", "institution"),
    ("first_public", "date_submitted"),
];

static ENA_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ENA\|([A-Z0-9]+)\|.*$").expect("static regex"));
static VERSIONED_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z0-9]+\.[0-9]).+$").expect("static regex"));

#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub metadata_rows: usize,
    pub lineage_rows: usize,
    pub merged_rows: usize,
    pub output: String,
}

/// `country` becomes the part before the first `:`; the rest goes to a
/// trailing `region` column, null when there is no colon.
pub fn split_country(metadata: &mut Table) -> Result<(), PipelineError> {
    metadata.split_column("country", "region", ':')
}

pub fn rename_metadata_columns(metadata: &mut Table) -> Result<(), PipelineError> {
    metadata.rename_columns(&COLUMN_RENAMES)
}

/// Accession from an `ENA|<accession>|...` sequence name, or empty.
pub fn lineage_accession(seq_name: &str) -> String {
    capture(&ENA_ACCESSION, seq_name)
}

/// First `<accession>.<version>` in a sequence name, or empty.
pub fn versioned_accession(seq_name: &str) -> String {
    capture(&VERSIONED_ACCESSION, seq_name)
}

/// Adds `accession` and `genbank_accession_rev` derived from `seqName`.
/// Unmatched names get empty strings and never join.
pub fn derive_lineage_columns(lineage: &mut Table) -> Result<(), PipelineError> {
    lineage.derive_column(LINEAGE_NAME_COLUMN, ACCESSION_COLUMN, |name| {
        derived(name, lineage_accession)
    })?;
    lineage.derive_column(LINEAGE_NAME_COLUMN, VERSIONED_ACCESSION_COLUMN, |name| {
        derived(name, versioned_accession)
    })
}

/// Split and rename the search results for merging.
pub fn prepare_metadata(metadata: &mut Table) -> Result<(), PipelineError> {
    let mut required = vec![ACCESSION_COLUMN, "country"];
    required.extend(COLUMN_RENAMES.iter().map(|(from, _)| *from));
    metadata.require_columns(&required)?;
    split_country(metadata)?;
    rename_metadata_columns(metadata)
}

/// Strict inner join on `accession`. Rows without a partner are dropped.
pub fn merge(metadata: &Table, lineage: &Table) -> Result<Table, PipelineError> {
    let merged = metadata.inner_join(lineage, ACCESSION_COLUMN)?;
    let unmatched = metadata.len().saturating_sub(merged.len());
    if unmatched > 0 {
        tracing::info!(unmatched, "metadata rows without a lineage match were dropped");
    }
    Ok(merged.with_label("merged metadata"))
}

/// Runs the whole reconciliation and writes the merged table to `output`.
pub fn reconcile(
    mut metadata: Table,
    mut lineage: Table,
    output: &Utf8Path,
) -> Result<MergeSummary, PipelineError> {
    prepare_metadata(&mut metadata)?;
    derive_lineage_columns(&mut lineage)?;
    let merged = merge(&metadata, &lineage)?;
    Workspace::write_bytes_atomic(output, &merged.to_tsv_bytes()?)?;
    tracing::info!(rows = merged.len(), path = %output, "merged metadata written");

    Ok(MergeSummary {
        metadata_rows: metadata.len(),
        lineage_rows: lineage.len(),
        merged_rows: merged.len(),
        output: output.to_string(),
    })
}

fn capture(regex: &Regex, text: &str) -> String {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn derived(name: Option<&str>, f: fn(&str) -> String) -> Cell {
    Some(name.map(f).unwrap_or_default())
}
