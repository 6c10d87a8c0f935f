use std::io::Write;

use bio::io::{fasta, fastq};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::{Accession, SequenceFormat};
use crate::error::PipelineError;
use crate::table::Table;
use crate::workspace::Workspace;

/// Returns the text between the first two `|` of a header, e.g. `OP612696`
/// from `ENA|OP612696|Monkeypox virus isolate ...`.
pub fn extract_accession(header: &str) -> Result<Accession, PipelineError> {
    let missing = || PipelineError::MissingAccession(header.to_string());
    let (_, rest) = header.split_once('|').ok_or_else(missing)?;
    let (segment, _) = rest.split_once('|').ok_or_else(missing)?;
    segment.parse().map_err(|_| missing())
}

/// Per-accession view of the search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessionMetadata {
    pub accession: Accession,
    pub country: Option<String>,
    pub collection_date: Option<String>,
    pub host: Option<String>,
    pub strain: String,
}

impl AccessionMetadata {
    pub fn description(&self) -> String {
        [
            self.country.as_deref().unwrap_or(""),
            self.collection_date.as_deref().unwrap_or(""),
            self.host.as_deref().unwrap_or(""),
            self.strain.as_str(),
        ]
        .join("|")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub records: usize,
    pub output: String,
}

#[derive(Debug, Clone)]
struct CleanRecord {
    accession: Accession,
    description: Option<String>,
    seq: Vec<u8>,
    qual: Option<Vec<u8>>,
}

pub struct SequenceNormalizer<'a> {
    metadata: &'a Table,
    sequence_file: Utf8PathBuf,
    format: SequenceFormat,
    annotate: bool,
}

impl<'a> SequenceNormalizer<'a> {
    pub fn new(metadata: &'a Table, sequence_file: Utf8PathBuf, format: SequenceFormat) -> Self {
        Self {
            metadata,
            sequence_file,
            format,
            annotate: false,
        }
    }

    /// Writes `country|collection_date|host|strain` as each record's
    /// description instead of leaving it empty.
    pub fn annotate_descriptions(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Looks up one accession in the search results. Strain falls back to
    /// isolate, then to the accession itself.
    pub fn lookup_metadata(&self, accession: &Accession) -> Result<AccessionMetadata, PipelineError> {
        self.metadata
            .require_columns(&["accession", "country", "collection_date", "host"])?;
        let row = self
            .metadata
            .find_rows("accession", accession.as_str())?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::AccessionNotFound(accession.to_string()))?;

        let owned = |column: &str| self.metadata.value(row, column).map(str::to_string);
        let strain = owned("strain")
            .or_else(|| owned("isolate"))
            .unwrap_or_else(|| accession.to_string());

        Ok(AccessionMetadata {
            accession: accession.clone(),
            country: owned("country"),
            collection_date: owned("collection_date"),
            host: owned("host"),
            strain,
        })
    }

    /// Re-emits every record with its accession as the only label. Any header
    /// without an accession aborts before anything is written.
    pub fn process(&self, output: &Utf8Path) -> Result<NormalizeSummary, PipelineError> {
        let records = match self.format {
            SequenceFormat::Fasta => self.read_fasta()?,
            SequenceFormat::Fastq => self.read_fastq()?,
        };

        let mut buffer = Vec::new();
        match self.format {
            SequenceFormat::Fasta => write_fasta(&mut buffer, &records)?,
            SequenceFormat::Fastq => write_fastq(&mut buffer, &records)?,
        }
        Workspace::write_bytes_atomic(output, &buffer)?;
        tracing::info!(records = records.len(), path = %output, "cleaned sequences written");

        Ok(NormalizeSummary {
            records: records.len(),
            output: output.to_string(),
        })
    }

    fn clean(
        &self,
        id: &str,
        desc: Option<&str>,
        seq: &[u8],
        qual: Option<&[u8]>,
    ) -> Result<CleanRecord, PipelineError> {
        let header = match desc {
            Some(desc) => format!("{id} {desc}"),
            None => id.to_string(),
        };
        let accession = extract_accession(&header)?;
        tracing::debug!(accession = %accession, "sequence record");
        let description = if self.annotate {
            Some(self.lookup_metadata(&accession)?.description())
        } else {
            None
        };
        Ok(CleanRecord {
            accession,
            description,
            seq: seq.to_vec(),
            qual: qual.map(<[u8]>::to_vec),
        })
    }

    fn read_fasta(&self) -> Result<Vec<CleanRecord>, PipelineError> {
        let reader = fasta::Reader::from_file(self.sequence_file.as_std_path()).map_err(|err| {
            PipelineError::SequenceIo(format!("open {}: {err}", self.sequence_file))
        })?;
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| PipelineError::SequenceIo(err.to_string()))?;
            records.push(self.clean(record.id(), record.desc(), record.seq(), None)?);
        }
        Ok(records)
    }

    fn read_fastq(&self) -> Result<Vec<CleanRecord>, PipelineError> {
        let reader = fastq::Reader::from_file(self.sequence_file.as_std_path()).map_err(|err| {
            PipelineError::SequenceIo(format!("open {}: {err}", self.sequence_file))
        })?;
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| PipelineError::SequenceIo(err.to_string()))?;
            records.push(self.clean(
                record.id(),
                record.desc(),
                record.seq(),
                Some(record.qual()),
            )?);
        }
        Ok(records)
    }
}

fn write_fasta<W: Write>(out: W, records: &[CleanRecord]) -> Result<(), PipelineError> {
    let mut writer = fasta::Writer::new(out);
    for record in records {
        let clean = fasta::Record::with_attrs(
            record.accession.as_str(),
            record.description.as_deref(),
            &record.seq,
        );
        writer
            .write_record(&clean)
            .map_err(|err| PipelineError::SequenceIo(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| PipelineError::SequenceIo(err.to_string()))
}

fn write_fastq<W: Write>(out: W, records: &[CleanRecord]) -> Result<(), PipelineError> {
    let mut writer = fastq::Writer::new(out);
    for record in records {
        let qual = record.qual.as_deref().unwrap_or_default();
        let clean = fastq::Record::with_attrs(
            record.accession.as_str(),
            record.description.as_deref(),
            &record.seq,
            qual,
        );
        writer
            .write_record(&clean)
            .map_err(|err| PipelineError::SequenceIo(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| PipelineError::SequenceIo(err.to_string()))
}
