use assert_matches::assert_matches;
use bio::io::{fasta, fastq};
use camino::Utf8PathBuf;

use ena_metadata::domain::{Accession, SequenceFormat};
use ena_metadata::error::PipelineError;
use ena_metadata::sequences::SequenceNormalizer;
use ena_metadata::table::Table;

fn search_results() -> Table {
    Table::from_tsv_str(
        "accession\tcountry\tcollection_date\thost\tstrain\tisolate\n\
OP612696\tGermany:Bavaria\t2022-06-01\tHomo sapiens\tMPXV/Germany/2022/RKI01\t\n\
ON563414\tUSA\t2022-05-17\t\t\tMPXV_USA_2022_MA001\n\
MT903340\tNigeria\t2018-09-01\tHomo sapiens\t\t\n",
    )
    .unwrap()
}

fn scratch(temp: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join(name)).unwrap()
}

#[test]
fn headers_reduced_to_accession() {
    let temp = tempfile::tempdir().unwrap();
    let input = scratch(&temp, "sequences.fasta");
    let output = scratch(&temp, "insdc_cleaned_sequences.fasta");
    std::fs::write(
        input.as_std_path(),
        ">ENA|OP612696|OP612696.1 Monkeypox virus isolate MPXV/Germany/2022/RKI01\nACGT\nACGT\n\
>ENA|ON563414|ON563414.3 Monkeypox virus isolate MPXV_USA_2022_MA001\nTTGA\n",
    )
    .unwrap();

    let metadata = search_results();
    let summary = SequenceNormalizer::new(&metadata, input, SequenceFormat::Fasta)
        .process(&output)
        .unwrap();
    assert_eq!(summary.records, 2);

    let records: Vec<fasta::Record> = fasta::Reader::from_file(output.as_std_path())
        .unwrap()
        .records()
        .map(|record| record.unwrap())
        .collect();
    assert_eq!(records[0].id(), "OP612696");
    assert_eq!(records[0].desc(), None);
    assert_eq!(records[0].seq(), b"ACGTACGT");
    assert_eq!(records[1].id(), "ON563414");
    assert_eq!(records[1].seq(), b"TTGA");
}

#[test]
fn header_without_accession_aborts() {
    let temp = tempfile::tempdir().unwrap();
    let input = scratch(&temp, "sequences.fasta");
    let output = scratch(&temp, "insdc_cleaned_sequences.fasta");
    std::fs::write(
        input.as_std_path(),
        ">ENA|OP612696|OP612696.1 Monkeypox virus\nACGT\n>MT903340.1 Monkeypox virus\nACGT\n",
    )
    .unwrap();

    let metadata = search_results();
    let err = SequenceNormalizer::new(&metadata, input, SequenceFormat::Fasta)
        .process(&output)
        .unwrap_err();
    assert_matches!(err, PipelineError::MissingAccession(ref header) if header.starts_with("MT903340.1"));
    assert!(!output.as_std_path().exists());
}

#[test]
fn missing_input_is_sequence_error() {
    let temp = tempfile::tempdir().unwrap();
    let metadata = search_results();
    let err = SequenceNormalizer::new(
        &metadata,
        scratch(&temp, "absent.fasta"),
        SequenceFormat::Fasta,
    )
    .process(&scratch(&temp, "out.fasta"))
    .unwrap_err();
    assert_matches!(err, PipelineError::SequenceIo(_));
}

#[test]
fn strain_falls_back_to_isolate_then_accession() {
    let metadata = search_results();
    let normalizer = SequenceNormalizer::new(
        &metadata,
        Utf8PathBuf::from("sequences.fasta"),
        SequenceFormat::Fasta,
    );

    let with_strain = normalizer
        .lookup_metadata(&"OP612696".parse::<Accession>().unwrap())
        .unwrap();
    assert_eq!(with_strain.strain, "MPXV/Germany/2022/RKI01");
    assert_eq!(with_strain.country.as_deref(), Some("Germany:Bavaria"));

    let with_isolate = normalizer
        .lookup_metadata(&"ON563414".parse::<Accession>().unwrap())
        .unwrap();
    assert_eq!(with_isolate.strain, "MPXV_USA_2022_MA001");
    assert_eq!(with_isolate.host, None);

    let bare = normalizer
        .lookup_metadata(&"MT903340".parse::<Accession>().unwrap())
        .unwrap();
    assert_eq!(bare.strain, "MT903340");
    assert_eq!(bare.collection_date.as_deref(), Some("2018-09-01"));
}

#[test]
fn unknown_accession_lookup_fails() {
    let metadata = search_results();
    let normalizer = SequenceNormalizer::new(
        &metadata,
        Utf8PathBuf::from("sequences.fasta"),
        SequenceFormat::Fasta,
    );
    let err = normalizer
        .lookup_metadata(&"ZZ000000".parse::<Accession>().unwrap())
        .unwrap_err();
    assert_matches!(err, PipelineError::AccessionNotFound(_));
}

#[test]
fn annotated_descriptions_carry_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let input = scratch(&temp, "sequences.fasta");
    let output = scratch(&temp, "cleaned.fasta");
    std::fs::write(input.as_std_path(), ">ENA|MT903340|MT903340.1 Monkeypox\nACGT\n").unwrap();

    let metadata = search_results();
    SequenceNormalizer::new(&metadata, input, SequenceFormat::Fasta)
        .annotate_descriptions(true)
        .process(&output)
        .unwrap();

    let record = fasta::Reader::from_file(output.as_std_path())
        .unwrap()
        .records()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(record.id(), "MT903340");
    assert_eq!(record.desc(), Some("Nigeria|2018-09-01|Homo sapiens|MT903340"));
}

#[test]
fn fastq_keeps_qualities() {
    let temp = tempfile::tempdir().unwrap();
    let input = scratch(&temp, "sequences.fastq");
    let output = scratch(&temp, "cleaned.fastq");
    std::fs::write(
        input.as_std_path(),
        "@ENA|OP612696|OP612696.1 read\nACGT\n+\nIIII\n",
    )
    .unwrap();

    let metadata = search_results();
    SequenceNormalizer::new(&metadata, input, SequenceFormat::Fastq)
        .process(&output)
        .unwrap();

    let record = fastq::Reader::from_file(output.as_std_path())
        .unwrap()
        .records()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(record.id(), "OP612696");
    assert_eq!(record.seq(), b"ACGT");
    assert_eq!(record.qual(), b"IIII");
}
