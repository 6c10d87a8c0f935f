use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::NaiveDate;

use ena_metadata::error::PipelineError;
use ena_metadata::retrieval::{materialize, parse_search_results, read_search_results};
use ena_metadata::workspace::Workspace;

const BODY: &str = "accession\tcountry\tcollection_date\thost\tstrain\n\
OP612696\tGermany:Bavaria\t2022-06-01\tHomo sapiens\t\n\
ON563414\tUSA\t2022-05-17\t\tMPXV_USA_2022_MA001\n";

fn workspace(temp: &tempfile::TempDir) -> Workspace {
    Workspace::new(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap())
}

#[test]
fn dated_results_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = workspace(&temp);
    let date = NaiveDate::from_ymd_opt(2022, 9, 7).unwrap();
    let path = workspace.search_results_path("sequence", date);
    assert!(path.ends_with("ENA_Search_sequence_07092022.tsv"));

    let table = parse_search_results(BODY).unwrap();
    materialize(&table, &path).unwrap();
    let reread = read_search_results(path.as_std_path()).unwrap();

    assert_eq!(reread, table);
    assert_eq!(reread.columns(), table.columns());
    assert_eq!(reread.value(0, "strain"), None);
    assert_eq!(reread.value(1, "strain"), Some("MPXV_USA_2022_MA001"));
}

#[test]
fn same_day_rerun_overwrites() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = workspace(&temp);
    let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let path = workspace.search_results_path("sequence", date);

    materialize(&parse_search_results(BODY).unwrap(), &path).unwrap();
    let smaller = parse_search_results("accession\tcountry\nMT903340\tNigeria\n").unwrap();
    materialize(&smaller, &path).unwrap();

    let content = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert_eq!(content, "accession\tcountry\nMT903340\tNigeria\n");
}

#[test]
fn empty_response_is_malformed() {
    let err = parse_search_results("").unwrap_err();
    assert_matches!(err, PipelineError::MalformedTable(_));
}

#[cfg(unix)]
mod script {
    use std::os::unix::fs::PermissionsExt;

    use assert_matches::assert_matches;
    use camino::{Utf8Path, Utf8PathBuf};

    use ena_metadata::error::PipelineError;
    use ena_metadata::retrieval::{Downloader, ScriptDownloader};

    fn write_script(dir: &Utf8Path, body: &str) -> Utf8PathBuf {
        let path = dir.join("download_fasta.sh");
        std::fs::write(path.as_std_path(), format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(path.as_std_path()).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path.as_std_path(), perms).unwrap();
        path
    }

    #[test]
    fn script_receives_results_file() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let script = write_script(&dir, "echo \"fetching $1\"; echo warn >&2");

        let output = ScriptDownloader::new(script)
            .in_dir(dir)
            .download(Utf8Path::new("ENA_Search_sequence_07092022.tsv"))
            .unwrap();
        assert_eq!(output.stdout, "fetching ENA_Search_sequence_07092022.tsv");
        assert_eq!(output.stderr, "warn");
    }

    #[test]
    fn non_zero_exit_is_download_failure() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let script = write_script(&dir, "echo 'no accessions' >&2; exit 3");

        let err = ScriptDownloader::new(script)
            .in_dir(dir)
            .download(Utf8Path::new("ENA_Search_sequence_07092022.tsv"))
            .unwrap_err();
        assert_matches!(
            err,
            PipelineError::DownloadFailed { ref status, ref stderr }
                if status == "exit code 3" && stderr == "no accessions"
        );
    }
}
