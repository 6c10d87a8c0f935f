use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{SearchSpec, SequenceFormat};
use crate::error::PipelineError;
use crate::workspace::{
    DEFAULT_LINEAGE_FILE, DEFAULT_MERGED_FILE, DEFAULT_SEQUENCES_FILE, Workspace,
    default_cleaned_sequences_file,
};

pub const DEFAULT_CONFIG_FILE: &str = "ena-metadata.json";
pub const DEFAULT_QUERY: &str = r#"tax_tree(10244) AND country="*" AND collection_date="*""#;
pub const DEFAULT_RESULT_TYPE: &str = "sequence";
pub const DEFAULT_DATA_PORTAL: &str = "ena";
pub const DEFAULT_DOWNLOAD_SCRIPT: &str = "./download_fasta.sh";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub searches: Vec<SearchEntry>,
    #[serde(default)]
    pub sequence_format: Option<SequenceFormat>,
    #[serde(default)]
    pub download_script: Option<String>,
    #[serde(default)]
    pub sequences_file: Option<String>,
    #[serde(default)]
    pub lineage_file: Option<String>,
    #[serde(default)]
    pub cleaned_sequences_file: Option<String>,
    #[serde(default)]
    pub merged_file: Option<String>,
    #[serde(default)]
    pub annotate_descriptions: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SearchEntry {
    /// A bare query string searched with the default fields.
    Shorthand(String),
    Detailed(SearchEntryObject),
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchEntryObject {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default)]
    pub data_portal: Option<String>,
    #[serde(default)]
    pub authentication: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub searches: Vec<SearchSpec>,
    pub sequence_format: SequenceFormat,
    pub download_script: Utf8PathBuf,
    pub sequences_file: Utf8PathBuf,
    pub lineage_file: Utf8PathBuf,
    pub cleaned_sequences_file: Utf8PathBuf,
    pub merged_file: Utf8PathBuf,
    pub annotate_descriptions: bool,
}

impl ResolvedConfig {
    pub fn requires_credentials(&self) -> bool {
        self.searches.iter().any(|search| search.authentication)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `ena-metadata.json` in the workspace root when
    /// present, or the built-in defaults.
    pub fn resolve(
        path: Option<&str>,
        workspace: &Workspace,
    ) -> Result<ResolvedConfig, PipelineError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => workspace
                .resolve(Utf8Path::new(DEFAULT_CONFIG_FILE))
                .into_std_path_buf(),
        };

        if path.is_none() && !config_path.exists() {
            tracing::info!(
                root = %workspace.root(),
                "no {DEFAULT_CONFIG_FILE} found, using built-in searches"
            );
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PipelineError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| PipelineError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "config loaded");

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PipelineError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let sequence_format = config.sequence_format.unwrap_or(SequenceFormat::Fasta);

        let searches = if config.searches.is_empty() {
            vec![default_search()]
        } else {
            config
                .searches
                .into_iter()
                .map(resolve_search)
                .collect::<Result<Vec<_>, PipelineError>>()?
        };

        Ok(ResolvedConfig {
            schema_version,
            searches,
            sequence_format,
            download_script: path_or(config.download_script, DEFAULT_DOWNLOAD_SCRIPT),
            sequences_file: path_or(config.sequences_file, DEFAULT_SEQUENCES_FILE),
            lineage_file: path_or(config.lineage_file, DEFAULT_LINEAGE_FILE),
            cleaned_sequences_file: path_or(
                config.cleaned_sequences_file,
                default_cleaned_sequences_file(sequence_format),
            ),
            merged_file: path_or(config.merged_file, DEFAULT_MERGED_FILE),
            annotate_descriptions: config.annotate_descriptions.unwrap_or(false),
        })
    }
}

pub fn default_search_fields() -> Vec<String> {
    [
        "country",
        "collection_date",
        "host",
        "strain",
        "isolate",
        "first_public",
        "collected_by",
    ]
    .iter()
    .map(|field| field.to_string())
    .collect()
}

pub fn default_search() -> SearchSpec {
    SearchSpec {
        query: DEFAULT_QUERY.to_string(),
        fields: default_search_fields(),
        result_type: DEFAULT_RESULT_TYPE.to_string(),
        data_portal: DEFAULT_DATA_PORTAL.to_string(),
        authentication: false,
    }
}

fn resolve_search(entry: SearchEntry) -> Result<SearchSpec, PipelineError> {
    match entry {
        SearchEntry::Shorthand(query) => Ok(SearchSpec {
            query,
            ..default_search()
        }),
        SearchEntry::Detailed(obj) => {
            let authentication = obj.authentication.unwrap_or(false);
            let query = match obj.query {
                Some(query) => query,
                None if authentication => String::new(),
                None => {
                    return Err(PipelineError::InvalidConfig(
                        "search without authentication requires a query".to_string(),
                    ));
                }
            };
            let fields = obj.fields.unwrap_or_else(default_search_fields);
            if fields.is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "search fields must not be empty".to_string(),
                ));
            }
            Ok(SearchSpec {
                query,
                fields,
                result_type: obj
                    .result_type
                    .unwrap_or_else(|| DEFAULT_RESULT_TYPE.to_string()),
                data_portal: obj
                    .data_portal
                    .unwrap_or_else(|| DEFAULT_DATA_PORTAL.to_string()),
                authentication,
            })
        }
    }
}

fn path_or(value: Option<String>, default: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(value.unwrap_or_else(|| default.to_string()))
}
