use std::time::Duration;

use reqwest::blocking::{Client, Request};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Credentials;
use crate::error::PipelineError;
use crate::query::SearchParams;

pub const ENA_PORTAL_SEARCH_URL: &str = "https://www.ebi.ac.uk/ena/portal/api/search";

pub trait SearchClient {
    /// Runs one search and returns the raw response body.
    fn search(
        &self,
        params: &SearchParams,
        credentials: Option<&Credentials>,
    ) -> Result<String, PipelineError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, PipelineError> {
        Self::with_base_url(ENA_PORTAL_SEARCH_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ena-metadata/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::EnaHttp(err.to_string()))?,
        );

        // limit=0 results stream for as long as the portal needs.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| PipelineError::EnaHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn build_request(
        &self,
        params: &SearchParams,
        credentials: Option<&Credentials>,
    ) -> Result<Request, PipelineError> {
        let mut request = self.client.get(&self.base_url).query(params.as_pairs());
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        request
            .build()
            .map_err(|err| PipelineError::EnaHttp(err.to_string()))
    }
}

impl SearchClient for EnaHttpClient {
    fn search(
        &self,
        params: &SearchParams,
        credentials: Option<&Credentials>,
    ) -> Result<String, PipelineError> {
        let request = self.build_request(params, credentials)?;
        if credentials.is_some() {
            tracing::info!(url = %request.url(), "authenticated ENA search");
        } else {
            tracing::debug!(url = %request.url(), "ENA search");
        }

        let response = self
            .client
            .execute(request)
            .map_err(|err| PipelineError::EnaHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA request failed".to_string());
            return Err(PipelineError::EnaStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| PipelineError::EnaHttp(err.to_string()))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| PipelineError::MalformedTable(format!("response is not UTF-8: {err}")))
    }
}
