//! Paginated artifact search against the search endpoint.
//!
//! The search API pages with a continuation token and occasionally falls
//! over under load. 5xx responses are retried a fixed number of times; when
//! the server never recovers, the page degrades to an empty one so the crawl
//! can move past the repository instead of dying mid-run.

use serde::Deserialize;
use tracing::warn;

use crate::client::{ClientError, NexusClient};
use crate::model::Artifact;
use crate::progress::Progress;

/// Total attempts per page before giving up on a flaky server.
const MAX_ATTEMPTS: u32 = 5;

/// One decoded page of search results.
#[derive(Debug)]
pub struct SearchPage {
    /// Artifacts with a usable download URL, in server order.
    pub artifacts: Vec<Artifact>,
    /// Token for the next page; `None` on the last one.
    pub continuation_token: Option<String>,
}

/// Wire shape of the search endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    #[serde(rename = "continuationToken", default)]
    pub continuation_token: Option<String>,
}

impl SearchResponse {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            continuation_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub assets: Vec<SearchAsset>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchAsset {
    #[serde(rename = "downloadUrl", default)]
    pub download_url: String,
}

/// Issues search requests for one artifact extension.
#[derive(Debug, Clone)]
pub struct ArtifactSearch {
    client: NexusClient,
    extension: String,
    group: Option<String>,
}

impl ArtifactSearch {
    /// Creates a search scoped to `extension` and, optionally, one group.
    #[must_use]
    pub fn new(client: NexusClient, extension: impl Into<String>, group: Option<String>) -> Self {
        Self {
            client,
            extension: extension.into(),
            group,
        }
    }

    /// Fetches one search page for `repository`.
    ///
    /// 5xx responses are retried up to [`MAX_ATTEMPTS`] times in total, each
    /// failure recorded in the crawl log; a server that never recovers yields
    /// an empty final page. Items without an asset matching the requested
    /// extension are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ClientError`] for non-2xx responses outside
    /// the 5xx range, network failures, and undecodable bodies.
    pub async fn fetch_page(
        &self,
        repository: &str,
        continuation_token: Option<&str>,
        progress: &Progress,
    ) -> Result<SearchPage, ClientError> {
        let response = self
            .fetch_with_retry(repository, continuation_token, progress)
            .await?;
        Ok(self.select_artifacts(response))
    }

    async fn fetch_with_retry(
        &self,
        repository: &str,
        continuation_token: Option<&str>,
        progress: &Progress,
    ) -> Result<SearchResponse, ClientError> {
        let mut failures = 0u32;
        loop {
            match self.request_page(repository, continuation_token).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_server_error() => {
                    failures += 1;
                    warn!(repository, failures, error = %error, "search request failed");
                    progress.log(format!(
                        "Failed {failures} time(s) while reading repo: {repository}"
                    ));

                    if failures >= MAX_ATTEMPTS {
                        progress.log(format!("We could not fully read repo: {repository}"));
                        warn!(repository, "server kept failing, continuing with an empty page");
                        return Ok(SearchResponse::empty());
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn request_page(
        &self,
        repository: &str,
        continuation_token: Option<&str>,
    ) -> Result<SearchResponse, ClientError> {
        let url = format!("{}/service/rest/v1/search", self.client.base_url());

        let mut query: Vec<(&str, &str)> = vec![
            ("format", "maven2"),
            ("assets.attributes.maven2.extension", &self.extension),
        ];
        if let Some(group) = &self.group {
            query.push(("group", group));
        }
        query.push(("repository", repository));
        if let Some(token) = continuation_token {
            query.push(("continuationToken", token));
        }

        self.client.get_json(&url, &query).await
    }

    fn select_artifacts(&self, response: SearchResponse) -> SearchPage {
        let mut artifacts = Vec::with_capacity(response.items.len());

        for item in response.items {
            let download_url = item
                .assets
                .iter()
                .find(|asset| asset.download_url.ends_with(&self.extension))
                .map(|asset| asset.download_url.clone());

            let Some(download_url) = download_url else {
                warn!(
                    repository = %item.repository,
                    group = %item.group,
                    name = %item.name,
                    version = %item.version,
                    extension = %self.extension,
                    "no asset matches the requested extension, dropping item"
                );
                continue;
            };

            let pom_url = item
                .assets
                .iter()
                .find(|asset| asset.download_url.ends_with("pom"))
                .map(|asset| asset.download_url.clone());

            artifacts.push(Artifact::new(
                item.repository,
                item.group,
                item.name,
                item.version,
                download_url,
                pom_url,
            ));
        }

        // An empty token would request the same page forever.
        let continuation_token = response
            .continuation_token
            .filter(|token| !token.is_empty());

        SearchPage {
            artifacts,
            continuation_token,
        }
    }
}
