//! HTTP access to the repository manager's REST API.
//!
//! [`NexusClient`] wraps a single pooled [`reqwest::Client`] shared by every
//! worker. Certificate verification is disabled on purpose: these crawls run
//! against internal repository managers sitting behind self-signed
//! certificates, and the tool trusts whatever the operator points it at.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::model::Repository;

/// Connect timeout for all requests, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout, in seconds. Search pages and POM descriptors are small.
const READ_TIMEOUT_SECS: u64 = 60;

/// Errors raised by repository manager requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level error (DNS resolution, connection refused, TLS errors,
    /// timeouts).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while persisting a downloaded descriptor.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a JSON decode error.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error tied to the path being written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for 5xx responses, which the search loop treats as transient.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if (500..600).contains(status))
    }
}

/// Client for the repository manager REST API.
///
/// Designed to be created once and cloned into every worker; clones share the
/// same connection pool. When either credential is present, HTTP basic auth is
/// attached to every request, substituting an empty string for the missing
/// half.
#[derive(Debug, Clone)]
pub struct NexusClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl NexusClient {
    /// Creates a client for the given server base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");

        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        }
    }

    /// Base URL the client was configured with, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the full repository listing from
    /// `GET {base}/service/rest/v1/repositories`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when the request fails to complete,
    /// [`ClientError::HttpStatus`] for non-2xx responses, and
    /// [`ClientError::Decode`] when the body is not a repository array.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>, ClientError> {
        let url = format!("{}/service/rest/v1/repositories", self.base_url);
        self.get_json(&url, &[]).await
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when the request fails to complete,
    /// [`ClientError::HttpStatus`] for non-2xx responses, and
    /// [`ClientError::Decode`] when the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self
            .request(url, query)
            .send()
            .await
            .map_err(|e| ClientError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(url, status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::decode(url, e))
    }

    /// Streams the body of `url` into `path`, creating parent directories
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when the request or body stream fails,
    /// [`ClientError::HttpStatus`] for non-2xx responses, and
    /// [`ClientError::Io`] when the file cannot be created or written.
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::io(parent, e))?;
        }

        let response = self
            .request(url, &[])
            .send()
            .await
            .map_err(|e| ClientError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::http_status(url, status.as_u16()));
        }

        let file = File::create(path)
            .await
            .map_err(|e| ClientError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ClientError::network(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| ClientError::io(path, e))?;
        }

        writer.flush().await.map_err(|e| ClientError::io(path, e))?;
        debug!(url, path = %path.display(), "descriptor written");
        Ok(())
    }

    fn request(&self, url: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if self.username.is_some() || self.password.is_some() {
            request = request.basic_auth(
                self.username.as_deref().unwrap_or_default(),
                Some(self.password.as_deref().unwrap_or_default()),
            );
        }
        request
    }
}
