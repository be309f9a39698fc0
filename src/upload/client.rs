use crate::utils::error::TerritoryError;
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_UPLOAD_API: &str = "https://maps.territory.dev";

/// Body of `POST /build-request`.
#[derive(Debug, Serialize)]
struct BuildRequest<'a> {
    repo_id: &'a str,
    branch: &'a str,
    meta: &'a Map<String, Value>,
    len: u64,
}

/// Where and how to upload the archive for a registered build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadIntent {
    pub url: String,
    #[serde(rename = "extensionHeaders", default)]
    pub extension_headers: HashMap<String, String>,
}

/// Client for the indexing service's upload API.
pub struct UploadClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl UploadClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn user_agent() -> String {
        format!("territory/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Register a build and obtain the upload location for its archive.
    pub async fn create_build_request(
        &self,
        repo_id: &str,
        branch: &str,
        meta: &Map<String, Value>,
        blob_size: u64,
    ) -> Result<UploadIntent, TerritoryError> {
        let body = BuildRequest {
            repo_id,
            branch,
            meta,
            len: blob_size,
        };

        let response = self
            .http
            .post(format!("{}/build-request", self.api_url))
            .bearer_auth(&self.token)
            .header(USER_AGENT, Self::user_agent())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TerritoryError::Upload {
                message: format!("build request rejected with HTTP {status}: {text}"),
                source: None,
            });
        }

        Ok(response.json::<UploadIntent>().await?)
    }

    /// Stream the archive at `path` to the intent's URL.
    pub async fn upload_archive(&self, intent: &UploadIntent, path: &Path) -> Result<(), TerritoryError> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();

        let mut request = self
            .http
            .put(&intent.url)
            .header(CONTENT_LENGTH, len)
            .body(reqwest::Body::from(file));
        for (name, value) in &intent.extension_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TerritoryError::Upload {
                message: format!("archive upload failed with HTTP {status}: {text}"),
                source: None,
            });
        }
        Ok(())
    }
}
