//! HTTP implementation of the distribution-server collaborators.
//!
//! The server protocol is deliberately plain: `GET /best-network-hash`
//! returns two lines (artifact hash, required client version),
//! `GET /best-network` returns the payload, and finished games are submitted
//! as a multipart POST to `/submit`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{PlaygenError, Result};
use crate::transport::{ArtifactTransport, LatestArtifact, Uploader};

/// HTTP request timeout for the small query endpoints
const QUERY_TIMEOUT_SECS: u64 = 30;

/// reqwest-backed transport talking to the distribution server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ArtifactTransport for HttpTransport {
    async fn query_latest(&self) -> Result<LatestArtifact> {
        let body = self
            .client
            .get(self.url("best-network-hash"))
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut lines = body.lines();
        let identifier = lines
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| PlaygenError::MalformedResponse(body.clone()))?
            .trim()
            .to_string();
        let min_client_version = lines
            .next()
            .and_then(|l| l.trim().parse::<u32>().ok())
            .ok_or_else(|| PlaygenError::MalformedResponse(body.clone()))?;

        debug!("best network hash: {identifier}, required client version: {min_client_version}");
        Ok(LatestArtifact {
            identifier,
            min_client_version,
        })
    }

    async fn fetch(&self, identifier: &str, dest: &Path) -> Result<PathBuf> {
        info!("fetching artifact {identifier}");
        let bytes = self
            .client
            .get(self.url("best-network"))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let path = dest.join(identifier);
        tokio::fs::write(&path, &bytes).await?;
        info!("stored artifact at {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl Uploader for HttpTransport {
    async fn upload(&self, result_id: &str, artifact_id: &str, client_version: u32) -> Result<()> {
        let sgf_name = format!("{result_id}.sgf");
        let data_name = format!("{result_id}.txt");
        let sgf = tokio::fs::read(&sgf_name).await?;
        let training = tokio::fs::read(&data_name).await?;

        let form = Form::new()
            .text("networkhash", artifact_id.to_string())
            .text("clientversion", client_version.to_string())
            .part("sgf", Part::bytes(sgf).file_name(sgf_name.clone()))
            .part("trainingdata", Part::bytes(training).file_name(data_name.clone()));

        self.client
            .post(self.url("submit"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        info!("uploaded {result_id} for network {artifact_id}");
        // The server has the data now; drop the local copies.
        let _ = tokio::fs::remove_file(&sgf_name).await;
        let _ = tokio::fs::remove_file(&data_name).await;
        Ok(())
    }
}
