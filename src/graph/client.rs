//! HTTP client wrapper for the Graph drive endpoints.

use crate::config::AppConfig;
use crate::graph::types::{
    DriveItem, DriveListResponse, GraphError, ItemListResponse, SharePointTarget, SiteResponse,
};
use futures_util::StreamExt;
use reqwest::{Client, Method};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Lightweight HTTP client for the Graph endpoints the tool needs.
pub struct GraphClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) access_token: String,
    pub(crate) site_hostname: String,
    pub(crate) site_path: String,
    pub(crate) drive_name: String,
}

impl GraphClient {
    /// Construct a client from configuration and an acquired bearer token.
    pub fn new(config: &AppConfig, access_token: String) -> Self {
        let client = Client::builder()
            .user_agent("docbrief/graph")
            .build()
            .expect("Failed to construct reqwest::Client for Graph");

        Self {
            client,
            base_url: config.graph.base_url.trim_end_matches('/').to_string(),
            access_token,
            site_hostname: config.sharepoint.site_hostname.clone(),
            site_path: config.sharepoint.site_path.clone(),
            drive_name: config.sharepoint.drive_name.clone(),
        }
    }

    /// Resolve the configured site and library into Graph identifiers.
    pub async fn resolve_target(&self) -> Result<SharePointTarget, GraphError> {
        let site_id = self.resolve_site().await?;
        let drive_id = self.resolve_drive(&site_id).await?;
        Ok(SharePointTarget { site_id, drive_id })
    }

    /// Look up the Graph identifier of the configured SharePoint site.
    pub async fn resolve_site(&self) -> Result<String, GraphError> {
        let path = format!("sites/{}:{}", self.site_hostname, self.site_path);
        let response = self.request(Method::GET, &path).send().await?;
        let response = self.ensure_success(response, "site lookup").await?;
        let site: SiteResponse = response.json().await?;
        tracing::debug!(site = %site.id, "Resolved SharePoint site");
        Ok(site.id)
    }

    /// Find the drive whose display name matches the configured library.
    pub async fn resolve_drive(&self, site_id: &str) -> Result<String, GraphError> {
        let response = self
            .request(Method::GET, &format!("sites/{site_id}/drives"))
            .send()
            .await?;
        let response = self.ensure_success(response, "drive listing").await?;
        let drives: DriveListResponse = response.json().await?;

        drives
            .value
            .into_iter()
            .find(|drive| drive.name == self.drive_name)
            .map(|drive| drive.id)
            .ok_or_else(|| GraphError::DriveNotFound {
                drive: self.drive_name.clone(),
                site: site_id.to_string(),
            })
    }

    /// List the items in the drive root or in a nested folder.
    ///
    /// Folder segments are percent-encoded individually so names with spaces
    /// or special characters address correctly.
    pub async fn list_items(
        &self,
        target: &SharePointTarget,
        folder_path: Option<&str>,
    ) -> Result<Vec<DriveItem>, GraphError> {
        let folder = folder_path
            .map(|path| path.trim_matches('/'))
            .filter(|path| !path.is_empty());
        let path = match folder {
            Some(folder) => {
                let encoded = folder
                    .split('/')
                    .map(|segment| urlencoding::encode(segment).into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("drives/{}/root:/{}:/children", target.drive_id, encoded)
            }
            None => format!("drives/{}/root/children", target.drive_id),
        };

        let response = self.request(Method::GET, &path).send().await?;
        let response = self.ensure_success(response, "item listing").await?;
        let items: ItemListResponse = response.json().await?;
        Ok(items.value)
    }

    /// Stream a file's binary contents to `dest`, returning the byte count.
    pub async fn download_item(
        &self,
        target: &SharePointTarget,
        item_id: &str,
        dest: &Path,
    ) -> Result<u64, GraphError> {
        let path = format!("drives/{}/items/{}/content", target.drive_id, item_id);
        let response = self.request(Method::GET, &path).send().await?;
        let response = self.ensure_success(response, "download").await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(piece) = stream.next().await {
            let piece = piece?;
            written += piece.len() as u64;
            file.write_all(&piece).await?;
        }
        file.flush().await?;

        tracing::debug!(bytes = written, dest = %dest.display(), "Downloaded drive item");
        Ok(written)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, GraphError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = GraphError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "Graph request failed");
            Err(error)
        }
    }
}
