//! Azure DevOps work item creation from summarization output.
//!
//! The summarization prompt can ask the model for a simple contract:
//!
//! ```text
//! TITLE: <one line title>
//! ---
//! <markdown body>
//! ```
//!
//! [`parse_title_and_body`] recovers that structure, tolerating output that
//! ignores the contract, and [`AzureDevOpsClient`] turns the pair into a
//! JSON Patch create request against the work item REST API.

use crate::config::AzureDevOpsSettings;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors from the Azure DevOps work item API.
#[derive(Debug, Error)]
pub enum DevOpsError {
    /// Transport-level failure reaching the API.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("Work item request failed with status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the API.
        status: reqwest::StatusCode,
        /// Response body, usually a JSON error description.
        body: String,
    },
}

/// A created work item as reported by the API.
#[derive(Debug, Deserialize)]
pub struct WorkItem {
    /// Numeric work item identifier.
    pub id: u64,
    /// Canonical API URL of the created item.
    pub url: Option<String>,
}

/// Split model output into a work item title and Markdown body.
///
/// The title comes from the first `TITLE:` line with content after the
/// marker; absent that, a generic title is used. The body is everything
/// after the first `---` divider line, or the full text minus `TITLE:`
/// lines when no divider is present.
pub fn parse_title_and_body(output: &str) -> (String, String) {
    let title = output
        .lines()
        .find_map(|line| {
            line.strip_prefix("TITLE:")
                .map(str::trim)
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or("Generated User Story")
        .to_string();

    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut saw_divider = false;
    for line in output.lines() {
        if line.trim_end() == "---" {
            segments.push(std::mem::take(&mut current));
            saw_divider = true;
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    segments.push(current);

    let body = if saw_divider {
        segments[1..]
            .iter()
            .map(|segment| segment.trim())
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        output
            .lines()
            .map(|line| if line.starts_with("TITLE:") { "" } else { line })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    };

    (title, body)
}

/// Minimal work item client authenticated with a Personal Access Token.
pub struct AzureDevOpsClient {
    http: reqwest::Client,
    organization: String,
    project: String,
    pat: String,
    work_item_type: String,
    api_version: String,
    area_path: Option<String>,
    iteration_path: Option<String>,
}

impl AzureDevOpsClient {
    /// Build a client from the `azure_devops` configuration section.
    pub fn new(settings: &AzureDevOpsSettings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("docbrief/devops")
            .build()
            .expect("Failed to construct reqwest::Client for Azure DevOps");

        Self {
            http,
            organization: settings.organization.trim_end_matches('/').to_string(),
            project: settings.project.clone(),
            pat: settings.pat.clone(),
            work_item_type: settings.work_item_type.clone(),
            api_version: settings.api_version.clone(),
            area_path: settings.area_path.clone(),
            iteration_path: settings.iteration_path.clone(),
        }
    }

    /// Create a work item from raw model output.
    pub async fn create_work_item(&self, summary_output: &str) -> Result<WorkItem, DevOpsError> {
        let (title, body) = parse_title_and_body(summary_output);
        let url = format!(
            "{}/{}/_apis/wit/workitems/${}",
            self.organization, self.project, self.work_item_type
        );

        let mut ops = vec![
            patch_add("/fields/System.Title", &title),
            patch_add("/fields/System.Description", &body),
        ];
        if let Some(area) = &self.area_path {
            ops.push(patch_add("/fields/System.AreaPath", area));
        }
        if let Some(iteration) = &self.iteration_path {
            ops.push(patch_add("/fields/System.IterationPath", iteration));
        }

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .basic_auth("", Some(&self.pat))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json-patch+json",
            )
            .json(&ops)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = DevOpsError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Work item creation failed");
            return Err(error);
        }

        let item: WorkItem = response.json().await?;
        tracing::info!(id = item.id, work_item_type = %self.work_item_type, "Created work item");
        Ok(item)
    }
}

fn patch_add(path: &str, value: &str) -> serde_json::Value {
    json!({"op": "add", "path": path, "value": value})
}
