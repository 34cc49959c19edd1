//! File-based configuration management.
//!
//! Settings live in a `config.json` next to the binary (overridable through the
//! `DOCBRIEF_CONFIG` environment variable or an explicit path argument). Secrets
//! can be kept out of the file: the Azure OpenAI connection and the Azure DevOps
//! PAT accept environment overrides after the file is parsed. A `.env` file is
//! honored before the environment is read.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors encountered while loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file was absent at the resolved path.
    #[error("Config file '{0}' not found. Copy 'config.example.json' to 'config.json' and fill values.")]
    Missing(PathBuf),
    /// Configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file contained malformed JSON.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A setting was present but outside the accepted range.
    #[error("Invalid value for {0}")]
    InvalidValue(String),
    /// An optional section required by the requested operation was absent.
    #[error("Missing config section: {0}")]
    MissingSection(&'static str),
}

/// Runtime configuration for a docbrief run.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Azure AD tenant that issued the application registration.
    pub tenant_id: String,
    /// Application (client) identifier used for token acquisition.
    pub client_id: String,
    /// Client secret for the application registration.
    pub client_secret: String,
    /// Microsoft Graph endpoint settings.
    pub graph: GraphSettings,
    /// SharePoint site and document library to read from.
    pub sharepoint: SharePointSettings,
    /// Azure OpenAI settings; summarization is unavailable when absent.
    #[serde(default)]
    pub azure_openai: Option<AzureOpenAiSettings>,
    /// Azure DevOps settings; work item creation is skipped when absent.
    #[serde(default)]
    pub azure_devops: Option<AzureDevOpsSettings>,
    /// Prompt overrides applied to the summarization pipeline.
    #[serde(default)]
    pub prompts: Option<PromptSettings>,
    /// Raw deletion policy for downloaded files; see [`AppConfig::delete_policy`].
    #[serde(default)]
    pub delete_after: Option<String>,
}

/// Microsoft Graph endpoints used for token acquisition and API calls.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSettings {
    /// Authority host for the OAuth token endpoint.
    pub authority_host: String,
    /// Scopes requested for the application token.
    pub scope: Vec<String>,
    /// Base URL of the Microsoft Graph API.
    pub base_url: String,
}

/// Location of the SharePoint document library to read.
#[derive(Debug, Clone, Deserialize)]
pub struct SharePointSettings {
    /// Hostname of the SharePoint tenant, e.g. `contoso.sharepoint.com`.
    pub site_hostname: String,
    /// Server-relative site path, e.g. `/sites/engineering`.
    pub site_path: String,
    /// Display name of the document library (drive) to read.
    pub drive_name: String,
    /// Folder inside the library; empty or absent means the library root.
    #[serde(default)]
    pub folder_path: Option<String>,
}

/// Azure OpenAI connection and summarization tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureOpenAiSettings {
    /// Resource endpoint, e.g. `https://myresource.openai.azure.com`.
    pub endpoint: String,
    /// API key for the resource.
    pub api_key: String,
    /// Chat model deployment name.
    pub deployment: String,
    /// REST API version passed as a query parameter.
    pub api_version: String,
    /// Upper bound on characters per summarization chunk.
    #[serde(default = "default_max_chars_per_chunk")]
    pub max_chars_per_chunk: usize,
    /// Parallel workers for chunk summaries; 1 keeps dispatch sequential.
    #[serde(default = "default_chunk_workers")]
    pub chunk_workers: usize,
}

/// Azure DevOps connection for work item creation.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureDevOpsSettings {
    /// Organization URL, e.g. `https://dev.azure.com/yourorg`.
    pub organization: String,
    /// Project name inside the organization.
    pub project: String,
    /// Personal Access Token; prefer the `AZDO_PAT` environment override.
    pub pat: String,
    /// Optional area path within the project.
    #[serde(default)]
    pub area_path: Option<String>,
    /// Optional iteration path within the project.
    #[serde(default)]
    pub iteration_path: Option<String>,
    /// Work item type to create.
    #[serde(default = "default_work_item_type")]
    pub work_item_type: String,
    /// REST API version.
    #[serde(default = "default_devops_api_version")]
    pub api_version: String,
}

/// Prompt overrides grouped by pipeline stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptSettings {
    /// Overrides for the summarization prompts.
    #[serde(default)]
    pub summarize: Option<PromptOverride>,
}

/// Replacement prompts for a single pipeline stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptOverride {
    /// Replacement system prompt.
    #[serde(default)]
    pub system: Option<String>,
    /// Replacement user prompt.
    #[serde(default)]
    pub user: Option<String>,
}

/// When to remove the downloaded file at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Delete regardless of the run outcome.
    Always,
    /// Delete only when the whole flow succeeded.
    #[default]
    OnSuccess,
    /// Leave the file in place.
    Never,
}

impl AppConfig {
    /// Load configuration from disk, applying environment overrides along the way.
    ///
    /// Path precedence: explicit argument, then `DOCBRIEF_CONFIG`, then
    /// `config.json` in the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = resolve_config_path(path);
        if !path.exists() {
            return Err(ConfigError::Missing(path));
        }
        let raw = std::fs::read_to_string(&path)?;
        let mut config: AppConfig = serde_json::from_str(&raw)?;
        config.apply_env_overrides();
        if let Some(openai) = config.azure_openai.as_mut() {
            if openai.max_chars_per_chunk == 0 {
                return Err(ConfigError::InvalidValue(
                    "azure_openai.max_chars_per_chunk".to_string(),
                ));
            }
            openai.chunk_workers = openai.chunk_workers.max(1);
        }
        tracing::debug!(
            path = %path.display(),
            site = %config.sharepoint.site_hostname,
            drive = %config.sharepoint.drive_name,
            summarization = config.azure_openai.is_some(),
            work_items = config.azure_devops.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Azure OpenAI settings, or an error when the section is absent.
    pub fn azure_openai(&self) -> Result<&AzureOpenAiSettings, ConfigError> {
        self.azure_openai
            .as_ref()
            .ok_or(ConfigError::MissingSection("azure_openai"))
    }

    /// Azure DevOps settings, or an error when the section is absent.
    pub fn azure_devops(&self) -> Result<&AzureDevOpsSettings, ConfigError> {
        self.azure_devops
            .as_ref()
            .ok_or(ConfigError::MissingSection("azure_devops"))
    }

    /// Deletion policy for downloaded files, defaulting to on-success.
    ///
    /// Unrecognized values fall back to the default rather than failing a run
    /// that has otherwise valid settings.
    pub fn delete_policy(&self) -> DeletePolicy {
        match self.delete_after.as_deref() {
            None => DeletePolicy::OnSuccess,
            Some(raw) => raw.parse().unwrap_or_else(|()| {
                tracing::warn!(value = raw, "Unknown delete_after policy; using on_success");
                DeletePolicy::OnSuccess
            }),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(openai) = self.azure_openai.as_mut() {
            if let Some(endpoint) = load_env_optional("AZURE_OPENAI_ENDPOINT") {
                openai.endpoint = endpoint;
            }
            if let Some(api_key) = load_env_optional("AZURE_OPENAI_API_KEY") {
                openai.api_key = api_key;
            }
            if let Some(deployment) = load_env_optional("AZURE_OPENAI_CHAT_DEPLOYMENT") {
                openai.deployment = deployment;
            }
            if let Some(api_version) = load_env_optional("AZURE_OPENAI_API_VERSION") {
                openai.api_version = api_version;
            }
        }
        if let Some(devops) = self.azure_devops.as_mut()
            && let Some(pat) = load_env_optional("AZDO_PAT")
        {
            devops.pat = pat;
        }
    }
}

impl std::str::FromStr for DeletePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "on_success" => Ok(Self::OnSuccess),
            "never" => Ok(Self::Never),
            _ => Err(()),
        }
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match load_env_optional("DOCBRIEF_CONFIG") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("config.json"),
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn default_max_chars_per_chunk() -> usize {
    12_000
}

fn default_chunk_workers() -> usize {
    1
}

fn default_work_item_type() -> String {
    "User Story".to_string()
}

fn default_devops_api_version() -> String {
    "7.1-preview.3".to_string()
}
