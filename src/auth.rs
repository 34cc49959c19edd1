//! Azure AD client-credentials authentication for Microsoft Graph.
//!
//! Tokens are acquired application-only (no delegated user context) from the
//! v2.0 token endpoint. A single summarization run makes one acquisition, so
//! no token cache is kept.

use crate::config::AppConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors from token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport-level failure reaching the token endpoint.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The token endpoint rejected the credentials.
    #[error("Token request rejected with status {status}: {body}")]
    TokenRejected {
        /// HTTP status returned by the token endpoint.
        status: reqwest::StatusCode,
        /// Response body, usually a JSON error description.
        body: String,
    },
    /// The endpoint answered 200 but the payload held no usable token.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Acquires bearer tokens for Graph using the client-credentials grant.
pub struct GraphAuth {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl GraphAuth {
    /// Build an authenticator from the application configuration.
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("docbrief/auth")
            .build()
            .expect("Failed to construct reqwest::Client for auth");
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            config.graph.authority_host.trim_end_matches('/'),
            config.tenant_id
        );

        Self {
            http,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.graph.scope.join(" "),
        }
    }

    /// Request an application access token.
    pub async fn acquire_token(&self) -> Result<String, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(&self.token_url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = AuthError::TokenRejected { status, body };
            tracing::error!(error = %error, "Token acquisition failed");
            return Err(error);
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        match payload.access_token {
            Some(token) if !token.is_empty() => {
                tracing::debug!("Acquired Graph access token");
                Ok(token)
            }
            _ => Err(AuthError::MalformedResponse(
                "response carried no access_token".into(),
            )),
        }
    }
}
