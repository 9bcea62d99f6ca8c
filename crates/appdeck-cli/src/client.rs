//! HTTP client for a remote apps service.

use crate::api::{
    ApiError, CreateAppResponse, FilePayload, UploadFilesRequest, UploadFilesResponse,
};
use appdeck_core::{AppConfig, ModelFile};
use appdeck_runtime::users::UserProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Whether this is the duplicate-identifier conflict signal.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Api { status: 409, .. })
    }
}

/// Client for the appdeck REST API.
pub struct AppsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AppsClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Extract the error from a non-success response.
    async fn api_error(resp: reqwest::Response) -> ClientError {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        // Prefer the structured message if the body is our error shape
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        ClientError::Api { status, message }
    }

    /// Create the server-side configuration record for a new application.
    pub async fn create_app(&self, config: &AppConfig) -> Result<String, ClientError> {
        let url = format!("{}/api/v1/apps", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(config)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let body: CreateAppResponse = resp.json().await?;
        Ok(body.id)
    }

    /// Create the application's storage directory and application files.
    pub async fn create_app_storage(&self, config: &AppConfig) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/apps/{}/storage", self.base_url, config.id);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(())
    }

    /// Upload the model topology and weight files for an application.
    pub async fn upload_model_files(
        &self,
        id: &str,
        topology: &ModelFile,
        weights: &[ModelFile],
    ) -> Result<usize, ClientError> {
        let url = format!("{}/api/v1/apps/{}/files", self.base_url, id);
        let body = UploadFilesRequest {
            topology: topology.into(),
            weights: weights.iter().map(FilePayload::from).collect(),
        };
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let body: UploadFilesResponse = resp.json().await?;
        Ok(body.stored)
    }

    /// Fetch an application configuration by identifier.
    pub async fn get_app(&self, id: &str) -> Result<AppConfig, ClientError> {
        let url = format!("{}/api/v1/apps/{}", self.base_url, id);
        let resp = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Delete an application configuration by identifier.
    pub async fn delete_app(&self, id: &str) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/apps/{}", self.base_url, id);
        let resp = self
            .client
            .delete(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(())
    }

    /// Fetch the authenticated user's profile with its current app list.
    pub async fn fetch_user(&self) -> Result<UserProfile, ClientError> {
        let url = format!("{}/api/v1/user", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(resp.json().await?)
    }
}
