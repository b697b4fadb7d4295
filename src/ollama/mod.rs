//! Ollama metadata client
//!
//! Fetches the installed model list (`/api/tags`) and per-model descriptors
//! (`/api/show`). Every call issues exactly one request; there are no retries.

pub mod normalize;
pub mod transport;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{ModelDescriptor, Settings, TagEntry, TagList};

pub use normalize::{extract_family, normalize_family_fields};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

pub const API_PATH_TAGS: &str = "/api/tags";
pub const API_PATH_SHOW: &str = "/api/show";

/// Client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OllamaError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response status {status}: {body}")]
    Protocol { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Normalization error: {0}")]
    Normalization(String),
}

/// Source of model names and descriptors
#[async_trait]
pub trait ModelMetadataSource: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<TagEntry>, OllamaError>;
    async fn describe(&self, name: &str) -> Result<ModelDescriptor, OllamaError>;
}

// ============================================================================
// Wire types for /api/show (after family normalization)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ShowResponse {
    details: ShowDetails,
    #[serde(default)]
    model_info: ShowModelInfo,
}

#[derive(Debug, Deserialize)]
struct ShowDetails {
    #[serde(default)]
    format: String,
    family: String,
    #[serde(default)]
    parameter_size: String,
    #[serde(default)]
    quantization_level: String,
}

#[derive(Debug, Default, Deserialize)]
struct ShowModelInfo {
    #[serde(default, rename = "general.type")]
    model_type: String,
    #[serde(default, rename = "general.parameter_count")]
    parameter_count: u64,
    #[serde(default, rename = "model.context_length")]
    context_length: u64,
    #[serde(default, rename = "model.embedding_length")]
    embedding_length: u64,
}

/// Parse a raw `/api/show` body into a descriptor.
///
/// Fails as a whole when the family can't be found or the payload doesn't decode.
pub fn parse_descriptor(raw: &str) -> Result<ModelDescriptor, OllamaError> {
    let normalized = normalize_family_fields(raw)?;
    let show: ShowResponse = serde_json::from_value(normalized)
        .map_err(|e| OllamaError::Decode(format!("show response: {}", e)))?;

    Ok(ModelDescriptor {
        parameter_count: show.model_info.parameter_count,
        context_length: show.model_info.context_length,
        embedding_length: show.model_info.embedding_length,
        quantization_level: show.details.quantization_level,
        family: show.details.family,
        parameter_size: show.details.parameter_size,
        format: show.details.format,
        model_type: show.model_info.model_type,
    })
}

// ============================================================================
// ModelMetadataClient
// ============================================================================

/// Client for the Ollama metadata endpoints
#[derive(Clone)]
pub struct ModelMetadataClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl ModelMetadataClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    /// Client using reqwest with the configured URL and timeout
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.ollama_url.clone(),
            Arc::new(ReqwestTransport::new(settings.request_timeout())),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn check_status(response: HttpResponse) -> Result<String, OllamaError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(OllamaError::Protocol {
            status: response.status,
            body: response.body,
        })
    }
}

#[async_trait]
impl ModelMetadataSource for ModelMetadataClient {
    async fn list_tags(&self) -> Result<Vec<TagEntry>, OllamaError> {
        let url = self.url(API_PATH_TAGS);
        tracing::debug!("Listing models from {}", url);

        let body = check_status(self.transport.get(&url).await?)?;
        let tags: TagList = serde_json::from_str(&body)
            .map_err(|e| OllamaError::Decode(format!("tags response: {}", e)))?;

        tracing::debug!("Server reported {} models", tags.models.len());
        Ok(tags.models)
    }

    async fn describe(&self, name: &str) -> Result<ModelDescriptor, OllamaError> {
        let url = self.url(API_PATH_SHOW);
        tracing::debug!("Fetching descriptor for {}", name);

        let request = serde_json::json!({ "model": name });
        let body = check_status(self.transport.post_json(&url, request).await?)?;

        parse_descriptor(&body)
    }
}
