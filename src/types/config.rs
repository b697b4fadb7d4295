//! Configuration types
//!
//! Runtime settings threaded through the client and pipeline constructors.

use serde::{Deserialize, Serialize};

/// Default Ollama server address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Upper bound for parallel `/api/show` fetches
pub const MAX_CONCURRENCY: usize = 32;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Ollama server
    #[serde(rename = "ollamaurl", default = "default_ollama_url")]
    pub ollama_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Number of concurrent descriptor fetches (1 = single fetcher)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_timeout() -> u64 {
    1
}

fn default_concurrency() -> usize {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            request_timeout_secs: default_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

impl Settings {
    /// Clamp values into usable ranges
    pub fn validate(&mut self) {
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);

        let trimmed = self.ollama_url.trim().trim_end_matches('/');
        self.ollama_url = if trimmed.is_empty() {
            default_ollama_url()
        } else {
            trimmed.to_string()
        };
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
