//! Model types
//!
//! Tag listings, per-model descriptors and the pipeline's output items.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::estimate::{estimate_memory, EstimateError, MemoryEstimate};
use crate::ollama::OllamaError;

static PARAMETER_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(\.[0-9])?)([BM])").expect("parameter size regex"));

/// Details block of a `/api/tags` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagDetails {
    #[serde(default)]
    pub parent_model: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub families: Option<Vec<String>>,
    /// Human readable size, e.g. "7.6B" or "137M"
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

impl TagDetails {
    /// Parameter size in billions, parsed from `parameter_size`.
    ///
    /// `M` values are scaled by 1/1024. Returns 0.0 when the size can't be parsed.
    pub fn parameter_size_as_billions(&self) -> f64 {
        let Some(caps) = PARAMETER_SIZE_RE.captures(&self.parameter_size) else {
            tracing::debug!("Unparsable parameter size: {}", self.parameter_size);
            return 0.0;
        };

        let value: f64 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => return 0.0,
        };

        match &caps[3] {
            "B" => value,
            "M" => value / 1024.0,
            _ => 0.0,
        }
    }

    /// Bit count encoded in the quantization level (`Q4_K_M` -> 4, `F16` -> 16)
    pub fn quantization_level_as_bit_count(&self) -> u32 {
        let level = self.quantization_level.as_str();
        let digits = match level.chars().next() {
            Some('Q') => level.get(1..2),
            Some('F') => level.get(1..3),
            _ => None,
        };

        digits.and_then(|d| d.parse().ok()).unwrap_or(0)
    }
}

/// One installed model as returned by `/api/tags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    /// Model reference, e.g. "phi4:14b"
    #[serde(default, rename = "model")]
    pub model_ref: String,
    #[serde(default)]
    pub modified_at: Option<DateTime<FixedOffset>>,
    /// Size on disk in bytes
    #[serde(default, rename = "size")]
    pub size_bytes: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: TagDetails,
}

/// Body of `/api/tags`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

/// Normalized model metadata parsed from `/api/show`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub parameter_count: u64,
    pub context_length: u64,
    pub embedding_length: u64,
    pub quantization_level: String,
    pub family: String,
    /// Size label reported by the server, e.g. "14.7B"
    pub parameter_size: String,
    pub format: String,
    /// `general.type`, usually "model"
    pub model_type: String,
}

impl ModelDescriptor {
    /// Memory estimate for this descriptor
    pub fn estimate(&self) -> Result<MemoryEstimate, EstimateError> {
        estimate_memory(
            self.parameter_count,
            self.context_length,
            &self.quantization_level,
        )
    }
}

/// Result of fetching one model's descriptor.
///
/// Holds either the descriptor or the error that prevented fetching it.
#[derive(Debug)]
pub struct ModelItem {
    pub name: String,
    pub outcome: Result<ModelDescriptor, OllamaError>,
}

impl ModelItem {
    pub fn new(name: impl Into<String>, outcome: Result<ModelDescriptor, OllamaError>) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }

    pub fn descriptor(&self) -> Option<&ModelDescriptor> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&OllamaError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Memory estimate, when the descriptor was fetched
    pub fn estimate(&self) -> Option<Result<MemoryEstimate, EstimateError>> {
        self.descriptor().map(ModelDescriptor::estimate)
    }
}
