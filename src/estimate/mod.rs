//! Memory estimation
//!
//! Heuristic RAM/VRAM sizing from parameter count, context length and quantization.
//! The figures are rough guidance for tuning local deployments, not a prediction of
//! what a particular inference engine will allocate.

pub mod format;
pub mod quantization;

use thiserror::Error;

pub use format::{format_memory_size, format_param_count};
pub use quantization::{normalize_quantization_level, QuantizationProfile};

/// Bytes in one GiB
pub const ONE_GB: f64 = 1_073_741_824.0;

/// Fraction of the weights reserved for activations and fragmentation
pub const GPU_OVERHEAD_RATIO: f64 = 0.10;

/// Estimation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("Quantization level is empty")]
    EmptyQuantizationLevel,
}

/// Estimated memory footprint, all values in GB
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryEstimate {
    pub base_model_size_gb: f64,
    pub kv_cache_size_gb: f64,
    pub gpu_ram_gb: f64,
    pub system_ram_gb: f64,
}

/// Estimate the memory needed to serve a model.
///
/// The hidden size is approximated as `sqrt(parameter_count / 6)` and the KV cache
/// as two tensors of two slots each over the whole context.
pub fn estimate_memory(
    parameter_count: u64,
    context_length: u64,
    quantization_level: &str,
) -> Result<MemoryEstimate, EstimateError> {
    let profile = QuantizationProfile::for_level(quantization_level)?;
    Ok(estimate_with_profile(parameter_count, context_length, profile))
}

pub fn estimate_with_profile(
    parameter_count: u64,
    context_length: u64,
    profile: QuantizationProfile,
) -> MemoryEstimate {
    let params = parameter_count as f64;
    let hidden_size = (params / 6.0).sqrt();

    let base_model_size_gb = params * profile.bytes_per_parameter / ONE_GB;
    let kv_cache_size_gb =
        4.0 * hidden_size * context_length as f64 * profile.bytes_per_parameter / ONE_GB;
    let gpu_overhead_gb = base_model_size_gb * GPU_OVERHEAD_RATIO;
    let gpu_ram_gb = base_model_size_gb + kv_cache_size_gb + gpu_overhead_gb;

    MemoryEstimate {
        base_model_size_gb,
        kv_cache_size_gb,
        gpu_ram_gb,
        system_ram_gb: gpu_ram_gb * profile.system_ram_multiplier,
    }
}
