//! Quantization lookup tables
//!
//! Maps raw quantization levels reported by Ollama (`Q4_K_M`, `BF16`, ...) to a
//! coarse bit-width class and the sizing factors derived from it.

use super::EstimateError;

/// Nominal bit width used when the quantization code is not recognized
pub const DEFAULT_BITS: u32 = 12;

/// Sizing factors for one quantization class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationProfile {
    pub bit_width: u32,
    pub bytes_per_parameter: f64,
    pub system_ram_multiplier: f64,
}

impl QuantizationProfile {
    /// Profile for a normalized code. Unknown codes (including "") get the default.
    pub fn for_code(code: &str) -> Self {
        let bit_width = quantization_bits(code);
        Self {
            bit_width,
            bytes_per_parameter: bytes_per_parameter(bit_width),
            system_ram_multiplier: system_ram_multiplier(bit_width),
        }
    }

    /// Profile for a raw level string such as `Q4_K_M`
    pub fn for_level(level: &str) -> Result<Self, EstimateError> {
        let code = normalize_quantization_level(level)?;
        let profile = Self::for_code(code);
        if profile.bit_width == DEFAULT_BITS {
            tracing::warn!(
                "Quantization level {} not recognized, using default profile",
                level
            );
        }
        Ok(profile)
    }
}

/// Reduce a raw quantization level to its class code.
///
/// `Q4_K_M` -> `Q4`, `F16` -> `F16`, `BF16` -> `F16`. Any other prefix yields `""`.
pub fn normalize_quantization_level(level: &str) -> Result<&str, EstimateError> {
    let first = level
        .chars()
        .next()
        .ok_or(EstimateError::EmptyQuantizationLevel)?;

    let code = match first {
        'Q' => prefix(level, 0, 2),
        'F' => prefix(level, 0, 3),
        'B' => prefix(level, 1, 4),
        _ => "",
    };

    Ok(code)
}

/// Byte-range slice clipped to the string's length
fn prefix(level: &str, start: usize, end: usize) -> &str {
    let end = end.min(level.len());
    level.get(start.min(end)..end).unwrap_or("")
}

pub fn quantization_bits(code: &str) -> u32 {
    match code {
        "Q4" => 4,
        "Q5" => 5,
        "Q8" => 8,
        "F16" => 16,
        "F32" => 32,
        _ => DEFAULT_BITS,
    }
}

pub fn bytes_per_parameter(bits: u32) -> f64 {
    match bits {
        4 => 0.5,
        5 => 0.625,
        8 => 1.0,
        16 => 2.0,
        32 => 4.0,
        // unspecified or legacy GGUF quantization
        _ => 1.5,
    }
}

pub fn system_ram_multiplier(bits: u32) -> f64 {
    match bits {
        4 => 1.1,
        5 => 1.15,
        8 => 1.0,
        16 => 2.0,
        32 => 4.0,
        _ => 1.5,
    }
}
