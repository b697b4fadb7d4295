//! Report rendering
//!
//! Plain-text and tabular views over pipeline results and standalone estimates.
//! Renderers write to any `io::Write` so the binary can target stdout and tests a buffer.

use std::io::{self, Write};

use crate::estimate::quantization::{normalize_quantization_level, quantization_bits};
use crate::estimate::{format_memory_size, format_param_count, MemoryEstimate};
use crate::types::{ModelDescriptor, ModelItem};

/// Context lengths above this get a tuning note in the plain listing
pub const LARGE_CONTEXT_THRESHOLD: u64 = 8192;

const RULE: &str = "----------------------------------------------------";

/// Memory breakdown block shared by the listing and the `estimate` command
pub fn write_memory_breakdown<W: Write>(out: &mut W, estimate: &MemoryEstimate) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  Memory Breakdown:")?;
    writeln!(
        out,
        "    Model Weights Memory: {}",
        format_memory_size(estimate.base_model_size_gb)
    )?;
    writeln!(
        out,
        "    KV Cache (for context): {}",
        format_memory_size(estimate.kv_cache_size_gb)
    )?;
    writeln!(out, "    GPU VRAM: {}", format_memory_size(estimate.gpu_ram_gb))?;
    writeln!(out, "    System RAM: {}", format_memory_size(estimate.system_ram_gb))
}

fn write_descriptor<W: Write>(out: &mut W, descriptor: &ModelDescriptor) -> io::Result<()> {
    writeln!(
        out,
        "  Parameters: {} ({})",
        format_param_count(descriptor.parameter_count),
        descriptor.parameter_count
    )?;
    writeln!(out, "  Quantization: {}", descriptor.quantization_level)?;
    writeln!(out, "  Context Length: {} tokens", descriptor.context_length)?;
    if descriptor.embedding_length > 0 {
        writeln!(out, "  Embedding Length: {}", descriptor.embedding_length)?;
    }

    match descriptor.estimate() {
        Ok(estimate) => write_memory_breakdown(out, &estimate)?,
        Err(e) => {
            writeln!(out)?;
            writeln!(out, "  Memory Breakdown: unavailable ({})", e)?;
        }
    }

    if descriptor.context_length > LARGE_CONTEXT_THRESHOLD {
        writeln!(out)?;
        writeln!(
            out,
            "Note: This model has a large context length ({} tokens).",
            descriptor.context_length
        )?;
        writeln!(
            out,
            "Reducing num_ctx in your Ollama request can significantly lower memory usage."
        )?;
    }
    Ok(())
}

/// One model block; failed items show their error inline
pub fn write_model<W: Write>(out: &mut W, item: &ModelItem) -> io::Result<()> {
    writeln!(out, "Model: {}", item.name)?;
    match &item.outcome {
        Ok(descriptor) => write_descriptor(out, descriptor)?,
        Err(e) => writeln!(out, "  Error: {}", e)?,
    }
    writeln!(out)
}

/// Plain listing, one block per model
pub fn write_plain<W: Write>(out: &mut W, items: &[ModelItem]) -> io::Result<()> {
    writeln!(out, "Available models:")?;
    writeln!(out, "{}", RULE)?;
    for item in items {
        write_model(out, item)?;
    }
    Ok(())
}

/// Breakdown for a standalone estimate
pub fn write_estimate<W: Write>(
    out: &mut W,
    parameter_count: u64,
    context_length: u64,
    quantization_level: &str,
    estimate: &MemoryEstimate,
) -> io::Result<()> {
    writeln!(
        out,
        "Parameters: {} ({})",
        format_param_count(parameter_count),
        parameter_count
    )?;
    writeln!(out, "Quantization: {}", quantization_level)?;
    writeln!(out, "Context Length: {} tokens", context_length)?;
    write_memory_breakdown(out, estimate)
}

// ============================================================================
// Table view
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
}

const COLUMNS: [(&str, Align); 11] = [
    ("Model", Align::Left),
    ("Params", Align::Right),
    ("Param count", Align::Right),
    ("Quant level", Align::Left),
    ("Quant bits", Align::Right),
    ("Context", Align::Right),
    ("Embedding", Align::Right),
    ("Base size", Align::Right),
    ("KV cache", Align::Right),
    ("GPU RAM", Align::Right),
    ("System RAM", Align::Right),
];

fn gb(value: f64) -> String {
    format!("{:.2} GB", value)
}

fn table_row(item: &ModelItem) -> Vec<String> {
    let Some(descriptor) = item.descriptor() else {
        let mut row = vec![item.name.clone()];
        row.resize(COLUMNS.len(), "-".to_string());
        return row;
    };

    let bits = normalize_quantization_level(&descriptor.quantization_level)
        .map(|code| quantization_bits(code).to_string())
        .unwrap_or_else(|_| "-".to_string());

    let sizes = match descriptor.estimate() {
        Ok(m) => [
            gb(m.base_model_size_gb),
            gb(m.kv_cache_size_gb),
            gb(m.gpu_ram_gb),
            gb(m.system_ram_gb),
        ],
        Err(_) => std::array::from_fn(|_| "-".to_string()),
    };

    let mut row = vec![
        item.name.clone(),
        format_param_count(descriptor.parameter_count),
        descriptor.parameter_count.to_string(),
        descriptor.quantization_level.clone(),
        bits,
        descriptor.context_length.to_string(),
        descriptor.embedding_length.to_string(),
    ];
    row.extend(sizes);
    row
}

fn write_cells<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(COLUMNS.iter())
        .map(|((cell, &width), (_, align))| match align {
            Align::Left => format!("{:<width$}", cell),
            Align::Right => format!("{:>width$}", cell),
        })
        .collect();
    writeln!(out, "{}", line.join("  ").trim_end())
}

/// Table listing with column widths fitted to the content.
///
/// Failed items get a row of dashes and their errors are listed under the table.
pub fn write_table<W: Write>(out: &mut W, items: &[ModelItem]) -> io::Result<()> {
    let header: Vec<String> = COLUMNS.iter().map(|(h, _)| h.to_string()).collect();
    let rows: Vec<Vec<String>> = items.iter().map(table_row).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_cells(out, &header, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in &rows {
        write_cells(out, row, &widths)?;
    }

    let failures: Vec<&ModelItem> = items.iter().filter(|item| !item.is_ok()).collect();
    if !failures.is_empty() {
        writeln!(out)?;
        for item in failures {
            if let Some(e) = item.error() {
                writeln!(out, "{}: Error: {}", item.name, e)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::estimate_memory;
    use crate::ollama::OllamaError;

    fn phi4() -> ModelDescriptor {
        ModelDescriptor {
            parameter_count: 14_659_507_200,
            context_length: 16_384,
            embedding_length: 5_120,
            quantization_level: "Q4_K_M".to_string(),
            family: "phi3".to_string(),
            parameter_size: "14.7B".to_string(),
            format: "gguf".to_string(),
            model_type: "model".to_string(),
        }
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_plain_model_block() {
        let items = vec![ModelItem::new("phi4:latest", Ok(phi4()))];
        let text = render(|out| write_plain(out, &items));

        assert!(text.starts_with("Available models:\n"));
        assert!(text.contains("Model: phi4:latest\n"));
        assert!(text.contains("  Parameters: 14.66B (14659507200)\n"));
        assert!(text.contains("  Quantization: Q4_K_M\n"));
        assert!(text.contains("  Context Length: 16384 tokens\n"));
        assert!(text.contains("  Embedding Length: 5120\n"));
        assert!(text.contains("    Model Weights Memory: 6.83 GB\n"));
        assert!(text.contains("large context length (16384 tokens)"));
    }

    #[test]
    fn test_plain_small_context_and_no_embedding() {
        let descriptor = ModelDescriptor {
            context_length: 4_096,
            embedding_length: 0,
            ..phi4()
        };
        let text = render(|out| write_model(out, &ModelItem::new("small", Ok(descriptor))));

        assert!(!text.contains("Embedding Length"));
        assert!(!text.contains("Note:"));
        assert!(text.contains("Memory Breakdown:"));
    }

    #[test]
    fn test_plain_error_inline() {
        let items = vec![
            ModelItem::new("broken", Err(OllamaError::Network("connection refused".into()))),
            ModelItem::new("phi4:latest", Ok(phi4())),
        ];
        let text = render(|out| write_plain(out, &items));

        assert!(text.contains("Model: broken\n  Error: Network error: connection refused\n"));
        assert!(text.contains("Model: phi4:latest"));
    }

    #[test]
    fn test_plain_empty_quantization_level() {
        let descriptor = ModelDescriptor {
            quantization_level: String::new(),
            ..phi4()
        };
        let text = render(|out| write_model(out, &ModelItem::new("odd", Ok(descriptor))));
        assert!(text.contains("Memory Breakdown: unavailable"));
    }

    #[test]
    fn test_estimate_breakdown() {
        let estimate = estimate_memory(14_659_507_200, 16_384, "Q4_K_M").unwrap();
        let text = render(|out| write_estimate(out, 14_659_507_200, 16_384, "Q4_K_M", &estimate));

        assert!(text.contains("Parameters: 14.66B (14659507200)\n"));
        assert!(text.contains("    Model Weights Memory: 6.83 GB\n"));
        assert!(text.contains("    GPU VRAM: "));
        assert!(text.contains("    System RAM: "));
    }

    #[test]
    fn test_table_layout() {
        let items = vec![
            ModelItem::new("phi4:latest", Ok(phi4())),
            ModelItem::new("gone:7b", Err(OllamaError::Protocol {
                status: 404,
                body: "model not found".into(),
            })),
        ];
        let text = render(|out| write_table(out, &items));
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Model "));
        assert!(lines[0].ends_with("System RAM"));
        assert!(lines[1].starts_with("-----------"));

        let row = lines[2];
        assert!(row.starts_with("phi4:latest"));
        assert!(row.contains("14.66B"));
        assert!(row.contains("14659507200"));
        assert!(row.contains("Q4_K_M"));
        assert!(row.contains("6.83 GB"));

        assert!(lines[3].starts_with("gone:7b"));
        assert!(text.contains("gone:7b: Error: Unexpected response status 404: model not found"));

        // every row is as wide as the header
        assert_eq!(lines[0].len(), lines[2].len());
    }

    #[test]
    fn test_table_without_items() {
        let text = render(|out| write_table(out, &[]));
        assert_eq!(text.lines().count(), 2);
    }
}
