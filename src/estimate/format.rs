//! Human-readable number formatting for reports

/// Format a parameter count with a B/M/K suffix, e.g. `14.66B`
pub fn format_param_count(parameter_count: u64) -> String {
    let count = parameter_count as f64;
    if parameter_count >= 1_000_000_000 {
        format!("{:.2}B", count / 1_000_000_000.0)
    } else if parameter_count >= 1_000_000 {
        format!("{:.2}M", count / 1_000_000.0)
    } else if parameter_count >= 1_000 {
        format!("{:.2}K", count / 1_000.0)
    } else {
        parameter_count.to_string()
    }
}

/// Format a size given in GB, switching to MB below 1024 MB (an input of 1.0).
///
/// The threshold applies to the converted MB value, not to the raw input: 6.83 prints
/// as "6.83 GB", never as "6.83 MB". Output labels therefore differ from tools that
/// compare the GB input itself against 1024.
pub fn format_memory_size(size_gb: f64) -> String {
    let size_mb = size_gb * 1024.0;
    if size_mb >= 1024.0 {
        format!("{:.2} GB", size_gb)
    } else {
        format!("{:.2} MB", size_mb)
    }
}
