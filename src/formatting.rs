//! Display-width rules shared by the samplers and the presentation layer
//!
//! Every string that ends up in a snapshot passes through one of these
//! helpers, so the table code never has to worry about overlong cells.

/// Widths used when building records and drawing them
pub mod layout {
    /// Maximum width of any job field in a snapshot
    pub const FIELD_MAX_LEN: usize = 20;
    /// Partition names are cut to this width in the compact partition view
    pub const PARTITION_NAME_LEN: usize = 8;
    /// Width of the partition load bar, in cells
    pub const LOAD_BAR_WIDTH: usize = 25;
}

/// Usage thresholds for color coding
pub mod thresholds {
    pub const UTILIZATION_LOW: f64 = 50.0;
    pub const UTILIZATION_HIGH: f64 = 80.0;
}

const ELLIPSIS: &str = "...";

/// Truncate a string to a maximum length (in characters), adding "..." at the end if truncated.
///
/// This function is Unicode-safe and counts characters, not bytes.
///
/// # Examples
/// ```
/// use slurmtop::formatting::truncate_string;
/// assert_eq!(truncate_string("hello", 10), "hello");
/// assert_eq!(truncate_string("hello world", 8), "hello...");
/// assert_eq!(truncate_string("ab", 2), "ab");
/// ```
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len <= ELLIPSIS.len() {
        // No room for the marker, plain cut
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - ELLIPSIS.len()).collect();
        format!("{}{}", truncated, ELLIPSIS)
    }
}

/// Truncate a job field to the snapshot width.
#[must_use]
pub fn truncate_field(s: &str) -> String {
    truncate_string(s, layout::FIELD_MAX_LEN)
}

/// Cut a string to `max_len` characters with no marker.
///
/// Used for partition names, where the column is too narrow for an ellipsis.
#[must_use]
pub fn cut_string(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Round to two decimal places, as used for usage percentages.
///
/// Rounds the exact binary value with ties to even, so `3.125` becomes
/// `3.12`. Scaling by 100 first would round such ties away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Format a percentage right-aligned to six columns (e.g. " 80.0%").
#[must_use]
pub fn format_percent(value: f64) -> String {
    // Whole numbers keep one decimal so "80.0%" does not collapse to "80%"
    let text = if value.fract() == 0.0 {
        format!("{:.1}%", value)
    } else {
        format!("{}%", value)
    };
    format!("{:>6}", text)
}
