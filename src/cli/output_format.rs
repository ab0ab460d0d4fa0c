//! Output format handling for CLI commands

use clap::ValueEnum;

/// Output format for CLI commands
///
/// - `Human`: Colored, human-readable output (default)
/// - `Json`: Machine-readable JSON output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output (default)
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
}

impl OutputFormat {
    /// Returns true if this format should suppress human-friendly messages
    pub fn is_machine_readable(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Pad `value` to `width` columns, truncating with an ellipsis when longer.
pub fn column(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count <= width {
        format!("{:width$}", value, width = width)
    } else if width == 0 {
        String::new()
    } else {
        let mut truncated: String = value.chars().take(width - 1).collect();
        truncated.push('…');
        truncated
    }
}
