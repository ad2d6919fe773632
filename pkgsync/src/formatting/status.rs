//! Status indicators and message formatting.

use owo_colors::OwoColorize;
use pkgsync_core::Summary;

/// Status types for consistent formatting.
#[derive(Debug, Clone, Copy)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

impl Status {
    /// Returns the symbol for this status.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Error => "✗",
            Status::Warning => "⚠",
            Status::Info => "→",
        }
    }

    /// Returns the colored symbol for this status.
    pub fn colored_symbol(&self) -> String {
        match self {
            Status::Success => self.symbol().green().to_string(),
            Status::Error => self.symbol().red().to_string(),
            Status::Warning => self.symbol().yellow().to_string(),
            Status::Info => self.symbol().cyan().to_string(),
        }
    }

    /// Formats a status message with symbol and color.
    pub fn format(&self, message: &str) -> String {
        format!("{} {}", self.colored_symbol(), self.colorize_text(message))
    }

    fn colorize_text(&self, text: &str) -> String {
        match self {
            Status::Success => text.green().bold().to_string(),
            Status::Error => text.red().bold().to_string(),
            Status::Warning => text.yellow().bold().to_string(),
            Status::Info => text.to_string(),
        }
    }
}

impl From<&Summary> for Status {
    fn from(summary: &Summary) -> Self {
        match summary {
            Summary::Success(_) => Status::Success,
            Summary::Failure(_) => Status::Warning,
            Summary::Noop(_) => Status::Info,
        }
    }
}

pub fn print_success(message: &str) {
    println!("{}", Status::Success.format(message));
}

/// Errors go to stderr so they survive output redirection.
pub fn print_error(message: &str) {
    eprintln!("{}", Status::Error.format(message));
}

pub fn print_warning(message: &str) {
    println!("{}", Status::Warning.format(message));
}

pub fn print_info(message: &str) {
    println!("{}", Status::Info.format(message));
}

pub fn print_summary(summary: &Summary) {
    println!("{}", Status::from(summary).format(summary.message()));
}

/// Printed before and after a dry run so nobody mistakes it for the real thing.
pub fn print_dry_run_banner() {
    let warning = Status::Warning.colored_symbol().repeat(3);
    println!("{} {} {}", warning, "DRY RUN".yellow().bold(), warning);
}
