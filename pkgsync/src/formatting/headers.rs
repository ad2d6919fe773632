//! Section header formatting.

use owo_colors::OwoColorize;

/// Style options for section headers.
#[derive(Debug, Clone, Copy)]
pub enum SectionStyle {
    Primary,
    Warning,
}

impl SectionStyle {
    fn colorize(&self, text: &str) -> String {
        match self {
            SectionStyle::Primary => text.cyan().bold().to_string(),
            SectionStyle::Warning => text.yellow().bold().to_string(),
        }
    }
}

/// Prints a section header preceded by a blank line.
pub fn print_section_header(title: &str, style: SectionStyle) {
    println!();
    println!("{}", style.colorize(title));
}
