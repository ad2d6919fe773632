//! CLI formatting utilities.
//!
//! Colors, status symbols and tables shared by the sync commands.

mod headers;
mod status;
mod tables;

pub use headers::{print_section_header, SectionStyle};
pub use status::{
    print_dry_run_banner, print_error, print_info, print_success, print_summary, print_warning,
    Status,
};
pub use tables::{print_change_table, print_copy_table};
