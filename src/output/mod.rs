//! Output formatting module
//!
//! Renders runs, history and registry listings for the terminal.

mod formatter;

pub use formatter::{format_ci_banner, OutputFormat, ResultFormatter};
