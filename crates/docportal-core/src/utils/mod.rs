//! Utility functions for formatting and searching.

pub mod format;
pub mod search;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, format_date, or_dash, strip_html, truncate};
pub use search::{filter_by_name, Named};
