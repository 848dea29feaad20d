//! Built-in templates for the generated application

pub mod index_html;
pub mod license;
pub mod readme;

/// Explanation attached to every template bundle
pub const EXPLANATION: &str = "Demo counter application with Bootstrap styling";

/// Maximum number of brief characters shown in the page title
pub const TITLE_BRIEF_CHARS: usize = 30;
