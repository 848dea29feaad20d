//! App Generator
//!
//! Turns a free-text brief into the static files of a small web application.
//! The bundle is always rendered from built-in templates; no external
//! generative service is contacted.

pub mod generator;
pub mod templates;

pub use generator::{AppGenerator, GeneratedApp, TemplateGenerator};
pub use templates::license::MIT_LICENSE;
