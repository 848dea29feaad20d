//! Application bundle generation

use crate::templates;
use autobuild_common::Result;
use serde::Serialize;
use tracing::debug;

/// Files produced for one build as `(path, content)` pairs, in commit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedApp {
    pub files: Vec<(String, String)>,
    pub explanation: String,
}

impl GeneratedApp {
    /// Number of files in the bundle
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Content of the file at `path`
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, content)| content.as_str())
    }
}

/// Produces an application bundle from a brief.
///
/// Attachments and checks are passed through so implementations can use them;
/// the template generator ignores both.
pub trait AppGenerator: Send + Sync {
    fn generate(
        &self,
        brief: &str,
        attachments: &[serde_json::Value],
        checks: &[serde_json::Value],
    ) -> Result<GeneratedApp>;
}

/// Renders the fixed counter-app templates around the brief
#[derive(Debug, Default, Clone)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl AppGenerator for TemplateGenerator {
    fn generate(
        &self,
        brief: &str,
        attachments: &[serde_json::Value],
        checks: &[serde_json::Value],
    ) -> Result<GeneratedApp> {
        debug!(
            attachments = attachments.len(),
            checks = checks.len(),
            "Rendering template app"
        );

        let files = vec![
            ("index.html".to_string(), templates::index_html::render(brief)),
            ("README.md".to_string(), templates::readme::render(brief)),
        ];

        Ok(GeneratedApp {
            files,
            explanation: templates::EXPLANATION.to_string(),
        })
    }
}
