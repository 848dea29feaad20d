//! Publishes generated apps as GitHub repositories

use crate::github::{RemoteRepository, RepositoryHost};
use crate::models::FailedFile;
use anyhow::Result;
use app_generator::MIT_LICENSE;
use autobuild_common::{naming, Error};
use std::sync::Arc;
use tracing::{info, warn};

/// GitHub caps repository descriptions at this many characters
const MAX_DESCRIPTION_CHARS: usize = 350;

/// A created repository and the SHA of its license commit
#[derive(Debug, Clone)]
pub struct PublishedRepository {
    pub repository: RemoteRepository,
    pub license_sha: String,
}

/// Result of committing a bundle file by file
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    pub committed: Vec<String>,
    pub failed: Vec<FailedFile>,
    pub last_commit_sha: Option<String>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates repositories and commits files through a [`RepositoryHost`]
#[derive(Clone)]
pub struct Publisher {
    host: Arc<dyn RepositoryHost>,
}

impl Publisher {
    pub fn new(host: Arc<dyn RepositoryHost>) -> Self {
        Self { host }
    }

    /// Create the repository for a task and add the MIT license.
    ///
    /// Any failure here is reported as a repository-creation error.
    pub async fn create_repository(
        &self,
        task_id: &str,
        description: &str,
    ) -> Result<PublishedRepository> {
        let name = naming::repository_name(task_id);
        let description: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();

        let repository = self
            .host
            .create_repository(&name, &description)
            .await
            .map_err(|e| Error::RepositoryCreate(format!("{:#}", e)))?;

        let license_sha = self
            .host
            .create_file(&repository, "LICENSE", "Add MIT License", MIT_LICENSE)
            .await
            .map_err(|e| Error::RepositoryCreate(format!("{:#}", e)))?;

        info!("Repository created: {}", repository.html_url);

        Ok(PublishedRepository {
            repository,
            license_sha,
        })
    }

    /// Commit each file on its own, in bundle order. Failed files are logged,
    /// skipped and reported.
    pub async fn commit_files(
        &self,
        published: &PublishedRepository,
        files: &[(String, String)],
    ) -> CommitReport {
        let mut report = CommitReport::default();

        for (path, content) in files {
            let message = format!("Add {}", path);
            match self
                .host
                .create_file(&published.repository, path, &message, content)
                .await
            {
                Ok(sha) => {
                    info!("File committed: {}", path);
                    report.committed.push(path.clone());
                    report.last_commit_sha = Some(sha);
                }
                Err(e) => {
                    warn!("Could not commit {}: {:#}", path, e);
                    report.failed.push(FailedFile {
                        path: path.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        report
    }

    /// Pages URL for a repository. Nothing checks that Pages is actually enabled.
    pub fn pages_url(&self, repository: &RemoteRepository) -> String {
        let url = naming::pages_url(self.host.account(), &repository.name);
        info!("GitHub Pages will be available at: {}", url);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory host recording every call
    #[derive(Default)]
    struct FakeHost {
        fail_create: bool,
        failing_paths: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RepositoryHost for FakeHost {
        fn account(&self) -> &str {
            "octocat"
        }

        async fn create_repository(
            &self,
            name: &str,
            description: &str,
        ) -> Result<RemoteRepository> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {} ({})", name, description.len()));
            if self.fail_create {
                anyhow::bail!("name already exists on this account");
            }
            Ok(RemoteRepository {
                name: name.to_string(),
                owner: "octocat".to_string(),
                html_url: format!("https://github.com/octocat/{}", name),
            })
        }

        async fn create_file(
            &self,
            _repo: &RemoteRepository,
            path: &str,
            message: &str,
            _content: &str,
        ) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(format!("{} -> {}", message, path));
            if self.failing_paths.contains(&path) {
                anyhow::bail!("409 conflict");
            }
            Ok(format!("sha{}", calls.len()))
        }
    }

    fn files() -> Vec<(String, String)> {
        vec![
            ("index.html".to_string(), "<html></html>".to_string()),
            ("README.md".to_string(), "# App".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_create_repository_adds_license() {
        let host = Arc::new(FakeHost::default());
        let publisher = Publisher::new(host.clone());

        let published = publisher.create_repository("My Task", "brief").await.unwrap();

        assert_eq!(published.repository.name, "auto-app-my-task");
        assert_eq!(published.license_sha, "sha2");
        assert_eq!(
            *host.calls.lock().unwrap(),
            vec![
                "create auto-app-my-task (5)".to_string(),
                "Add MIT License -> LICENSE".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_create_repository_failure() {
        let host = Arc::new(FakeHost {
            fail_create: true,
            ..FakeHost::default()
        });
        let publisher = Publisher::new(host);

        let err = publisher.create_repository("t1", "brief").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create repository: name already exists on this account"
        );
    }

    #[tokio::test]
    async fn test_long_description_is_truncated() {
        let host = Arc::new(FakeHost::default());
        let publisher = Publisher::new(host.clone());

        publisher
            .create_repository("t1", &"x".repeat(1000))
            .await
            .unwrap();

        assert_eq!(host.calls.lock().unwrap()[0], "create auto-app-t1 (350)");
    }

    #[tokio::test]
    async fn test_commit_files_reports_partial_failure() {
        let host = Arc::new(FakeHost {
            failing_paths: vec!["README.md"],
            ..FakeHost::default()
        });
        let publisher = Publisher::new(host.clone());
        let published = publisher.create_repository("t1", "brief").await.unwrap();

        let report = publisher.commit_files(&published, &files()).await;

        assert!(!report.is_complete());
        assert_eq!(report.committed, vec!["index.html".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "README.md");
        assert!(report.failed[0].error.contains("409 conflict"));
        assert_eq!(report.last_commit_sha.as_deref(), Some("sha3"));
    }

    #[tokio::test]
    async fn test_commit_files_keeps_bundle_order() {
        let host = Arc::new(FakeHost::default());
        let publisher = Publisher::new(host.clone());
        let published = publisher.create_repository("t1", "brief").await.unwrap();

        let report = publisher.commit_files(&published, &files()).await;

        assert!(report.is_complete());
        assert_eq!(
            report.committed,
            vec!["index.html".to_string(), "README.md".to_string()]
        );
        assert_eq!(report.last_commit_sha.as_deref(), Some("sha4"));
        assert_eq!(host.calls.lock().unwrap()[3], "Add README.md -> README.md");
    }

    #[tokio::test]
    async fn test_pages_url() {
        let publisher = Publisher::new(Arc::new(FakeHost::default()));
        let repo = RemoteRepository {
            name: "auto-app-t1".to_string(),
            owner: "octocat".to_string(),
            html_url: "https://github.com/octocat/auto-app-t1".to_string(),
        };
        assert_eq!(
            publisher.pages_url(&repo),
            "https://octocat.github.io/auto-app-t1"
        );
    }
}
