//! Client for the GitHub REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use autobuild_common::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const CLIENT_USER_AGENT: &str = concat!("autobuild/", env!("CARGO_PKG_VERSION"));

/// A repository on the hosting account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub owner: String,
    pub html_url: String,
}

/// Operations the publisher needs from a source-hosting provider
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Account that owns created repositories
    fn account(&self) -> &str;

    /// Create an empty public repository
    async fn create_repository(&self, name: &str, description: &str) -> Result<RemoteRepository>;

    /// Add one file as its own commit, returning the commit SHA
    async fn create_file(
        &self,
        repo: &RemoteRepository,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<String>;
}

/// reqwest-backed GitHub client
pub struct GitHubClient {
    base_url: String,
    account: String,
    token: SecretString,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    description: &'a str,
    auto_init: bool,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    name: String,
    html_url: String,
    owner: OwnerResponse,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Debug, Serialize)]
struct CreateFileBody<'a> {
    message: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CreateFileResponse {
    commit: CommitResponse,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(base_url: String, account: String, token: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            account,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }
}

/// Turn a non-success response into [`Error::Hosting`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Hosting {
        status: status.as_u16(),
        body,
    }
    .into())
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    fn account(&self) -> &str {
        &self.account
    }

    async fn create_repository(&self, name: &str, description: &str) -> Result<RemoteRepository> {
        let url = format!("{}/user/repos", self.base_url);

        debug!("Creating repository {} via {}", name, url);

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&CreateRepositoryBody {
                name,
                description,
                auto_init: false,
                private: false,
            })
            .send()
            .await
            .context("Failed to connect to GitHub")?;

        let response = check_status(response).await?;

        let repo: RepositoryResponse = response
            .json()
            .await
            .context("Failed to parse repository response")?;

        Ok(RemoteRepository {
            name: repo.name,
            owner: repo.owner.login,
            html_url: repo.html_url,
        })
    }

    async fn create_file(
        &self,
        repo: &RemoteRepository,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url, repo.owner, repo.name, path
        );

        debug!("Creating file {} in {}", path, repo.name);

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&CreateFileBody {
                message,
                content: STANDARD.encode(content),
            })
            .send()
            .await
            .context("Failed to connect to GitHub")?;

        let response = check_status(response).await?;

        let created: CreateFileResponse = response
            .json()
            .await
            .context("Failed to parse file response")?;

        Ok(created.commit.sha)
    }
}
