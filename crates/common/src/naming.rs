//! Naming conventions for published repositories

/// Prefix shared by every generated repository
pub const REPOSITORY_PREFIX: &str = "auto-app-";

/// Derive the repository name for a task.
///
/// Spaces become hyphens and the result is lower-cased; nothing else is touched.
pub fn repository_name(task_id: &str) -> String {
    format!("{}{}", REPOSITORY_PREFIX, task_id.replace(' ', "-").to_lowercase())
}

/// Hosting URL for a repository, by convention only
pub fn pages_url(account: &str, repo_name: &str) -> String {
    format!("https://{}.github.io/{}", account, repo_name)
}
