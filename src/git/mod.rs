//! Source control access
//!
//! The Lambda runtime ships no git binary, so repositories are cloned with
//! libgit2. The [`GitClient`] trait keeps the build pipeline independent of
//! the transport.

mod libgit2;

pub use libgit2::Libgit2Client;

use crate::error::DeployResult;
use async_trait::async_trait;
use std::path::Path;
use url::Url;

/// Clones and updates repositories
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone `url` into `dest`, or pull into it when a clone already exists.
    /// When `reference` is given (a branch, tag or commit SHA), that revision
    /// ends up checked out.
    async fn clone_or_pull(
        &self,
        url: &str,
        dest: &Path,
        reference: Option<&str>,
    ) -> DeployResult<()>;
}

/// GitHub HTTPS URL of a repository owned by `username`
pub fn repository_url(username: &str, repo_name: &str, token: Option<&str>) -> String {
    let url = format!("https://github.com/{}/{}.git", username, repo_name);
    match token {
        Some(token) if !token.is_empty() => with_token(&url, token),
        _ => url,
    }
}

/// Inject the token into `url` when its owner segment is `username`
pub fn inject_credentials(url: &str, username: &str, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return url.to_string();
    };
    match url.split('/').nth(3) {
        Some(owner) if owner == username => with_token(url, token),
        _ => url.to_string(),
    }
}

fn with_token(url: &str, token: &str) -> String {
    url.replacen("://", &format!("://{}:x-oauth-basic@", token), 1)
}

/// Strip userinfo from `url`, returning the clean URL and any credentials
pub fn split_credentials(url: &str) -> (String, Option<(String, String)>) {
    let Ok(mut parsed) = Url::parse(url) else {
        return (url.to_string(), None);
    };
    if parsed.username().is_empty() && parsed.password().is_none() {
        return (url.to_string(), None);
    }

    let creds = (
        parsed.username().to_string(),
        parsed.password().unwrap_or_default().to_string(),
    );
    // Only fails for cannot-be-a-base URLs, which carry no credentials
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    (parsed.to_string(), Some(creds))
}

/// `url` with any credentials replaced, for logging
pub fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
