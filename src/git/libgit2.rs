//! libgit2-backed git client

use super::{redact, split_credentials, GitClient};
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, Object, ObjectType, RemoteCallbacks, Repository, ResetType};
use std::path::Path;
use tokio::task;
use tracing::{debug, info};

/// Git client using the linked libgit2 library
#[derive(Debug, Clone, Default)]
pub struct Libgit2Client;

impl Libgit2Client {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitClient for Libgit2Client {
    async fn clone_or_pull(
        &self,
        url: &str,
        dest: &Path,
        reference: Option<&str>,
    ) -> DeployResult<()> {
        let url = url.to_owned();
        let dest = dest.to_path_buf();
        let reference = reference.map(str::to_owned);

        // libgit2 is blocking
        task::spawn_blocking(move || clone_or_pull_sync(&url, &dest, reference.as_deref()))
            .await
            .map_err(|e| DeployError::Internal(format!("git task failed: {e}")))?
    }
}

fn clone_or_pull_sync(url: &str, dest: &Path, reference: Option<&str>) -> DeployResult<()> {
    let shown = redact(url);
    if dest.join(".git").exists() {
        info!("Pulling {} into {}", shown, dest.display());
        pull(url, dest, reference).map_err(|e| DeployError::GitPull {
            url: shown,
            reason: e.message().to_string(),
        })
    } else {
        info!("Cloning {} into {}", shown, dest.display());
        clone(url, dest, reference).map_err(|e| DeployError::GitClone {
            url: shown,
            reason: e.message().to_string(),
        })
    }
}

fn fetch_options(creds: Option<(String, String)>) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempted = false;
    callbacks.credentials(move |_url, _username, _allowed| {
        // libgit2 keeps asking while credentials are rejected
        if attempted {
            return Err(git2::Error::from_str("authentication failed"));
        }
        attempted = true;
        match &creds {
            Some((user, pass)) => Cred::userpass_plaintext(user, pass),
            None => Cred::default(),
        }
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Refspecs fetched when a ref is requested, so branches and tags both resolve
const FETCH_REFSPECS: &[&str] = &[
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
];

fn clone(url: &str, dest: &Path, reference: Option<&str>) -> Result<(), git2::Error> {
    let (clean_url, creds) = split_credentials(url);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| git2::Error::from_str(&e.to_string()))?;
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(creds));
    let repo = builder.clone(&clean_url, dest)?;
    debug!("Cloned into {}", dest.display());

    if let Some(reference) = reference {
        let target = resolve_ref(&repo, reference)?;
        checkout(&repo, &target)?;
    }
    Ok(())
}

fn pull(url: &str, dest: &Path, reference: Option<&str>) -> Result<(), git2::Error> {
    let (clean_url, creds) = split_credentials(url);
    let repo = Repository::open(dest)?;
    let mut remote = repo.remote_anonymous(&clean_url)?;

    let target = match reference {
        Some(reference) => {
            remote.fetch(FETCH_REFSPECS, Some(&mut fetch_options(creds)), None)?;
            resolve_ref(&repo, reference)?
        }
        None => {
            remote.fetch(&["HEAD"], Some(&mut fetch_options(creds)), None)?;
            repo.find_reference("FETCH_HEAD")?.peel(ObjectType::Commit)?
        }
    };
    checkout(&repo, &target)
}

/// Commit named by `reference`: a branch, else a tag, else any revision
/// such as a full or abbreviated commit SHA
fn resolve_ref<'r>(repo: &'r Repository, reference: &str) -> Result<Object<'r>, git2::Error> {
    let candidates = [
        format!("refs/remotes/origin/{}", reference),
        format!("refs/tags/{}", reference),
    ];
    for name in &candidates {
        if let Ok(found) = repo.find_reference(name) {
            debug!("Resolved {} as {}", reference, name);
            return found.peel(ObjectType::Commit);
        }
    }
    repo.revparse_single(reference)?.peel(ObjectType::Commit)
}

/// Detach HEAD at `target` and make the working tree match it
fn checkout(repo: &Repository, target: &Object<'_>) -> Result<(), git2::Error> {
    repo.set_head_detached(target.id())?;
    repo.reset(target, ResetType::Hard, None)?;
    debug!("Checked out {}", target.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    struct Upstream {
        url: String,
        main: git2::Oid,
        feature: git2::Oid,
    }

    /// Create a repository with one commit on `main` and one on `feature`,
    /// the latter also tagged `v1.2.0`
    fn upstream(dir: &Path) -> Upstream {
        let repo = Repository::init(dir).unwrap();
        let sig = Signature::now("Deployer", "deploy@example.com").unwrap();

        std::fs::write(dir.join("app.py"), "print('main')\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("app.py")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let main = repo
            .commit(Some("refs/heads/main"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        repo.set_head("refs/heads/main").unwrap();

        let first = repo.find_commit(main).unwrap();
        std::fs::write(dir.join("feature.py"), "print('feature')\n").unwrap();
        index.add_path(Path::new("feature.py")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let feature = repo
            .commit(Some("refs/heads/feature"), &sig, &sig, "feature", &tree, &[&first])
            .unwrap();
        let tagged = repo.find_object(feature, None).unwrap();
        repo.tag_lightweight("v1.2.0", &tagged, false).unwrap();

        // Restore the working tree to main
        std::fs::remove_file(dir.join("feature.py")).unwrap();
        Upstream {
            url: format!("file://{}", dir.display()),
            main,
            feature,
        }
    }

    fn head_of(dest: &Path) -> git2::Oid {
        Repository::open(dest)
            .unwrap()
            .head()
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .id()
    }

    #[tokio::test]
    async fn clones_then_pulls_branch() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);
        let dest = temp.path().join("checkout");

        let client = Libgit2Client::new();
        client.clone_or_pull(&upstream.url, &dest, None).await.unwrap();
        assert!(dest.join("app.py").exists());
        assert!(!dest.join("feature.py").exists());

        client
            .clone_or_pull(&upstream.url, &dest, Some("feature"))
            .await
            .unwrap();
        assert!(dest.join("feature.py").exists());

        client.clone_or_pull(&upstream.url, &dest, None).await.unwrap();
        assert!(!dest.join("feature.py").exists());
        assert_eq!(head_of(&dest), upstream.main);
    }

    #[tokio::test]
    async fn clone_with_branch() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);
        let dest = temp.path().join("venv/src/module");

        Libgit2Client::new()
            .clone_or_pull(&upstream.url, &dest, Some("feature"))
            .await
            .unwrap();
        assert!(dest.join("feature.py").exists());
        assert_eq!(head_of(&dest), upstream.feature);
    }

    #[tokio::test]
    async fn clone_with_tag() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);
        let dest = temp.path().join("venv/src/tagged");

        Libgit2Client::new()
            .clone_or_pull(&upstream.url, &dest, Some("v1.2.0"))
            .await
            .unwrap();
        assert!(dest.join("feature.py").exists());
        assert_eq!(head_of(&dest), upstream.feature);
    }

    #[tokio::test]
    async fn clone_and_pull_with_commit_sha() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);
        let dest = temp.path().join("venv/src/pinned");
        let client = Libgit2Client::new();

        let feature_sha = upstream.feature.to_string();
        client
            .clone_or_pull(&upstream.url, &dest, Some(&feature_sha))
            .await
            .unwrap();
        assert_eq!(head_of(&dest), upstream.feature);

        // An existing checkout moves to a pinned commit, abbreviated or not
        let main_sha = upstream.main.to_string();
        client
            .clone_or_pull(&upstream.url, &dest, Some(&main_sha[..12]))
            .await
            .unwrap();
        assert_eq!(head_of(&dest), upstream.main);
        assert!(!dest.join("feature.py").exists());
    }

    #[tokio::test]
    async fn pull_with_tag() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);
        let dest = temp.path().join("checkout");
        let client = Libgit2Client::new();

        client.clone_or_pull(&upstream.url, &dest, None).await.unwrap();
        client
            .clone_or_pull(&upstream.url, &dest, Some("v1.2.0"))
            .await
            .unwrap();
        assert_eq!(head_of(&dest), upstream.feature);
    }

    #[tokio::test]
    async fn unknown_ref_fails_clone() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let upstream = upstream(&origin);

        let err = Libgit2Client::new()
            .clone_or_pull(&upstream.url, &temp.path().join("dest"), Some("v9.9.9"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::GitClone { .. }));
    }

    #[tokio::test]
    async fn missing_repository_fails_clone() {
        let temp = TempDir::new().unwrap();
        let url = format!("file://{}", temp.path().join("nope").display());

        let err = Libgit2Client::new()
            .clone_or_pull(&url, &temp.path().join("dest"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::GitClone { .. }));
    }
}
