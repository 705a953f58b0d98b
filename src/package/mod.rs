//! Build directory staging
//!
//! Layers and function packages are assembled in a single scratch build
//! directory that is wiped before each artifact. Layer contents for Python
//! live under `python/`, which Lambda adds to the import path.

pub mod archive;

pub use archive::{ArchiveInfo, Archiver};

use crate::error::{DeployError, DeployResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, warn};

/// Staging directory for one artifact at a time
#[derive(Debug, Clone)]
pub struct BuildDir {
    root: PathBuf,
}

impl BuildDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `python/` inside the build dir
    pub fn python_dir(&self) -> PathBuf {
        self.root.join("python")
    }

    /// Remove everything and recreate an empty `python/`
    pub fn clean(&self) -> DeployResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DeployError::io(
                    format!("removing build dir {}", self.root.display()),
                    e,
                ))
            }
        }
        fs::create_dir_all(self.python_dir()).map_err(|e| {
            DeployError::io(format!("creating build dir {}", self.root.display()), e)
        })?;
        debug!("Cleaned build dir {}", self.root.display());
        Ok(())
    }

    /// Drop `python/` if nothing was installed into it
    pub fn remove_empty_python(&self) -> DeployResult<()> {
        remove_if_empty(&self.python_dir())
    }

    /// Copy manifest `files` from `source_root` into `dest_subdir` of the build dir
    ///
    /// Directories are copied recursively and keep their name; plain files
    /// land directly in `dest_subdir`.
    pub fn copy_files(
        &self,
        source_root: &Path,
        files: &[String],
        dest_subdir: &str,
    ) -> DeployResult<()> {
        let dest_root = self.root.join(dest_subdir);
        fs::create_dir_all(&dest_root)
            .map_err(|e| DeployError::io(format!("creating {}", dest_root.display()), e))?;

        for file in files {
            let src = source_root.join(file);
            if !src.exists() {
                return Err(DeployError::PathNotFound(src));
            }
            let dst = if src.is_dir() {
                dest_root.join(file)
            } else {
                let name = src
                    .file_name()
                    .ok_or_else(|| DeployError::PathNotFound(src.clone()))?;
                dest_root.join(name)
            };
            debug!("Copying {} to {}", src.display(), dst.display());
            copy_path(&src, &dst)?;
        }
        Ok(())
    }

    /// Zip the build dir into `archive`, dropping an empty `python/` first
    pub async fn archive(&self, archive: &Path) -> DeployResult<ArchiveInfo> {
        self.remove_empty_python()?;
        let root = self.root.clone();
        let archive = archive.to_path_buf();
        task::spawn_blocking(move || Archiver::zip_dir(&root, &archive))
            .await
            .map_err(|e| DeployError::Internal(format!("archive task failed: {e}")))?
    }

    /// Copy a module directory from a clone into `python/`
    ///
    /// Returns false when the module directory does not exist.
    pub fn copy_module(&self, clone_dir: &Path, module_dir: &str) -> DeployResult<bool> {
        let src = clone_dir.join(module_dir);
        if !src.is_dir() {
            warn!("Directory not copied: {} does not exist", src.display());
            return Ok(false);
        }
        let dst = self.python_dir().join(module_dir);
        debug!("Copying {} to {}", src.display(), dst.display());
        copy_path(&src, &dst)?;
        Ok(true)
    }
}

/// Copy a file or directory tree
pub fn copy_path(src: &Path, dst: &Path) -> DeployResult<()> {
    if src.is_dir() {
        fs::create_dir_all(dst)
            .map_err(|e| DeployError::io(format!("creating {}", dst.display()), e))?;
        let entries = fs::read_dir(src)
            .map_err(|e| DeployError::io(format!("reading {}", src.display()), e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| DeployError::io(format!("reading {}", src.display()), e))?;
            let name = entry.file_name();
            // Version control metadata never belongs in an artifact
            if name == ".git" {
                continue;
            }
            copy_path(&entry.path(), &dst.join(name))?;
        }
        Ok(())
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DeployError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::copy(src, dst).map_err(|e| {
            DeployError::io(format!("copying {} to {}", src.display(), dst.display()), e)
        })?;
        Ok(())
    }
}

/// Remove `dir` if it exists and is empty
pub fn remove_if_empty(dir: &Path) -> DeployResult<()> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(DeployError::io(format!("reading {}", dir.display()), e)),
    };
    if entries.next().is_none() {
        fs::remove_dir(dir).map_err(|e| DeployError::io(format!("removing {}", dir.display()), e))?;
    }
    Ok(())
}
