//! Zip archives for layers and function packages

use crate::error::{DeployError, DeployResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Facts about a written archive
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the archive
    pub sha256: String,
    /// Base64 SHA-256, the form Lambda reports as `CodeSha256`
    pub code_sha256: String,
    pub entries: usize,
}

/// Writes deflate-compressed zip archives
pub struct Archiver;

impl Archiver {
    /// Archive the contents of `dir` into `archive`, paths relative to `dir`
    pub fn zip_dir(dir: &Path, archive: &Path) -> DeployResult<ArchiveInfo> {
        info!("Archiving contents of {} into {}", dir.display(), archive.display());
        for line in tree_listing(dir)? {
            info!("{}", line);
        }

        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)
            .map_err(|e| DeployError::io(format!("walking {}", dir.display()), e))?;
        files.sort();

        let entries: Vec<(PathBuf, String)> = files
            .into_iter()
            .map(|rel| {
                let name = entry_name(&rel);
                (dir.join(&rel), name)
            })
            .collect();

        write_archive(archive, &entries)
    }

    /// Archive a single file under `entry` (used for the bootstrap binary)
    pub fn zip_file(file: &Path, entry: &str, archive: &Path) -> DeployResult<ArchiveInfo> {
        if !file.is_file() {
            return Err(DeployError::PathNotFound(file.to_path_buf()));
        }
        write_archive(archive, &[(file.to_path_buf(), entry.to_string())])
    }
}

fn write_archive(archive: &Path, entries: &[(PathBuf, String)]) -> DeployResult<ArchiveInfo> {
    let zip_err = |e: zip::result::ZipError| DeployError::Archive {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DeployError::io(format!("creating {}", parent.display()), e))?;
    }
    let out = File::create(archive)
        .map_err(|e| DeployError::io(format!("creating {}", archive.display()), e))?;
    let mut zip = ZipWriter::new(out);

    for (src, name) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(true)
            .unix_permissions(file_mode(src));
        zip.start_file(name.as_str(), options).map_err(zip_err)?;
        let mut input =
            File::open(src).map_err(|e| DeployError::io(format!("reading {}", src.display()), e))?;
        io::copy(&mut input, &mut zip)
            .map_err(|e| DeployError::io(format!("compressing {}", src.display()), e))?;
    }

    let mut out = zip.finish().map_err(zip_err)?;
    out.flush()
        .map_err(|e| DeployError::io(format!("writing {}", archive.display()), e))?;

    let bytes = fs::read(archive)
        .map_err(|e| DeployError::io(format!("reading {}", archive.display()), e))?;
    let digest = Sha256::digest(&bytes);

    Ok(ArchiveInfo {
        path: archive.to_path_buf(),
        size: bytes.len() as u64,
        sha256: hex::encode(digest),
        code_sha256: BASE64.encode(digest),
        entries: entries.len(),
    })
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o644
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Zip entry names always use `/`
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Two-level tree of `dir` for the build log
pub fn tree_listing(dir: &Path) -> DeployResult<Vec<String>> {
    let top = sorted_entries(dir)?;
    let mut lines = Vec::new();

    for (i, path) in top.iter().enumerate() {
        let last = i == top.len() - 1;
        lines.push(format!(
            "{} {}",
            if last { "└─" } else { "├─" },
            display_name(path)
        ));

        if path.is_dir() {
            let children = sorted_entries(path)?;
            for (j, child) in children.iter().enumerate() {
                lines.push(format!(
                    "{}  {} {}",
                    if last { " " } else { "│" },
                    if j == children.len() - 1 { "└─" } else { "├─" },
                    display_name(child)
                ));
            }
        }
    }
    Ok(lines)
}

fn sorted_entries(dir: &Path) -> DeployResult<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| DeployError::io(format!("reading {}", dir.display()), e))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if path.is_dir() {
        format!("{}/", name)
    } else {
        name
    }
}
