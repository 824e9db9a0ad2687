//! Archive extraction for built artifacts and tool distributions.
//!
//! Built jar/war artifacts are zip archives and extract verbatim. Provisioned
//! tool distributions (zip for Gradle, tar.gz for Maven) nest everything
//! under a single versioned top-level directory; `strip_components = 1`
//! removes it so `bin/` lands directly inside the layer.
//!
//! Entries that would escape the destination directory are rejected rather
//! than skipped.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors raised during extraction.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid zip archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry escapes the destination directory: {entry}")]
    UnsafeEntry { entry: String },
}

fn read_error(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_error(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Extracts a zip archive into `dest`, recreating directories and unix file
/// permissions. `strip_components` drops that many leading path components
/// from every entry; entries consumed entirely by the strip are skipped.
pub fn extract_zip(
    archive_path: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<(), ArchiveError> {
    let file = File::open(archive_path).map_err(|e| read_error(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|source| {
        ArchiveError::Zip {
            path: archive_path.to_path_buf(),
            source,
        }
    })?;

    fs::create_dir_all(dest).map_err(|e| write_error(dest, e))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| ArchiveError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;

        let Some(entry_path) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry {
                entry: entry.name().to_string(),
            });
        };
        let stripped: PathBuf = entry_path.components().skip(strip_components).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }
        let dest_path = dest.join(&stripped);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| write_error(&dest_path, e))?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        let mut out = File::create(&dest_path).map_err(|e| write_error(&dest_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| write_error(&dest_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| write_error(&dest_path, e))?;
            }
        }
    }

    Ok(())
}

/// Extracts a gzip-compressed tarball into `dest` with the same stripping
/// rules as [`extract_zip`]. Modes and symlinks inside the tarball are
/// preserved by the tar crate itself.
pub fn extract_tar_gz(
    archive_path: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<(), ArchiveError> {
    let file = File::open(archive_path).map_err(|e| read_error(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    fs::create_dir_all(dest).map_err(|e| write_error(dest, e))?;

    for entry in archive.entries().map_err(|e| read_error(archive_path, e))? {
        let mut entry = entry.map_err(|e| read_error(archive_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| read_error(archive_path, e))?
            .into_owned();

        let unsafe_entry = entry_path.is_absolute()
            || entry_path
                .components()
                .any(|c| matches!(c, Component::ParentDir));
        if unsafe_entry {
            return Err(ArchiveError::UnsafeEntry {
                entry: entry_path.display().to_string(),
            });
        }

        let stripped: PathBuf = entry_path.components().skip(strip_components).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }
        let dest_path = dest.join(&stripped);

        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| write_error(&dest_path, e))?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        entry
            .unpack(&dest_path)
            .map_err(|e| write_error(&dest_path, e))?;
    }

    Ok(())
}
