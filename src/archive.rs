//! Unpacking of downloaded tool bundles.
//!
//! The platform decides the archive kind the installer asks for: zip on
//! Windows, tar+xz with the leading path component stripped elsewhere. The
//! extractor sniffs the file's magic bytes first and lets them win, because
//! the SQLite site publishes `.zip` bundles for every platform.
//!
//! Entries that would land outside the destination (absolute paths, `..`)
//! are rejected, as are links whose target leaves it and entries written
//! through a link the archive created earlier. On Unix, executable bits
//! recorded in the archive are kept.
//!
//! # Examples
//!
//! ```rust,no_run
//! use setup_sqlite::archive::{ArchiveExtractor, ArchiveKind, Extractor};
//! use setup_sqlite::utils::platform::Platform;
//! use std::path::Path;
//!
//! # fn example() -> setup_sqlite::core::Result<()> {
//! let kind = ArchiveKind::for_platform(Platform::Linux);
//! let dir = ArchiveExtractor.extract(Path::new("/tmp/bundle.zip"), kind, Path::new("/tmp/out"))?;
//! println!("unpacked into {}", dir.display());
//! # Ok(())
//! # }
//! ```

use crate::core::{Result, SetupError};
use crate::utils::platform::Platform;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const XZ_MAGIC: &[u8] = &[0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Zip archive, unpacked as-is
    Zip,
    /// Tar stream compressed with xz, first path component stripped
    TarXz,
}

impl ArchiveKind {
    /// The kind requested for a platform's bundles.
    #[must_use]
    pub const fn for_platform(platform: Platform) -> Self {
        if platform.is_windows() { Self::Zip } else { Self::TarXz }
    }

    /// Detect the kind from the first bytes of `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read.
    pub fn sniff(path: &Path) -> io::Result<Option<Self>> {
        let mut header = [0u8; 6];
        let mut file = File::open(path)?;
        let read = file.read(&mut header)?;
        let header = &header[..read];
        if header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
            Ok(Some(Self::Zip))
        } else if header.starts_with(XZ_MAGIC) {
            Ok(Some(Self::TarXz))
        } else {
            Ok(None)
        }
    }

    const fn strip_components(self) -> usize {
        match self {
            Self::Zip => 0,
            Self::TarXz => 1,
        }
    }
}

/// Archive extraction collaborator used by the installer.
pub trait Extractor: Send + Sync {
    /// Unpack `archive` into the (fresh) directory `destination` and return
    /// the directory holding the unpacked tree.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ExtractFailed`] on any failure.
    fn extract(&self, archive: &Path, kind: ArchiveKind, destination: &Path) -> Result<PathBuf>;
}

/// Extractor for zip and tar+xz bundles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, kind: ArchiveKind, destination: &Path) -> Result<PathBuf> {
        let failed = |reason: String| SetupError::ExtractFailed {
            path: archive.display().to_string(),
            reason,
        };

        let detected = ArchiveKind::sniff(archive).map_err(|e| failed(e.to_string()))?;
        let kind = match detected {
            Some(detected) if detected != kind => {
                debug!(requested = ?kind, detected = ?detected, "Archive format differs from platform default");
                detected
            }
            Some(detected) => detected,
            None => return Err(failed("unrecognized archive format".to_string())),
        };

        std::fs::create_dir_all(destination).map_err(|e| failed(e.to_string()))?;
        let entries = match kind {
            ArchiveKind::Zip => extract_zip(archive, destination, kind.strip_components()),
            ArchiveKind::TarXz => extract_tar_xz(archive, destination, kind.strip_components()),
        }
        .map_err(|e| failed(e.to_string()))?;

        debug!(archive = %archive.display(), destination = %destination.display(), entries, "Extracted archive");
        Ok(destination.to_path_buf())
    }
}

fn extract_zip(archive: &Path, destination: &Path, strip: usize) -> io::Result<usize> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?).map_err(io::Error::other)?;
    let mut count = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(io::Error::other)?;
        let raw = entry
            .enclosed_name()
            .ok_or_else(|| unsafe_entry(entry.name()))?;
        let Some(target) = target_path(destination, &raw, strip)? else {
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            set_mode(&target, entry.unix_mode())?;
        }
        count += 1;
    }
    Ok(count)
}

fn extract_tar_xz(archive: &Path, destination: &Path, strip: usize) -> io::Result<usize> {
    let decoder = xz2::read::XzDecoder::new(File::open(archive)?);
    let mut tar = tar::Archive::new(decoder);
    let mut count = 0;
    for entry in tar.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.into_owned();
        let Some(target) = target_path(destination, &raw, strip)? else {
            continue;
        };
        reject_linked_ancestors(destination, &target)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let link = entry
                .link_name()?
                .map(|p| p.into_owned())
                .ok_or_else(|| unsafe_entry(&raw.display().to_string()))?;
            if entry_type.is_hard_link() {
                // Hard link names are archive paths, not paths relative to the link
                let source = target_path(destination, &link, strip)?
                    .ok_or_else(|| unsafe_entry(&link.display().to_string()))?;
                reject_linked_ancestors(destination, &source)?;
                std::fs::hard_link(&source, &target)?;
                count += 1;
                continue;
            }
            if !symlink_stays_inside(destination, &target, &link) {
                return Err(unsafe_entry(&format!("{} -> {}", raw.display(), link.display())));
            }
        }

        entry.unpack(&target)?;
        count += 1;
    }
    Ok(count)
}

/// Fail when any existing path between `destination` and `target` (inclusive)
/// is a symlink, so nothing is written through a link.
fn reject_linked_ancestors(destination: &Path, target: &Path) -> io::Result<()> {
    let Ok(relative) = target.strip_prefix(destination) else {
        return Err(unsafe_entry(&target.display().to_string()));
    };
    let mut current = destination.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(unsafe_entry(&relative.display().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Whether a symlink placed at `link_path` and pointing at `link_target`
/// resolves (lexically) to a location inside `destination`.
fn symlink_stays_inside(destination: &Path, link_path: &Path, link_target: &Path) -> bool {
    let Some(parent) = link_path.parent().and_then(|p| p.strip_prefix(destination).ok()) else {
        return false;
    };
    let mut depth = parent.components().count();
    for component in link_target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Resolve an entry path below `destination` after dropping `strip` leading
/// components. `None` means nothing is left after stripping.
fn target_path(destination: &Path, raw: &Path, strip: usize) -> io::Result<Option<PathBuf>> {
    let mut relative = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(unsafe_entry(&raw.display().to_string())),
        }
    }

    let stripped: PathBuf = relative.components().skip(strip).collect();
    if stripped.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(destination.join(stripped)))
}

fn unsafe_entry(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("entry '{name}' escapes the destination"))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
