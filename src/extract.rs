//! Archive extraction.
//!
//! The BSP and the driver payload are bzip2-compressed tarballs. Decoding is
//! delegated to the host `tar`; [`DirectoryExtractor`] stands in for it when
//! the "archive" is an already unpacked fixture tree.
//!
//! Strip policy: an entry whose path has no components left after
//! `strip_components` leading segments are dropped is skipped, matching GNU
//! tar. Extraction is not transactional.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ExtractError;
use crate::process::Cmd;

/// Compression scheme of a tar archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Bzip2,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Guess the scheme from the file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let table: [(&[&str], Compression); 4] = [
            (&[".tbz2", ".tbz", ".tar.bz2"], Compression::Bzip2),
            (&[".tgz", ".tar.gz"], Compression::Gzip),
            (&[".txz", ".tar.xz"], Compression::Xz),
            (&[".tzst", ".tar.zst"], Compression::Zstd),
        ];
        table
            .iter()
            .find(|(suffixes, _)| suffixes.iter().any(|s| name.ends_with(s)))
            .map(|(_, compression)| *compression)
    }

    /// `tar` mode flags for this scheme. Only bzip2 is supported.
    pub fn tar_flags(self) -> Result<&'static str, ExtractError> {
        match self {
            Compression::Bzip2 => Ok("-xjpf"),
            other => Err(ExtractError::UnsupportedCompression(other.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
            Compression::Xz => "xz",
            Compression::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Unpacks an archive into an existing directory.
pub trait Extractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        compression: Compression,
        strip_components: usize,
    ) -> Result<(), ExtractError>;

    /// Host programs this extractor shells out to.
    fn required_tools(&self) -> &[&'static str] {
        &[]
    }
}

/// Checks shared by every extractor, run before anything is written.
fn check_inputs(archive: &Path, dest: &Path, compression: Compression) -> Result<(), ExtractError> {
    compression.tar_flags()?;
    if !archive.exists() {
        return Err(ExtractError::ArchiveMissing(archive.to_path_buf()));
    }
    if !dest.is_dir() {
        return Err(ExtractError::DestinationMissing(dest.to_path_buf()));
    }
    Ok(())
}

/// Extraction through the host `tar` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarCommand;

impl Extractor for TarCommand {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        compression: Compression,
        strip_components: usize,
    ) -> Result<(), ExtractError> {
        check_inputs(archive, dest, compression)?;
        let flags = compression.tar_flags()?;

        let mut cmd = Cmd::new("tar");
        if strip_components > 0 {
            cmd = cmd.args(["--strip-components".to_string(), strip_components.to_string()]);
        }
        cmd.arg(flags)
            .arg_path(archive)
            .arg("-C")
            .arg_path(dest)
            .error_msg(format!("tar failed to extract {}", archive.display()))
            .run()
            .map_err(|e| ExtractError::ExtractionFailed(format!("{e:#}")))?;

        Ok(())
    }

    fn required_tools(&self) -> &[&'static str] {
        &["tar", "bzip2"]
    }
}

/// Treats `archive` as an unpacked directory and copies it into `dest`.
///
/// Honours the same contract as [`TarCommand`]; useful for fixtures and for
/// BSP trees that were unpacked by other means.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryExtractor;

impl Extractor for DirectoryExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        compression: Compression,
        strip_components: usize,
    ) -> Result<(), ExtractError> {
        check_inputs(archive, dest, compression)?;
        if !archive.is_dir() {
            return Err(ExtractError::ExtractionFailed(format!(
                "{} is not an unpacked archive directory",
                archive.display()
            )));
        }

        for entry in WalkDir::new(archive).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;
            let rel = entry
                .path()
                .strip_prefix(archive)
                .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;

            let Some(stripped) = strip_path(rel, strip_components) else {
                continue;
            };
            let target = dest.join(stripped);
            copy_entry(&entry, &target)
                .map_err(|e| ExtractError::ExtractionFailed(format!("{}: {e}", target.display())))?;
        }

        Ok(())
    }
}

/// Drop `n` leading components. `None` when nothing is left.
pub fn strip_path(path: &Path, n: usize) -> Option<PathBuf> {
    let rest: PathBuf = path.components().skip(n).collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn copy_entry(entry: &walkdir::DirEntry, target: &Path) -> std::io::Result<()> {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return fs::create_dir_all(target);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if file_type.is_symlink() {
        let link = fs::read_link(entry.path())?;
        if fs::symlink_metadata(target).is_ok() {
            fs::remove_file(target)?;
        }
        std::os::unix::fs::symlink(link, target)?;
    } else {
        fs::copy(entry.path(), target)?;
    }
    Ok(())
}
