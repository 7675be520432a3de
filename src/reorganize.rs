//! Subtree relocation inside the driver package.
//!
//! The root filesystem bootstrapper refuses a package tree with a bare
//! top-level `lib`, so firmware is moved under `usr/lib` and `lib` removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::MoveError;

/// Moves and removes directory subtrees.
pub trait TreeMover {
    /// Relocate `src` with `mv` semantics: into `dest` when `dest` is an
    /// existing directory, otherwise renamed to `dest`.
    fn move_tree(&self, src: &Path, dest: &Path) -> Result<(), MoveError>;

    /// Remove a file, symlink or empty directory.
    fn remove_empty_or_path(&self, path: &Path) -> Result<(), MoveError>;
}

/// [`TreeMover`] on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl FsMover {
    /// Where `move_tree(src, dest)` puts the tree.
    pub fn resolve_target(src: &Path, dest: &Path) -> Result<PathBuf, MoveError> {
        if dest.is_dir() {
            let name = src
                .file_name()
                .ok_or_else(|| MoveError::Other(format!("{} has no file name", src.display())))?;
            return Ok(dest.join(name));
        }

        match dest.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {
                Ok(dest.to_path_buf())
            }
            _ => Err(MoveError::Other(format!(
                "parent directory of {} does not exist",
                dest.display()
            ))),
        }
    }
}

impl TreeMover for FsMover {
    fn move_tree(&self, src: &Path, dest: &Path) -> Result<(), MoveError> {
        if fs::symlink_metadata(src).is_err() {
            return Err(MoveError::SourceMissing(src.to_path_buf()));
        }

        let target = Self::resolve_target(src, dest)?;
        if fs::symlink_metadata(&target).is_ok() {
            return Err(MoveError::DestinationConflict(target));
        }

        log::debug!("moving {} -> {}", src.display(), target.display());
        match fs::rename(src, &target) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => copy_then_remove(src, &target),
            Err(e) => Err(MoveError::Other(format!(
                "{} -> {}: {e}",
                src.display(),
                target.display()
            ))),
        }
    }

    fn remove_empty_or_path(&self, path: &Path) -> Result<(), MoveError> {
        let meta = fs::symlink_metadata(path)
            .map_err(|_| MoveError::SourceMissing(path.to_path_buf()))?;

        let result = if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| MoveError::Other(format!("{}: {e}", path.display())))
    }
}

/// `EXDEV` on Linux.
const EXDEV: i32 = 18;

fn is_cross_device(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(EXDEV)
}

/// Cross-device half of `move_tree`.
fn copy_then_remove(src: &Path, target: &Path) -> Result<(), MoveError> {
    log::debug!("{} is on another device, copying", target.display());
    copy_tree(src, target).map_err(|e| {
        MoveError::Other(format!("copying {} to {}: {e}", src.display(), target.display()))
    })?;
    remove_any(src).map_err(|e| MoveError::Other(format!("removing {}: {e}", src.display())))
}

fn remove_any(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Copy a tree preserving symlinks and file modes.
///
/// Directory modes are applied after their contents are written, deepest
/// first, so read-only source directories copy cleanly.
fn copy_tree(src: &Path, target: &Path) -> io::Result<()> {
    let mut dir_modes = Vec::new();

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let dst = if rel.as_os_str().is_empty() {
            target.to_path_buf()
        } else {
            target.join(rel)
        };
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dst)?;
            let perms = entry.metadata().map_err(io::Error::other)?.permissions();
            dir_modes.push((dst, perms));
        } else if file_type.is_symlink() {
            std::os::unix::fs::symlink(fs::read_link(entry.path())?, &dst)?;
        } else {
            fs::copy(entry.path(), &dst)?;
        }
    }

    for (dir, perms) in dir_modes.into_iter().rev() {
        fs::set_permissions(&dir, perms)?;
    }
    Ok(())
}
