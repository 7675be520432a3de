//! Configuration for a provisioning run.
//!
//! Built once from the command-line paths plus a probe of the tarball, then
//! passed by reference to every pipeline stage. There are no environment
//! variables and no configuration file; all state lives on the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

/// Default BSP root, relative to the working directory.
pub const DEFAULT_L4T_DIR: &str = "nvidia-bin-release";

/// Default tarball file name inside the BSP root.
pub const DEFAULT_TARBALL_NAME: &str = "l4t.tbz2";

/// Extraction target, relative to the BSP root.
pub const EXTRACT_SUBDIR: &str = "bsp";

/// What the startup probe found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Missing,
    Directory,
    /// Anything that exists and is not a directory.
    File,
}

impl PathKind {
    pub fn probe(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::File,
            Err(_) => PathKind::Missing,
        }
    }
}

/// Paths as given on the command line. Unset fields take the defaults.
#[derive(Debug, Clone, Default)]
pub struct CliPaths {
    pub l4t_dir: Option<PathBuf>,
    pub tarball: Option<PathBuf>,
    pub repo_dir: Option<PathBuf>,
}

impl CliPaths {
    /// Fill unset paths relative to `cwd`.
    ///
    /// The tarball default is always `<cwd>/nvidia-bin-release/l4t.tbz2`,
    /// even when `--l4t-dir` points elsewhere.
    pub fn resolve(self, cwd: &Path) -> ProvisioningConfig {
        let l4t_dir = self
            .l4t_dir
            .unwrap_or_else(|| cwd.join(DEFAULT_L4T_DIR));
        let tarball = self
            .tarball
            .unwrap_or_else(|| cwd.join(DEFAULT_L4T_DIR).join(DEFAULT_TARBALL_NAME));
        let repo_dir = self.repo_dir.unwrap_or_else(|| cwd.to_path_buf());

        ProvisioningConfig::from_paths(l4t_dir, tarball, repo_dir)
    }
}

/// Immutable configuration of one run.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    bsp_dir: PathBuf,
    extract_dir: PathBuf,
    tarball: PathBuf,
    repo_dir: PathBuf,
    tarball_kind: PathKind,
}

impl ProvisioningConfig {
    /// Build the configuration and probe the tarball once.
    pub fn from_paths(
        bsp_dir: impl Into<PathBuf>,
        tarball: impl Into<PathBuf>,
        repo_dir: impl Into<PathBuf>,
    ) -> Self {
        let bsp_dir = bsp_dir.into();
        let tarball = tarball.into();
        let extract_dir = bsp_dir.join(EXTRACT_SUBDIR);
        let tarball_kind = PathKind::probe(&tarball);

        log::debug!("tarball {} probed as {:?}", tarball.display(), tarball_kind);

        Self {
            bsp_dir,
            extract_dir,
            tarball,
            repo_dir: repo_dir.into(),
            tarball_kind,
        }
    }

    pub fn bsp_dir(&self) -> &Path {
        &self.bsp_dir
    }

    /// Always `<bsp_dir>/bsp`.
    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    pub fn tarball(&self) -> &Path {
        &self.tarball
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Result of the startup probe of the tarball path.
    pub fn tarball_kind(&self) -> PathKind {
        self.tarball_kind
    }

    /// True iff the tarball already existed as a file at startup.
    pub fn skip_download(&self) -> bool {
        self.tarball_kind == PathKind::File
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("INFO: Configuration:");
        println!("INFO:   L4T directory: {}", self.bsp_dir.display());
        println!("INFO:   Extract directory: {}", self.extract_dir.display());
        println!("INFO:   Tarball: {}", self.tarball.display());
        println!("INFO:   Repository: {}", self.repo_dir.display());
        if self.skip_download() {
            println!("INFO:   Tarball: FOUND (download will be skipped)");
        } else {
            println!("INFO:   Tarball: NOT FOUND (will be downloaded)");
        }
    }
}
