//! Release artifact descriptor.
//!
//! The L4T release this tool provisions is fixed at compile time. Tests and
//! mirrors can override the URL (and attach a checksum) through the builder
//! methods.

use std::path::{Path, PathBuf};

/// L4T release version shipped by this build.
pub const L4T_VERSION: &str = "32.7.4";

/// Upstream download location of the BSP tarball.
pub const BSP_DOWNLOAD_URL: &str = "https://developer.nvidia.com/downloads/embedded/l4t/r32_release_v7.4/t210/jetson-210_linux_r32.7.4_aarch64.tbz2";

/// SoC family the binary packages are built for.
pub const DEFAULT_SOC: &str = "t210";

/// Driver archive inside the extracted BSP.
const DRIVER_ARCHIVE: &str = "nv_tegra/nvidia_drivers.tbz2";

/// Debian package directory receiving the drivers.
const DRIVER_PACKAGE: &str = "nv-l4t-drivers";

/// A single release artifact and where its pieces land in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub version: String,
    pub url: String,
    pub soc: String,
    /// Expected sha256 of the tarball. `None` trusts the download as-is.
    pub sha256: Option<String>,
}

impl BuildTarget {
    /// The compiled-in Jetson TX1/Nano release.
    pub fn r32_7_4_t210() -> Self {
        Self {
            version: L4T_VERSION.to_string(),
            url: BSP_DOWNLOAD_URL.to_string(),
            soc: DEFAULT_SOC.to_string(),
            sha256: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }

    /// `<repo>/Binary/<soc>`
    pub fn binary_dir(&self, repo_dir: &Path) -> PathBuf {
        repo_dir.join("Binary").join(&self.soc)
    }

    /// `<repo>/Binary/<soc>/nv-l4t-drivers`
    pub fn driver_package_dir(&self, repo_dir: &Path) -> PathBuf {
        self.binary_dir(repo_dir).join(DRIVER_PACKAGE)
    }

    /// `<extract_dir>/nv_tegra/nvidia_drivers.tbz2`
    pub fn driver_archive(&self, extract_dir: &Path) -> PathBuf {
        extract_dir.join(DRIVER_ARCHIVE)
    }
}

impl Default for BuildTarget {
    fn default() -> Self {
        Self::r32_7_4_t210()
    }
}
