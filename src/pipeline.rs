//! The provisioning pipeline.
//!
//! ```text
//! Start -> CheckTarball -> Preflight -> {Download | SkipDownload}
//!       -> CheckExtractDir -> {Extract | SkipExtract} -> PrepareRepo -> Done
//! ```
//!
//! Any stage may end in `Failed`. Idempotence comes from probing the
//! filesystem: an existing tarball skips the download and an existing
//! extraction directory skips extraction, with no content verification.
//! PrepareRepo has no such probe and always re-extracts the drivers, so a
//! second run over an already reorganized driver package fails at the move
//! or removal step instead of silently succeeding.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{PathKind, ProvisioningConfig};
use crate::download::{self, Fetcher};
use crate::error::{ConfigError, PipelineError};
use crate::extract::{Compression, Extractor};
use crate::preflight;
use crate::reorganize::TreeMover;
use crate::target::BuildTarget;
use crate::timing::Timer;

/// Leading path segments dropped from the BSP tarball (`Linux_for_Tegra/`).
pub const BSP_STRIP_COMPONENTS: usize = 1;

/// The driver archive is unpacked as-is.
pub const DRIVER_STRIP_COMPONENTS: usize = 0;

/// States of the pipeline, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    CheckTarball,
    Preflight,
    Download,
    SkipDownload,
    CheckExtractDir,
    Extract,
    SkipExtract,
    PrepareRepo,
    Done,
    Failed,
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub stages: Vec<Stage>,
    pub downloaded: bool,
    pub extracted: bool,
    /// Driver package directory that was populated.
    pub driver_dir: PathBuf,
}

/// Orchestrates fetch, extract and reorganize for one release.
pub struct Pipeline<'a> {
    config: &'a ProvisioningConfig,
    target: &'a BuildTarget,
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn Extractor,
    mover: &'a dyn TreeMover,
    preflight: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a ProvisioningConfig,
        target: &'a BuildTarget,
        fetcher: &'a dyn Fetcher,
        extractor: &'a dyn Extractor,
        mover: &'a dyn TreeMover,
    ) -> Self {
        Self {
            config,
            target,
            fetcher,
            extractor,
            mover,
            preflight: true,
        }
    }

    /// Enable or disable the host tool checks (on by default).
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    /// Run every stage and report what happened.
    pub fn run(&self) -> Result<ProvisionReport, PipelineError> {
        let mut stages = Vec::new();
        let outcome = self.run_traced(&mut stages)?;
        Ok(ProvisionReport {
            stages,
            downloaded: outcome.downloaded,
            extracted: outcome.extracted,
            driver_dir: self.target.driver_package_dir(self.config.repo_dir()),
        })
    }

    /// Run every stage, appending each entered stage to `trace`.
    ///
    /// On failure the trace ends with [`Stage::Failed`].
    pub fn run_traced(&self, trace: &mut Vec<Stage>) -> Result<Outcome, PipelineError> {
        let result = self.run_stages(trace);
        if result.is_err() {
            trace.push(Stage::Failed);
        }
        result
    }

    fn run_stages(&self, trace: &mut Vec<Stage>) -> Result<Outcome, PipelineError> {
        let mut outcome = Outcome::default();
        trace.push(Stage::Start);

        trace.push(Stage::CheckTarball);
        let needs_download = self.check_tarball()?;

        if self.preflight {
            trace.push(Stage::Preflight);
            self.check_preflight()?;
        }

        if needs_download {
            trace.push(Stage::Download);
            self.download()?;
            outcome.downloaded = true;
        } else {
            trace.push(Stage::SkipDownload);
        }

        trace.push(Stage::CheckExtractDir);
        if self.check_extract_dir()? {
            trace.push(Stage::Extract);
            self.extract()?;
            outcome.extracted = true;
        } else {
            trace.push(Stage::SkipExtract);
            println!(
                "INFO: {} already exists, skipping extraction",
                self.config.extract_dir().display()
            );
        }

        trace.push(Stage::PrepareRepo);
        self.prepare_repositories()?;

        trace.push(Stage::Done);
        println!("INFO: Done. You can now build the debian packages with 'dpkg-deb --build <package>'");
        Ok(outcome)
    }

    /// True when the tarball must be downloaded.
    fn check_tarball(&self) -> Result<bool, PipelineError> {
        match self.config.tarball_kind() {
            PathKind::Directory => {
                Err(ConfigError::TarballIsDirectory(self.config.tarball().to_path_buf()).into())
            }
            PathKind::File => {
                log::debug!("tarball present at {}", self.config.tarball().display());
                Ok(false)
            }
            PathKind::Missing => Ok(true),
        }
    }

    fn check_preflight(&self) -> Result<(), PipelineError> {
        let report =
            preflight::run_preflight(self.extractor.required_tools(), self.config.repo_dir());
        report.print();
        if !report.all_passed() {
            return Err(PipelineError::Preflight(format!(
                "{} check(s) failed: {}",
                report.fail_count(),
                report.failed_names()
            )));
        }
        Ok(())
    }

    fn download(&self) -> Result<(), PipelineError> {
        println!("INFO: Downloading L4T Version {}", self.target.version);
        let timer = Timer::start("Download");

        let tarball = self.config.tarball();
        if let Some(parent) = tarball.parent() {
            create_dir(parent)?;
        }

        self.fetcher
            .fetch(tarball, &self.target.url)
            .map_err(PipelineError::Fetch)?;

        if let Some(expected) = &self.target.sha256 {
            download::verify_checksum(tarball, expected).map_err(PipelineError::Fetch)?;
        }

        timer.finish();
        Ok(())
    }

    /// True when extraction must run.
    fn check_extract_dir(&self) -> Result<bool, PipelineError> {
        let extract_dir = self.config.extract_dir();
        match PathKind::probe(extract_dir) {
            PathKind::Directory => Ok(false),
            PathKind::File => {
                Err(ConfigError::ExtractDirNotDirectory(extract_dir.to_path_buf()).into())
            }
            PathKind::Missing => Ok(true),
        }
    }

    fn extract(&self) -> Result<(), PipelineError> {
        println!("INFO: Extracting L4T Version {}", self.target.version);
        let timer = Timer::start("Extract");

        let extract_dir = self.config.extract_dir();
        create_dir(extract_dir)?;
        self.extractor
            .extract(
                self.config.tarball(),
                extract_dir,
                archive_compression(self.config.tarball()),
                BSP_STRIP_COMPONENTS,
            )
            .map_err(PipelineError::Extract)?;

        timer.finish();
        Ok(())
    }

    fn prepare_repositories(&self) -> Result<(), PipelineError> {
        println!(
            "INFO: Preparing Repositories for L4T Version {}",
            self.target.version
        );
        let timer = Timer::start("Prepare repositories");

        let driver_dir = self.target.driver_package_dir(self.config.repo_dir());
        let driver_archive = self.target.driver_archive(self.config.extract_dir());

        println!("INFO: Extracting drivers to {}", driver_dir.display());
        create_dir(&driver_dir)?;
        self.extractor
            .extract(
                &driver_archive,
                &driver_dir,
                archive_compression(&driver_archive),
                DRIVER_STRIP_COMPONENTS,
            )
            .map_err(PipelineError::ExtractDrivers)?;

        // Merged-usr: lib/firmware goes under usr/lib, then the bare lib goes.
        self.mover
            .move_tree(&driver_dir.join("lib/firmware"), &driver_dir.join("usr/lib"))
            .map_err(PipelineError::MoveFirmware)?;
        self.mover
            .remove_empty_or_path(&driver_dir.join("lib"))
            .map_err(PipelineError::RemoveLib)?;

        timer.finish();
        Ok(())
    }
}

/// Flags collected while the stages run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub downloaded: bool,
    pub extracted: bool,
}

/// Scheme named by the archive's suffix. Unrecognised names are taken to be
/// bzip2, the format NVIDIA ships.
fn archive_compression(archive: &Path) -> Compression {
    Compression::from_path(archive).unwrap_or(Compression::Bzip2)
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path).map_err(|source| PipelineError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
