//! Shared test utilities for l4t-provision tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tempfile::TempDir;

use l4t_provision::error::{ExtractError, FetchError};
use l4t_provision::extract::{Compression, DirectoryExtractor, Extractor};
use l4t_provision::process::{self, Cmd};
use l4t_provision::{Fetcher, HttpFetcher, ProvisioningConfig};

/// Top-level directory of the vendor tarball.
pub const WRAPPER: &str = "Linux_for_Tegra";

/// Firmware files shipped in the driver payload under `lib/firmware`.
pub const FIRMWARE_FILES: &[(&str, &str)] = &[
    ("tegra21x_xusb_firmware", "xusb"),
    ("brcm/brcmfmac4356-pcie.txt", "brcm nvram"),
    ("gm20b/acr_ucode.bin", "acr"),
];

/// Temporary working directory laid out like a packaging checkout.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Scratch space for fixtures
    pub fixtures: PathBuf,
    /// `--l4t-dir`
    pub l4t_dir: PathBuf,
    /// `--tarball`
    pub tarball: PathBuf,
    /// `--repo-dir`
    pub repo_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let fixtures = base.join("fixtures");
        let l4t_dir = base.join("nvidia-bin-release");
        let tarball = l4t_dir.join("l4t.tbz2");
        let repo_dir = base.join("repo");

        fs::create_dir_all(&fixtures).expect("Failed to create fixtures dir");
        fs::create_dir_all(&repo_dir).expect("Failed to create repo dir");

        Self {
            _temp_dir: temp_dir,
            fixtures,
            l4t_dir,
            tarball,
            repo_dir,
        }
    }

    /// Configuration as the CLI would build it right now.
    pub fn config(&self) -> ProvisioningConfig {
        ProvisioningConfig::from_paths(&self.l4t_dir, &self.tarball, &self.repo_dir)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.l4t_dir.join("bsp")
    }

    pub fn driver_dir(&self) -> PathBuf {
        self.repo_dir.join("Binary/t210/nv-l4t-drivers")
    }

    /// Place a dummy tarball so the download is skipped.
    pub fn place_tarball(&self) {
        write_file(&self.tarball, "tarball");
    }
}

/// Write a file, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

/// Driver payload as found in `nvidia_drivers.tbz2`.
pub fn create_driver_tree(root: &Path) {
    for (name, content) in FIRMWARE_FILES {
        write_file(&root.join("lib/firmware").join(name), content);
    }
    write_file(
        &root.join("usr/lib/aarch64-linux-gnu/tegra/libnvos.so"),
        "libnvos",
    );
    write_file(&root.join("etc/nv_tegra_release"), "# R32 (release), REVISION: 7.4");

    let bin = root.join("usr/sbin/nvargus-daemon");
    write_file(&bin, "#!/bin/sh\n");
    let mut perms = fs::metadata(&bin).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&bin, perms).unwrap();
}

/// Unpacked BSP with its wrapper directory. The driver archive is a
/// placeholder file; fixture extractors map it to a driver tree.
pub fn create_bsp_tree(root: &Path) {
    let wrapper = root.join(WRAPPER);
    write_file(&wrapper.join("nv_tegra/nvidia_drivers.tbz2"), "placeholder");
    write_file(&wrapper.join("flash.sh"), "#!/bin/sh\n");
    write_file(&wrapper.join("bootloader/t210ref/cboot.bin"), "cboot");
}

/// Assert every firmware file sits under `<driver_dir>/usr/lib/firmware`
/// with its original content.
pub fn assert_firmware_contents(driver_dir: &Path) {
    for (name, content) in FIRMWARE_FILES {
        let path = driver_dir.join("usr/lib/firmware").join(name);
        let actual = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Expected firmware file: {}", path.display()));
        assert_eq!(&actual, content, "content of {}", path.display());
    }
}

/// Firmware relocated and the bare `lib` directory gone.
pub fn assert_firmware_relocated(driver_dir: &Path) {
    assert_firmware_contents(driver_dir);
    assert!(
        fs::symlink_metadata(driver_dir.join("lib")).is_err(),
        "Expected {} to be absent",
        driver_dir.join("lib").display()
    );
}

/// True when the host can build and unpack bzip2 tarballs.
pub fn host_has_tar() -> bool {
    process::exists("tar") && process::exists("bzip2")
}

/// Pack `src_dir` as `<top>/...` into a bzip2 tarball at `out`.
pub fn make_tbz2(src_dir: &Path, out: &Path) {
    let parent = src_dir.parent().expect("fixture has a parent");
    let name = src_dir.file_name().expect("fixture has a name");
    Cmd::new("tar")
        .arg("-cjf")
        .arg_path(out)
        .arg("-C")
        .arg_path(parent)
        .arg(name.to_string_lossy())
        .run()
        .expect("Failed to create tarball");
}

/// Pack the contents of `src_dir` (no top-level directory) into `out`.
pub fn make_flat_tbz2(src_dir: &Path, out: &Path) {
    Cmd::new("tar")
        .arg("-cjf")
        .arg_path(out)
        .arg("-C")
        .arg_path(src_dir)
        .arg(".")
        .run()
        .expect("Failed to create tarball");
}

// =============================================================================
// Test doubles
// =============================================================================

/// Fetcher that writes a fixed body and records every call.
#[derive(Default)]
pub struct RecordingFetcher {
    pub calls: RefCell<Vec<(PathBuf, String)>>,
    pub fail_with_status: Option<u16>,
}

impl RecordingFetcher {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Fetcher for RecordingFetcher {
    fn fetch(&self, dest: &Path, url: &str) -> Result<(), FetchError> {
        self.calls
            .borrow_mut()
            .push((dest.to_path_buf(), url.to_string()));
        let file = fs::File::create(dest).map_err(|source| FetchError::LocalIo {
            path: dest.to_path_buf(),
            source,
        })?;
        if let Some(code) = self.fail_with_status {
            return Err(FetchError::BadStatus(code, "Not Found".into()));
        }
        drop(file);
        fs::write(dest, "downloaded").unwrap();
        Ok(())
    }
}

/// Extractor that resolves archive paths to fixture directories and
/// delegates to [`DirectoryExtractor`], recording every call.
#[derive(Default)]
pub struct FixtureExtractor {
    pub archives: HashMap<PathBuf, PathBuf>,
    pub calls: RefCell<Vec<(PathBuf, PathBuf, usize)>>,
}

impl FixtureExtractor {
    pub fn with(mut self, archive: &Path, fixture_dir: &Path) -> Self {
        self.archives
            .insert(archive.to_path_buf(), fixture_dir.to_path_buf());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Extractor for FixtureExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        compression: Compression,
        strip_components: usize,
    ) -> Result<(), ExtractError> {
        self.calls.borrow_mut().push((
            archive.to_path_buf(),
            dest.to_path_buf(),
            strip_components,
        ));
        let fixture = self
            .archives
            .get(archive)
            .ok_or_else(|| ExtractError::ArchiveMissing(archive.to_path_buf()))?;
        DirectoryExtractor.extract(fixture, dest, compression, strip_components)
    }
}

/// Wire a [`FixtureExtractor`] for `env`: the BSP tarball maps to a wrapped
/// BSP tree and the driver archive maps to a driver tree.
pub fn fixture_extractor(env: &TestEnv) -> FixtureExtractor {
    let bsp = env.fixtures.join("bsp-unpacked");
    let drivers = env.fixtures.join("drivers-unpacked");
    create_bsp_tree(&bsp);
    create_driver_tree(&drivers);

    FixtureExtractor::default()
        .with(&env.tarball, &bsp)
        .with(&env.extract_dir().join("nv_tegra/nvidia_drivers.tbz2"), &drivers)
}

// =============================================================================
// One-shot HTTP server
// =============================================================================

/// HTTP fetcher that ignores proxy settings from the environment.
pub fn direct_fetcher() -> HttpFetcher {
    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build client");
    HttpFetcher::with_client(client)
}

/// Serve a single HTTP response on a loopback port. Returns the URL.
pub fn serve_once(status_line: &str, body: &[u8]) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).expect("Failed to read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(&response).expect("Failed to write response");
    });

    (format!("http://{}/l4t.tbz2", addr), handle)
}
