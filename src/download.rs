//! Download of the BSP release tarball.
//!
//! A single blocking GET streamed into the destination file. No retries, no
//! timeout, no resume. A failed download leaves its partial output on disk.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::FetchError;

/// Retrieves a remote artifact into a local path.
pub trait Fetcher {
    fn fetch(&self, dest: &Path, url: &str) -> Result<(), FetchError>;
}

/// HTTP(S) fetcher backed by a blocking reqwest client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("l4t-provision/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| FetchError::Request(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxy settings, TLS roots).
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, dest: &Path, url: &str) -> Result<(), FetchError> {
        // The file is created before the request so a local problem never
        // costs a network round trip.
        let file = File::create(dest).map_err(|source| FetchError::LocalIo {
            path: dest.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        log::debug!("GET {url}");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request(format!("{url}: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::BadStatus(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown").to_string(),
            ));
        }

        let written = io::copy(&mut response, &mut writer)
            .map_err(|e| FetchError::TransferFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| FetchError::TransferFailed(e.to_string()))?;

        log::debug!("wrote {} bytes to {}", written, dest.display());
        Ok(())
    }
}

/// Compute the sha256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify SHA256 checksum of a downloaded file.
///
/// On mismatch the file is deleted so the next run downloads it again.
pub fn verify_checksum(path: &Path, expected_sha256: &str) -> Result<(), FetchError> {
    println!("INFO: Verifying SHA256 checksum...");

    let actual = sha256_file(path).map_err(|source| FetchError::LocalIo {
        path: path.to_path_buf(),
        source,
    })?;

    if actual != expected_sha256.to_lowercase() {
        let _ = fs::remove_file(path);
        return Err(FetchError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected_sha256.to_string(),
            actual,
        });
    }

    println!("INFO: Checksum verified OK");
    Ok(())
}
