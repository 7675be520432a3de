//! l4t-provision - Jetson L4T board-support package provisioning.
//!
//! Fetches the L4T release tarball, unpacks it, and reorganizes the driver
//! payload into the Debian packaging repository:
//! - download is skipped when the tarball is already present
//! - extraction is skipped when `<l4t-dir>/bsp` already exists
//! - the driver package is always re-extracted and moved to merged-usr layout
//!
//! The fetch, extract and move capabilities sit behind traits so the
//! pipeline's ordering can be tested against fixtures.

pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod reorganize;
pub mod target;
pub mod timing;

pub use config::{CliPaths, ProvisioningConfig};
pub use download::{Fetcher, HttpFetcher};
pub use error::{ConfigError, ExtractError, FetchError, MoveError, PipelineError};
pub use extract::{Compression, DirectoryExtractor, Extractor, TarCommand};
pub use pipeline::{Pipeline, ProvisionReport, Stage};
pub use reorganize::{FsMover, TreeMover};
pub use target::BuildTarget;
