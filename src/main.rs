//! l4t-provision - prepares the L4T BSP for Debian packaging.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use l4t_provision::{
    BuildTarget, CliPaths, FsMover, HttpFetcher, Pipeline, TarCommand,
};

#[derive(Parser)]
#[command(name = "l4t-provision")]
#[command(about = "Download and unpack the Jetson L4T BSP into the packaging repository")]
#[command(
    after_help = "After a successful run, build the packages with:\n  dpkg-deb --build <package>"
)]
struct Cli {
    /// L4T directory for binary package extraction [default: ./nvidia-bin-release]
    #[arg(long = "l4t-dir", value_name = "DIR")]
    l4t_dir: Option<PathBuf>,

    /// L4T tarball to extract, downloaded if absent [default: ./nvidia-bin-release/l4t.tbz2]
    #[arg(long, value_name = "FILE")]
    tarball: Option<PathBuf>,

    /// The repository directory [default: .]
    #[arg(long = "repo-dir", value_name = "DIR")]
    repo_dir: Option<PathBuf>,

    /// Verify the downloaded tarball against this SHA256
    #[arg(long, value_name = "HEX")]
    sha256: Option<String>,

    /// Skip the host tool checks
    #[arg(long)]
    skip_preflight: bool,
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;

    let config = CliPaths {
        l4t_dir: cli.l4t_dir,
        tarball: cli.tarball,
        repo_dir: cli.repo_dir,
    }
    .resolve(&cwd);

    let mut target = BuildTarget::default();
    if let Some(sha256) = cli.sha256 {
        target = target.with_sha256(sha256);
    }

    if log::log_enabled!(log::Level::Debug) {
        config.print();
    }

    let fetcher = HttpFetcher::new()?;
    Pipeline::new(&config, &target, &fetcher, &TarCommand, &FsMover)
        .with_preflight(!cli.skip_preflight)
        .run()?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
