pub mod checkout;
pub mod daemon;
pub mod service;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use moldsync_core::config::DEFAULT_ENV_FILE;

/// `--env-file`, shared by every command that reads configuration.
#[derive(Args, Debug, Clone)]
pub struct EnvFileArg {
    /// Environment file with the database URLs and `SYNC_DATA_INTERVAL`.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}

impl EnvFileArg {
    /// Absolute path, so a supervisor or a later `chdir` sees the same file.
    pub fn absolute(&self) -> Result<PathBuf> {
        if self.env_file.is_absolute() {
            return Ok(self.env_file.clone());
        }
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        Ok(cwd.join(&self.env_file))
    }
}

/// Single-threaded runtime for one-shot async commands.
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
