//! `moldsync checkout`: bind a machine code to a mold.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use moldsync_core::config::load_source_url;
use moldsync_sync::{assign_machine_code, pipeline};

use super::{block_on, EnvFileArg};

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Mold serial to receive the machine code.
    #[arg(long)]
    pub serial: String,

    /// Location name written as the machine code.
    #[arg(long)]
    pub location: String,

    #[command(flatten)]
    pub env: EnvFileArg,
}

impl CheckoutArgs {
    pub fn run(self) -> Result<()> {
        moldsync_daemon::init_tracing();
        let source_url =
            load_source_url(&self.env.absolute()?).context("failed to load source settings")?;

        let assignment = block_on(async {
            let source = pipeline::connect_source(&source_url).await?;
            let result = assign_machine_code(&source, &self.serial, &self.location).await;
            source.close().await;
            result
        })?
        .with_context(|| format!("checkout failed for '{}'", self.serial.trim()))?;

        if assignment.assigned == 0 {
            println!(
                "{} no mold with serial '{}'; {} previous binding(s) cleared",
                "!".yellow(),
                self.serial.trim(),
                assignment.cleared
            );
        } else {
            println!(
                "{} '{}' now at '{}' ({} previous binding(s) cleared)",
                "✓".green(),
                self.serial.trim(),
                self.location.trim(),
                assignment.cleared
            );
        }
        Ok(())
    }
}
