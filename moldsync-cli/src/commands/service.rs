//! `moldsync service`: supervisor units for `sync-data`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use moldsync_daemon::service::{
    generate_plist, generate_systemd_unit, install_launchd, install_systemd, uninstall_launchd,
    uninstall_systemd,
};
use moldsync_daemon::ServiceSpec;

use super::EnvFileArg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Manager {
    Systemd,
    Launchd,
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service manager to target.
    #[arg(value_enum)]
    pub manager: Manager,

    /// Write the unit and start it instead of printing it.
    #[arg(long, conflicts_with = "uninstall")]
    pub install: bool,

    /// Stop the service and remove its unit.
    #[arg(long)]
    pub uninstall: bool,

    /// Binary the unit runs (defaults to this executable).
    #[arg(long)]
    pub binary: Option<PathBuf>,

    #[command(flatten)]
    pub env: EnvFileArg,
}

impl ServiceArgs {
    pub fn run(self, root: PathBuf) -> Result<()> {
        if self.uninstall {
            let home = dirs::home_dir().context("could not determine home directory")?;
            match self.manager {
                Manager::Systemd => uninstall_systemd(&home),
                Manager::Launchd => uninstall_launchd(&home),
            }
            .context("failed to uninstall service")?;
            println!("uninstalled {:?} service", self.manager);
            return Ok(());
        }

        let binary = match self.binary.clone() {
            Some(binary) => binary,
            None => std::env::current_exe().context("could not resolve moldsync binary path")?,
        };
        let spec = ServiceSpec {
            binary,
            env_file: self.env.absolute()?,
            root,
        };

        if self.install {
            let home = dirs::home_dir().context("could not determine home directory")?;
            let path = match self.manager {
                Manager::Systemd => install_systemd(&home, &spec),
                Manager::Launchd => install_launchd(&home, &spec),
            }
            .context("failed to install service")?;
            println!("installed service: {}", path.display());
            return Ok(());
        }

        let unit = match self.manager {
            Manager::Systemd => generate_systemd_unit(&spec),
            Manager::Launchd => generate_plist(&spec),
        };
        print!("{unit}");
        Ok(())
    }
}
