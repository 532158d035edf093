//! moldsync: mold shot counter sync daemon.
//!
//! # Usage
//!
//! ```text
//! moldsync sync-data [--env-file .env]
//! moldsync once [--env-file .env] [--json]
//! moldsync checkout --serial <S> --location <NAME> [--env-file .env]
//! moldsync unlock
//! moldsync logs [--lines N] [--supervisor]
//! moldsync service systemd|launchd [--install|--uninstall]
//! ```
//!
//! `--root` (or `MOLDSYNC_HOME`) moves the runtime directory away from
//! `~/.moldsync`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    checkout::CheckoutArgs,
    daemon::{LogsArgs, OnceArgs, SyncDataArgs},
    service::ServiceArgs,
};
use moldsync_core::paths;

#[derive(Parser, Debug)]
#[command(
    name = "moldsync",
    version,
    about = "Copy mold shot counters from the IoT mold master into the asset system",
    long_about = None,
)]
struct Cli {
    /// Runtime directory holding the lock marker and sync log.
    #[arg(long, global = true, env = paths::ROOT_ENV)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync loop in the foreground until SIGTERM / ctrl-c.
    SyncData(SyncDataArgs),

    /// Run a single guarded cycle and exit.
    Once(OnceArgs),

    /// Bind a machine code to a mold in the source database.
    Checkout(CheckoutArgs),

    /// Remove a lock marker left by a crashed process.
    Unlock,

    /// Print the tail of the sync log.
    Logs(LogsArgs),

    /// Print or install a supervisor unit for `sync-data`.
    Service(ServiceArgs),
}

impl Cli {
    fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => paths::resolve_root().context("could not determine runtime directory"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = cli.root()?;
    match cli.command {
        Commands::SyncData(args) => args.run(root),
        Commands::Once(args) => args.run(root),
        Commands::Checkout(args) => args.run(),
        Commands::Unlock => commands::daemon::unlock(&root),
        Commands::Logs(args) => args.run(&root),
        Commands::Service(args) => args.run(root),
    }
}
