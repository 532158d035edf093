//! `moldsync sync-data`, `once`, `unlock`, `logs`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use moldsync_core::paths;
use moldsync_daemon::{init_tracing, run_once, start_blocking, unlock as remove_marker};
use moldsync_daemon::{CycleOutcome, DaemonOptions};

use super::{block_on, EnvFileArg};

#[derive(Args, Debug)]
pub struct SyncDataArgs {
    #[command(flatten)]
    pub env: EnvFileArg,
}

impl SyncDataArgs {
    pub fn run(self, root: PathBuf) -> Result<()> {
        let options = DaemonOptions::new(root, self.env.absolute()?);
        start_blocking(&options).context("sync daemon exited with error")
    }
}

#[derive(Args, Debug)]
pub struct OnceArgs {
    #[command(flatten)]
    pub env: EnvFileArg,

    /// Emit the cycle outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

impl OnceArgs {
    pub fn run(self, root: PathBuf) -> Result<()> {
        init_tracing();
        let options = DaemonOptions::new(root, self.env.absolute()?);
        let outcome = block_on(run_once(options))?.context("sync cycle could not run")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("failed to render outcome JSON")?
            );
        } else {
            print_outcome(&outcome);
        }

        match outcome {
            CycleOutcome::Completed { .. } | CycleOutcome::Overran { .. } => Ok(()),
            CycleOutcome::ContentionSkipped { .. } => {
                bail!("another instance is already running; pass skipped")
            }
            CycleOutcome::RecoverableError { message, .. } => bail!("sync pass failed: {message}"),
        }
    }
}

fn print_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Completed {
            elapsed_secs,
            report,
            ..
        } => {
            println!("{} {} ({elapsed_secs}s)", "✓".green(), report.summary());
        }
        CycleOutcome::Overran {
            interval,
            elapsed_secs,
            report,
        } => {
            println!(
                "{} {} ({elapsed_secs}s, over the {interval} interval)",
                "!".yellow(),
                report.summary()
            );
        }
        CycleOutcome::ContentionSkipped { .. } => {
            println!("{} lock marker held, pass skipped", "✗".red());
        }
        CycleOutcome::RecoverableError { message, .. } => {
            println!("{} {message}", "✗".red());
        }
    }
}

pub fn unlock(root: &Path) -> Result<()> {
    let marker = paths::lock_path(root);
    if remove_marker(root).context("failed to remove lock marker")? {
        println!("removed lock marker {}", marker.display());
    } else {
        println!("no lock marker at {}", marker.display());
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Also show the supervisor's stdout/stderr capture.
    #[arg(long)]
    pub supervisor: bool,
}

impl LogsArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        print_tail(&paths::log_path(root), self.lines).context("failed to read sync log")?;
        if self.supervisor {
            let logs = paths::logs_dir(root);
            for name in ["daemon.log", "daemon-err.log"] {
                print_tail(&logs.join(name), self.lines)
                    .with_context(|| format!("failed to read {name}"))?;
            }
        }
        Ok(())
    }
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut tail = VecDeque::<String>::with_capacity(lines);
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
