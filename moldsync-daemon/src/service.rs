//! Per-user service definitions that keep `moldsync sync-data` running.
//!
//! launchd on macOS, systemd user units elsewhere. Both restart the daemon
//! whenever it exits, which is how a fatal startup error gets retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use moldsync_core::paths::{
    launch_agents_dir, launchd_plist_path, logs_dir, systemd_unit_path, systemd_user_dir,
    SERVICE_LABEL, SYSTEMD_UNIT,
};

use crate::error::{io_err, DaemonError};

/// What the service manager launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub binary: PathBuf,
    pub env_file: PathBuf,
    pub root: PathBuf,
}

impl ServiceSpec {
    fn program_arguments(&self) -> Vec<String> {
        vec![
            self.binary.display().to_string(),
            "sync-data".to_string(),
            "--env-file".to_string(),
            self.env_file.display().to_string(),
            "--root".to_string(),
            self.root.display().to_string(),
        ]
    }

    fn working_directory(&self) -> PathBuf {
        self.env_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }
}

/// Render the launchd agent plist.
pub fn generate_plist(spec: &ServiceSpec) -> String {
    let logs = logs_dir(&spec.root);
    let stdout = logs.join("daemon.log").display().to_string();
    let stderr = logs.join("daemon-err.log").display().to_string();
    let args: String = spec
        .program_arguments()
        .iter()
        .map(|a| format!("    <string>{}</string>\n", xml_escape(a)))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
{args}  </array>
  <key>WorkingDirectory</key>
  <string>{workdir}</string>
  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <true/>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = SERVICE_LABEL,
        workdir = xml_escape(&spec.working_directory().display().to_string()),
        stdout = xml_escape(&stdout),
        stderr = xml_escape(&stderr),
    )
}

/// Render the systemd user unit.
pub fn generate_systemd_unit(spec: &ServiceSpec) -> String {
    let exec = spec
        .program_arguments()
        .iter()
        .map(|a| systemd_quote(a))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "[Unit]\n\
         Description=moldsync mold counter sync\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exec}\n\
         WorkingDirectory={workdir}\n\
         Environment={root_env}={root}\n\
         Restart=always\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        workdir = spec.working_directory().display(),
        root_env = moldsync_core::paths::ROOT_ENV,
        root = spec.root.display(),
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn systemd_quote(s: &str) -> String {
    if s.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

fn ensure_dir(dir: &Path) -> Result<(), DaemonError> {
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}

// ---------------------------------------------------------------------------
// launchd
// ---------------------------------------------------------------------------

/// Write the plist and bootstrap it into the current user's GUI domain.
pub fn install_launchd(home: &Path, spec: &ServiceSpec) -> Result<PathBuf, DaemonError> {
    ensure_macos()?;
    ensure_dir(&launch_agents_dir(home))?;
    ensure_dir(&logs_dir(&spec.root))?;

    let plist = launchd_plist_path(home);
    fs::write(&plist, generate_plist(spec)).map_err(|e| io_err(&plist, e))?;

    let domain = launchctl_domain()?;
    let service = format!("{domain}/{SERVICE_LABEL}");
    let _ = run_tool("launchctl", &["bootout", &service], true);
    run_tool(
        "launchctl",
        &["bootstrap", &domain, &plist.display().to_string()],
        false,
    )?;
    run_tool("launchctl", &["kickstart", "-k", &service], false)?;
    Ok(plist)
}

/// Boot out the agent and remove its plist.
pub fn uninstall_launchd(home: &Path) -> Result<(), DaemonError> {
    ensure_macos()?;
    let plist = launchd_plist_path(home);
    if plist.exists() {
        let service = format!("{}/{SERVICE_LABEL}", launchctl_domain()?);
        let _ = run_tool("launchctl", &["bootout", &service], true);
        fs::remove_file(&plist).map_err(|e| io_err(&plist, e))?;
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn ensure_macos() -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn ensure_macos() -> Result<(), DaemonError> {
    Err(DaemonError::Service(
        "launchd management is only supported on macOS".to_string(),
    ))
}

fn launchctl_domain() -> Result<String, DaemonError> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .map_err(|e| io_err("id -u", e))?;
    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || uid.is_empty() {
        return Err(DaemonError::Service(format!(
            "failed to resolve current uid (status {})",
            output.status
        )));
    }
    Ok(format!("gui/{uid}"))
}

// ---------------------------------------------------------------------------
// systemd
// ---------------------------------------------------------------------------

/// Write the user unit, reload systemd and start the service.
pub fn install_systemd(home: &Path, spec: &ServiceSpec) -> Result<PathBuf, DaemonError> {
    ensure_dir(&systemd_user_dir(home))?;
    ensure_dir(&logs_dir(&spec.root))?;

    let unit = systemd_unit_path(home);
    fs::write(&unit, generate_systemd_unit(spec)).map_err(|e| io_err(&unit, e))?;

    run_tool("systemctl", &["--user", "daemon-reload"], false)?;
    run_tool("systemctl", &["--user", "enable", "--now", SYSTEMD_UNIT], false)?;
    Ok(unit)
}

/// Stop and disable the unit, then remove it.
pub fn uninstall_systemd(home: &Path) -> Result<(), DaemonError> {
    let unit = systemd_unit_path(home);
    if unit.exists() {
        let _ = run_tool("systemctl", &["--user", "disable", "--now", SYSTEMD_UNIT], true);
        fs::remove_file(&unit).map_err(|e| io_err(&unit, e))?;
        let _ = run_tool("systemctl", &["--user", "daemon-reload"], true);
    }
    Ok(())
}

fn run_tool(program: &str, args: &[&str], ignore_failure: bool) -> Result<(), DaemonError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| io_err(program, e))?;

    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(DaemonError::Service(format!(
        "{program} {} failed (status {}): {stdout} {stderr}",
        args.join(" "),
        output.status
    )))
}
