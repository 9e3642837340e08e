//! 电源控制：重启与关机。

use crate::error::DeviceError;
use std::process::Command;
use tracing::{info, warn};

/// 主机电源动作。
pub trait PowerControl: Send + Sync {
    fn restart(&self) -> Result<(), DeviceError>;
    fn shutdown(&self) -> Result<(), DeviceError>;
}

const SUDO: &str = "/usr/bin/sudo";
const SHUTDOWN: &str = "/sbin/shutdown";

/// 调用系统 `shutdown` 命令（需要免密 sudo）。
#[derive(Debug, Default, Clone)]
pub struct ShellPowerControl;

impl ShellPowerControl {
    fn run(&self, flag: &str) -> Result<(), DeviceError> {
        let command = format!("{SUDO} {SHUTDOWN} {flag} now");
        info!(target: "climlog.power", command = %command, "power_command");
        let output = Command::new(SUDO)
            .args([SHUTDOWN, flag, "now"])
            .output()
            .map_err(|err| DeviceError::Command {
                command: command.clone(),
                message: err.to_string(),
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            info!(target: "climlog.power", output = %stdout.trim(), "power_command_output");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(target: "climlog.power", status = %output.status, stderr = %stderr, "power_command_failed");
            return Err(DeviceError::Command {
                command,
                message: format!("{}: {}", output.status, stderr),
            });
        }
        Ok(())
    }
}

impl PowerControl for ShellPowerControl {
    fn restart(&self) -> Result<(), DeviceError> {
        self.run("-r")
    }

    fn shutdown(&self) -> Result<(), DeviceError> {
        self.run("-h")
    }
}

/// 只记录日志、不执行命令的电源控制。
#[derive(Debug, Default, Clone)]
pub struct DryRunPowerControl;

impl PowerControl for DryRunPowerControl {
    fn restart(&self) -> Result<(), DeviceError> {
        info!(target: "climlog.power", action = "restart", "power_dry_run");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), DeviceError> {
        info!(target: "climlog.power", action = "shutdown", "power_dry_run");
        Ok(())
    }
}
