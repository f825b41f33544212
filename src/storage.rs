use crate::error::MountError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const MOUNT_TABLE_PATH: &str = "/proc/mounts";

/// The opaque OS-level mount collaborator: table query plus mount/umount
/// commands. Only success/failure matters to the manager.
pub trait MountOps: Send {
    fn read_mount_table(&self) -> Result<String, MountError>;
    fn mount_device(&self, device: &str, mount_point: &Path) -> Result<(), MountError>;
    fn unmount_device(&self, device: &str) -> Result<(), MountError>;
}

pub struct SystemMountOps;

impl MountOps for SystemMountOps {
    fn read_mount_table(&self) -> Result<String, MountError> {
        fs::read_to_string(MOUNT_TABLE_PATH).map_err(|err| MountError {
            op: "mount table read",
            device: MOUNT_TABLE_PATH.to_string(),
            detail: err.to_string(),
        })
    }

    fn mount_device(&self, device: &str, mount_point: &Path) -> Result<(), MountError> {
        let mut command = Command::new("mount");
        command.arg(device).arg(mount_point);
        run_mount_command(command, "mount", device)
    }

    fn unmount_device(&self, device: &str) -> Result<(), MountError> {
        let mut command = Command::new("umount");
        command.arg(device);
        run_mount_command(command, "umount", device)
    }
}

fn run_mount_command(
    mut command: Command,
    op: &'static str,
    device: &str,
) -> Result<(), MountError> {
    let output = command.output().map_err(|err| MountError {
        op,
        device: device.to_string(),
        detail: err.to_string(),
    })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let detail = if stderr.is_empty() {
        format!("exit status {}", output.status.code().unwrap_or(-1))
    } else {
        stderr
    };
    Err(MountError {
        op,
        device: device.to_string(),
        detail,
    })
}

/// Manages one fixed removable storage target. Mount state is re-read from
/// the OS table on every call; the stick can be pulled or plugged between
/// flush windows, so a cached flag would go stale.
pub struct RemovableStorage {
    device: String,
    mount_point: PathBuf,
    ops: Box<dyn MountOps>,
}

impl RemovableStorage {
    pub fn new(device: String, mount_point: PathBuf) -> Self {
        Self::with_ops(device, mount_point, Box::new(SystemMountOps))
    }

    pub fn with_ops(device: String, mount_point: PathBuf, ops: Box<dyn MountOps>) -> Self {
        Self {
            device,
            mount_point,
            ops,
        }
    }

    pub fn is_mounted(&self) -> Result<bool, MountError> {
        let table = self.ops.read_mount_table()?;
        Ok(table
            .lines()
            .any(|line| line.split_whitespace().next() == Some(self.device.as_str())))
    }

    pub fn mount(&self) -> Result<(), MountError> {
        if self.is_mounted()? {
            return Ok(());
        }
        fs::create_dir_all(&self.mount_point).map_err(|err| MountError {
            op: "mount",
            device: self.device.clone(),
            detail: format!("failed to create {}: {err}", self.mount_point.display()),
        })?;
        self.ops.mount_device(&self.device, &self.mount_point)
    }

    pub fn unmount(&self) -> Result<(), MountError> {
        if !self.is_mounted()? {
            return Ok(());
        }
        self.ops.unmount_device(&self.device)
    }
}
