//! Linux device discovery via sysfs and procfs

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use stickwriter_core::prelude::*;
use stickwriter_core::BlockDevice;
use tokio::process::Command;

use crate::tools::ToolAvailability;

const SYS_BLOCK: &str = "/sys/block";
const PROC_MOUNTS: &str = "/proc/mounts";
const SECTOR_SIZE: u64 = 512;

/// Kernel block devices that are never physical disks
const VIRTUAL_PREFIXES: &[&str] = &["loop", "ram", "zram", "dm-"];

fn read_sys_file(dir: &Path, file: &str) -> Option<String> {
    fs::read_to_string(dir.join(file))
        .ok()
        .map(|s| s.trim().to_string())
}

/// Strip a partition suffix: `/dev/sda1` -> `/dev/sda`, `/dev/nvme0n1p2` -> `/dev/nvme0n1`
pub fn parent_device_path(path: &str) -> String {
    if let Some(index) = path.rfind('p') {
        let (base, suffix) = path.split_at(index);
        let digits = &suffix[1..];
        let base_ends_in_digit = base.chars().last().is_some_and(|c| c.is_ascii_digit());
        if base_ends_in_digit && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        {
            return base.to_string();
        }
    }

    let name = path.trim_start_matches("/dev/");
    if ["sd", "vd", "hd", "xvd"].iter().any(|p| name.starts_with(p)) {
        return path.trim_end_matches(|c: char| c.is_ascii_digit()).to_string();
    }

    path.to_string()
}

/// Whether `mounted` names `device_path` itself or one of its partitions
fn is_same_disk(mounted: &str, device_path: &str) -> bool {
    match mounted.strip_prefix(device_path) {
        Some("") => true,
        Some(rest) => {
            let rest = rest.strip_prefix('p').unwrap_or(rest);
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Collect mount points for a device and its partitions from `/proc/mounts` content
pub fn mount_points_in(mounts: &str, device_path: &str) -> Vec<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let source = parts.next()?;
            let target = parts.next()?;
            is_same_disk(source, device_path).then(|| target.to_string())
        })
        .collect()
}

fn device_display_name(vendor: &str, model: &str, fallback: &str) -> String {
    match (vendor.is_empty(), model.is_empty()) {
        (false, false) => format!("{} {}", vendor, model),
        (true, false) => model.to_string(),
        (false, true) => vendor.to_string(),
        (true, true) => fallback.to_string(),
    }
}

/// Find the disk that holds `/` so it can never be offered as a target
fn system_disk() -> Option<String> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))?;
    let path = PathBuf::from("/dev").join(root.name());
    Some(parent_device_path(&path.to_string_lossy()))
}

/// Scan a sysfs-style block directory for removable disks
pub fn scan_block_dir(
    block_dir: &Path,
    mounts: &str,
    system_disk: Option<&str>,
) -> Result<Vec<BlockDevice>> {
    let mut devices = Vec::new();

    if !block_dir.exists() {
        return Ok(devices);
    }

    for entry in fs::read_dir(block_dir)?.filter_map(std::result::Result::ok) {
        let name = entry.file_name().to_string_lossy().to_string();
        if VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }

        let path = format!("/dev/{}", name);
        if system_disk == Some(path.as_str()) {
            trace!("Skipping system disk {}", path);
            continue;
        }

        let dir = entry.path();
        let removable = read_sys_file(&dir, "removable").is_some_and(|s| s == "1");
        if !removable {
            continue;
        }

        let sectors: u64 = read_sys_file(&dir, "size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let size = sectors * SECTOR_SIZE;
        if size == 0 {
            continue;
        }

        let vendor = read_sys_file(&dir, "device/vendor").unwrap_or_default();
        let model = read_sys_file(&dir, "device/model").unwrap_or_default();

        let mut device = BlockDevice::new(&path, device_display_name(&vendor, &model, &name), size);
        device.mount_points = mount_points_in(mounts, &path);
        devices.push(device);
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Enumerate removable disks, excluding the system disk
pub fn list_removable_devices() -> Result<Vec<BlockDevice>> {
    let mounts = fs::read_to_string(PROC_MOUNTS).unwrap_or_default();
    let system = system_disk();
    if system.is_none() {
        warn!("Could not determine the system disk");
    }
    scan_block_dir(Path::new(SYS_BLOCK), &mounts, system.as_deref())
}

async fn run_quiet(program: &Path, args: &[&str]) -> Result<std::process::Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::command(format!("{}: {}", program.display(), e)))
}

/// Unmount every mount point of `device`, escalating through pkexec if needed
pub async fn unmount_device(device: &BlockDevice, tools: &ToolAvailability) -> Result<()> {
    let mounts = fs::read_to_string(PROC_MOUNTS).unwrap_or_default();
    let mount_points = mount_points_in(&mounts, &device.path);
    if mount_points.is_empty() {
        return Ok(());
    }

    let umount = tools
        .umount
        .as_deref()
        .ok_or_else(|| Error::command("umount not found"))?;

    for mount_point in mount_points {
        debug!("Unmounting {}", mount_point);
        let output = run_quiet(umount, &[mount_point.as_str()]).await?;
        if output.status.success() {
            continue;
        }

        let Some(pkexec) = tools.pkexec.as_deref() else {
            return Err(Error::command(format!(
                "Failed to unmount {}: {}",
                mount_point,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        };

        let umount_arg = umount.to_string_lossy();
        let output = run_quiet(pkexec, &[umount_arg.as_ref(), mount_point.as_str()]).await?;
        if !output.status.success() {
            return Err(Error::command(format!(
                "Failed to unmount {}: {}",
                mount_point,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
    }

    Ok(())
}

/// Power off a device with udisks, falling back to `eject`
pub async fn eject_device(device_path: &str, tools: &ToolAvailability) -> Result<()> {
    let output = if let Some(udisksctl) = tools.udisksctl.as_deref() {
        run_quiet(udisksctl, &["power-off", "-b", device_path]).await?
    } else if let Some(eject) = tools.eject.as_deref() {
        run_quiet(eject, &[device_path]).await?
    } else {
        return Err(Error::command(
            tools
                .eject_unavailable_message()
                .unwrap_or("No eject tool available"),
        ));
    };

    if !output.status.success() {
        return Err(Error::command(format!(
            "Failed to eject {}: {}",
            device_path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    info!("Ejected {}", device_path);
    Ok(())
}
