//! Runtime device discovery
//!
//! Finds curl engines by scanning the UIO class tree: every
//! `/sys/class/uio/uio*` whose `name` attribute matches the gateware's
//! device-tree node is a curl engine, and its `maps/map0/size` attribute
//! gives the control block size. No hardcoded device lists.

use crate::device::CurlDevice;
use crate::error::{CurlError, Result};
use curlpow_chip::UIO_DEVICE_NAME;
use std::path::{Path, PathBuf};

const UIO_SYSFS_ROOT: &str = "/sys/class/uio";
const DEV_ROOT: &str = "/dev";

/// Device manager for runtime discovery and access
#[derive(Debug)]
pub struct DeviceManager {
    devices: Vec<DeviceInfo>,
}

/// Information about a discovered curl engine
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// UIO device index (the N in `uioN`)
    pub index: usize,

    /// Device node path (`/dev/uioN`)
    pub dev_path: PathBuf,

    /// UIO name attribute, from the device-tree node
    pub name: String,

    /// Size of `map0`, the control register block, in bytes
    pub map_size: usize,
}

impl DeviceManager {
    /// Discover all curl engines on the system.
    ///
    /// # Errors
    ///
    /// Returns [`CurlError::NoDevicesFound`] if no UIO device carries the
    /// curl engine name.
    pub fn discover() -> Result<Self> {
        Self::discover_at(Path::new(UIO_SYSFS_ROOT), Path::new(DEV_ROOT))
    }

    /// Discovery against explicit sysfs/dev roots. [`discover`] uses the
    /// real ones; tests point this at a scratch tree.
    ///
    /// # Errors
    ///
    /// Returns [`CurlError::NoDevicesFound`] if nothing matches.
    ///
    /// [`discover`]: Self::discover
    pub fn discover_at(sysfs_root: &Path, dev_root: &Path) -> Result<Self> {
        tracing::info!("Discovering curl devices under {}", sysfs_root.display());

        let mut devices = Vec::new();

        let entries = match std::fs::read_dir(sysfs_root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read {}: {e}", sysfs_root.display());
                return Err(CurlError::NoDevicesFound);
            }
        };

        for entry in entries.flatten() {
            let dir_name = entry.file_name().to_string_lossy().to_string();
            let Some(index) = dir_name
                .strip_prefix("uio")
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };

            let name = match std::fs::read_to_string(entry.path().join("name")) {
                Ok(name) => name.trim().to_string(),
                Err(e) => {
                    tracing::debug!("No name attribute for {dir_name}: {e}");
                    continue;
                }
            };

            if name != UIO_DEVICE_NAME {
                continue;
            }

            let map_size = match Self::read_hex_sysfs(&entry.path().join("maps/map0/size")) {
                Ok(size) => size,
                Err(e) => {
                    tracing::warn!("Cannot read map0 size for {dir_name}: {e}");
                    continue;
                }
            };

            tracing::info!("Device {index}: {name} (map0 {map_size:#x} bytes)");

            devices.push(DeviceInfo {
                index,
                dev_path: dev_root.join(&dir_name),
                name,
                map_size,
            });
        }

        if devices.is_empty() {
            tracing::error!("No curl devices found");
            return Err(CurlError::NoDevicesFound);
        }

        devices.sort_by_key(|d| d.index);
        tracing::info!("Discovered {} curl device(s)", devices.len());

        Ok(Self { devices })
    }

    /// Number of discovered devices
    #[must_use]
    pub const fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// All discovered devices
    #[must_use]
    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Device info by UIO index
    ///
    /// # Errors
    ///
    /// Returns [`CurlError::InvalidIndex`] if no device has this index.
    pub fn device(&self, index: usize) -> Result<&DeviceInfo> {
        self.devices
            .iter()
            .find(|d| d.index == index)
            .ok_or(CurlError::InvalidIndex {
                index,
                count: self.devices.len(),
            })
    }

    /// Open a device by UIO index
    ///
    /// # Errors
    ///
    /// Returns an error if the index is invalid or the device cannot be
    /// opened.
    pub fn open(&self, index: usize) -> Result<CurlDevice> {
        let info = self.device(index)?;
        CurlDevice::open(info)
    }

    /// Open the first discovered device
    ///
    /// # Errors
    ///
    /// Returns an error if no devices are available or the device cannot
    /// be opened.
    pub fn open_first(&self) -> Result<CurlDevice> {
        let info = self.devices.first().ok_or(CurlError::NoDevicesFound)?;
        CurlDevice::open(info)
    }

    /// Read a hexadecimal value from a sysfs attribute
    fn read_hex_sysfs(path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let trimmed = content.trim().trim_start_matches("0x");

        usize::from_str_radix(trimmed, 16)
            .map_err(|e| CurlError::transfer_failed(format!("invalid hex value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct ScratchTree(tempfile::TempDir);

    impl ScratchTree {
        fn new() -> Self {
            Self(tempfile::TempDir::new().unwrap())
        }

        fn add_uio(&self, index: usize, name: &str, size: &str) {
            let dir = self.0.path().join(format!("sys/uio{index}"));
            fs::create_dir_all(dir.join("maps/map0")).unwrap();
            fs::write(dir.join("name"), format!("{name}\n")).unwrap();
            fs::write(dir.join("maps/map0/size"), format!("{size}\n")).unwrap();
        }

        fn sysfs(&self) -> PathBuf {
            self.0.path().join("sys")
        }

        fn dev(&self) -> PathBuf {
            self.0.path().join("dev")
        }
    }

    #[test]
    fn finds_only_curl_engines() {
        let tree = ScratchTree::new();
        tree.add_uio(0, "some-other-ip", "0x1000");
        tree.add_uio(1, UIO_DEVICE_NAME, "0x14");
        tree.add_uio(2, UIO_DEVICE_NAME, "0x1000");

        let mgr = DeviceManager::discover_at(&tree.sysfs(), &tree.dev()).unwrap();
        assert_eq!(mgr.device_count(), 2);
        assert_eq!(mgr.device(1).unwrap().map_size, 0x14);
        assert_eq!(mgr.device(2).unwrap().dev_path, tree.dev().join("uio2"));
        assert!(matches!(
            mgr.device(0),
            Err(CurlError::InvalidIndex { index: 0, count: 2 })
        ));
    }

    #[test]
    fn empty_tree_reports_no_devices() {
        let tree = ScratchTree::new();
        tree.add_uio(0, "some-other-ip", "0x1000");
        assert!(matches!(
            DeviceManager::discover_at(&tree.sysfs(), &tree.dev()),
            Err(CurlError::NoDevicesFound)
        ));
    }

    #[test]
    fn malformed_size_is_skipped() {
        let tree = ScratchTree::new();
        tree.add_uio(0, UIO_DEVICE_NAME, "not-hex");
        assert!(matches!(
            DeviceManager::discover_at(&tree.sysfs(), &tree.dev()),
            Err(CurlError::NoDevicesFound)
        ));
    }
}
