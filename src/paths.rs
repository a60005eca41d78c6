//! Filesystem locations read and written by a run.

use std::path::{Path, PathBuf};

/// Default location of the TOML configuration.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/systemd-boot-populate.toml";
/// Directory scanned for kernel and initramfs images.
pub const DEFAULT_BOOT_DIR: &str = "/boot";
/// Directory receiving one `<version>.conf` per kernel.
pub const DEFAULT_ENTRIES_DIR: &str = "/boot/loader/entries";
/// Loader-wide defaults file.
pub const DEFAULT_LOADER_CONF: &str = "/efi/loader/loader.conf";
/// OS identity file used to pick the version resolver.
pub const DEFAULT_OS_RELEASE: &str = "/etc/os-release";

/// Every filesystem location the tool touches.
///
/// Built once at startup and handed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// TOML configuration file.
    pub config: PathBuf,
    /// Directory holding kernel, initramfs and microcode images.
    pub boot_dir: PathBuf,
    /// Directory the per-kernel entry files are written to.
    pub entries_dir: PathBuf,
    /// Loader-wide settings file.
    pub loader_conf: PathBuf,
    /// OS identity file.
    pub os_release: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            boot_dir: PathBuf::from(DEFAULT_BOOT_DIR),
            entries_dir: PathBuf::from(DEFAULT_ENTRIES_DIR),
            loader_conf: PathBuf::from(DEFAULT_LOADER_CONF),
            os_release: PathBuf::from(DEFAULT_OS_RELEASE),
        }
    }
}

impl Paths {
    /// Paths rooted under `root` instead of `/`, keeping the default layout.
    pub fn under(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            config: reroot(root, &defaults.config),
            boot_dir: reroot(root, &defaults.boot_dir),
            entries_dir: reroot(root, &defaults.entries_dir),
            loader_conf: reroot(root, &defaults.loader_conf),
            os_release: reroot(root, &defaults.os_release),
        }
    }

    /// Output path of the entry file for `resolved_version`.
    pub fn entry_file(&self, resolved_version: &str) -> PathBuf {
        self.entries_dir.join(format!("{resolved_version}.conf"))
    }
}

fn reroot(root: &Path, path: &Path) -> PathBuf {
    root.join(path.strip_prefix("/").unwrap_or(path))
}
