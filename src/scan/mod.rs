//! Boot directory discovery.
//!
//! Lists the boot directory once into a sorted [`BootDirectorySnapshot`] and
//! classifies it into [`KernelImage`]s. Kernels are files named
//! `vmlinuz-<token>` or `vmlinux-<token>`; each one is paired with the first
//! `initramfs-<token>...` file in sorted order.
//!
//! The snapshot is always sorted. Pairing relies on that: all names sharing
//! the `initramfs-<token>` prefix form one contiguous run, so the lookup is a
//! binary search plus a short forward scan instead of a pass over every file.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Prefix shared by every initramfs image.
pub const INITRAMFS_PREFIX: &str = "initramfs-";

static KERNEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^vmlinu[xz]-(.+)$").unwrap_or_else(|e| panic!("kernel pattern: {e}"))
});

/// A kernel image found in the boot directory, before version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelImage {
    /// Kernel filename, e.g. `vmlinuz-linux`.
    pub filename: String,
    /// Token after `vmlinu?-`, e.g. `linux` or `6.1.0`.
    pub generic_version: String,
    /// Matching initramfs filename, if one exists.
    pub initramfs: Option<String>,
}

/// Sorted regular-file names of the boot directory at scan time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootDirectorySnapshot {
    names: Vec<String>,
}

impl BootDirectorySnapshot {
    /// Build a snapshot from arbitrary names. The names are sorted.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        Self { names }
    }

    /// List `dir` (non-recursively), keeping regular files only.
    ///
    /// Symlinks are followed, so a link to a kernel counts as a kernel.
    /// Entries that cannot be inspected are skipped with a warning; only a
    /// failure to open `dir` itself is an error.
    pub fn read(dir: &Path) -> Result<Self> {
        let scan_err = |source: io::Error| Error::Scan {
            path: dir.to_path_buf(),
            source,
        };

        let meta = fs::metadata(dir).map_err(scan_err)?;
        if !meta.is_dir() {
            return Err(scan_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        let mut names = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(scan_err(e.into())),
                Err(e) => {
                    warn!("Skipping unreadable boot directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) => names.push(name.to_string()),
                None => debug!(
                    "Skipping non UTF-8 filename {}",
                    entry.path().display()
                ),
            }
        }

        // walkdir already yields sorted names; keep the invariant explicit.
        names.sort();
        Ok(Self { names })
    }

    /// All names in sorted order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Classify the snapshot into kernels, in sorted filename order.
    pub fn kernels(&self) -> Vec<KernelImage> {
        self.names
            .iter()
            .filter_map(|name| {
                let generic = kernel_token(name)?;
                Some(KernelImage {
                    filename: name.clone(),
                    generic_version: generic.to_string(),
                    initramfs: self.initramfs_for(generic).map(str::to_string),
                })
            })
            .collect()
    }

    /// First initramfs for `token` in sorted order.
    ///
    /// The name must start with `initramfs-<token>` and the rest must be
    /// empty or a single extension such as `.img`. That keeps
    /// `initramfs-linux-fallback.img` away from token `linux` and
    /// `initramfs-6.1.5.img` away from token `6.1`.
    pub fn initramfs_for(&self, token: &str) -> Option<&str> {
        let prefix = format!("{INITRAMFS_PREFIX}{token}");
        let start = self
            .names
            .partition_point(|name| name.as_str() < prefix.as_str());

        self.names[start..]
            .iter()
            .take_while(|name| name.starts_with(&prefix))
            .find(|name| {
                let rest = &name[prefix.len()..];
                rest.is_empty() || is_extension(rest)
            })
            .map(String::as_str)
    }
}

fn is_extension(rest: &str) -> bool {
    rest.strip_prefix('.')
        .is_some_and(|ext| !ext.is_empty() && !ext.contains(['.', '-']))
}

/// Generic version token of a kernel filename, or `None` if it is not one.
pub fn kernel_token(filename: &str) -> Option<&str> {
    KERNEL_RE
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Scan `boot_dir` and classify its kernels in one call.
pub fn scan_boot_dir(boot_dir: &Path) -> Result<Vec<KernelImage>> {
    Ok(BootDirectorySnapshot::read(boot_dir)?.kernels())
}
