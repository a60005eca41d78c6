//! Entry synchronization: the full regenerate-from-/boot pass.
//!
//! Order of operations:
//!
//! 1. Purge existing entry files (unless disabled)
//! 2. Scan the boot directory
//! 3. Resolve the version of each kernel
//! 4. Check the configured default
//! 5. Render and write one entry per kernel, then the loader file
//!
//! Only an unreadable boot directory or an output directory that cannot be
//! created stops the run. Every other failure is logged, recorded in the
//! [`RunReport`] and the remaining work goes on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::Settings;
use crate::default_check::{validate_default, DefaultMismatch};
use crate::error::{Error, Result};
use crate::render::{render_entry, render_loader};
use crate::scan::scan_boot_dir;
use crate::version::{resolve_kernel, ResolvedKernel, VersionResolver};

/// What a run did, including everything that went wrong along the way.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Stale entry files that were deleted.
    pub purged: Vec<PathBuf>,
    /// Entry files written, in kernel filename order. Kernels sharing a
    /// version share one file, listed once.
    pub entries_written: Vec<PathBuf>,
    /// The loader file, if it was written.
    pub loader_written: Option<PathBuf>,
    pub default_mismatch: Option<DefaultMismatch>,
    /// Non-fatal errors, in the order they happened.
    pub failures: Vec<Error>,
}

impl RunReport {
    /// True when nothing failed. A default mismatch is only a warning.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, err: Error) {
        error!("{err}");
        self.failures.push(err);
    }
}

/// Regenerates entry and loader files from the boot directory.
pub struct EntrySynchronizer<'a> {
    settings: &'a Settings,
    resolver: &'a dyn VersionResolver,
}

impl<'a> EntrySynchronizer<'a> {
    pub fn new(settings: &'a Settings, resolver: &'a dyn VersionResolver) -> Self {
        Self { settings, resolver }
    }

    /// Run one full pass.
    pub fn run(&self) -> Result<RunReport> {
        let paths = &self.settings.paths;
        let mut report = RunReport::default();

        if self.settings.purge_stale {
            purge_stale(&paths.entries_dir, &mut report);
        }

        let images = scan_boot_dir(&paths.boot_dir)?;
        if images.is_empty() {
            warn!("No kernels found in {}", paths.boot_dir.display());
        }

        report.default_mismatch =
            validate_default(&images, self.settings.loader.default_selection.as_deref());
        if let Some(mismatch) = &report.default_mismatch {
            warn!("{mismatch}");
        }

        let mut kernels = Vec::with_capacity(images.len());
        for image in images {
            info!(
                "Found kernel {} of version {}",
                image.filename, image.generic_version
            );
            if let Some(initramfs) = &image.initramfs {
                info!("Found initramfs {} for kernel {}", initramfs, image.filename);
            }
            match resolve_kernel(self.resolver, image) {
                Ok(kernel) => kernels.push(kernel),
                Err(e) => report.fail(e),
            }
        }

        prepare_dir(&paths.entries_dir)?;
        if let Some(parent) = paths.loader_conf.parent() {
            prepare_dir(parent)?;
        }

        for kernel in &kernels {
            let path = paths.entry_file(&kernel.resolved_version);
            let text = render_entry(kernel, &self.settings.entry);
            match write_file(&path, &text) {
                Ok(()) if report.entries_written.contains(&path) => {}
                Ok(()) => report.entries_written.push(path),
                Err(e) => report.fail(e),
            }
        }

        let default_entry = self.default_entry(&kernels);
        let text = render_loader(&self.settings.loader, default_entry.as_deref());
        match write_file(&paths.loader_conf, &text) {
            Ok(()) => report.loader_written = Some(paths.loader_conf.clone()),
            Err(e) => report.fail(e),
        }

        Ok(report)
    }

    /// Version the loader's `default` line points at.
    ///
    /// The resolved version of the matching kernel when there is one,
    /// otherwise the configured token as-is.
    fn default_entry(&self, kernels: &[ResolvedKernel]) -> Option<String> {
        let selection = self.settings.loader.default_selection.as_deref()?;
        // Last match, because that is the entry file that survives on disk.
        match kernels
            .iter()
            .rev()
            .find(|k| k.image.generic_version == selection)
        {
            Some(kernel) => Some(kernel.resolved_version.clone()),
            None => {
                warn!("Default \"{selection}\" has no resolved kernel, writing it unresolved");
                Some(selection.to_string())
            }
        }
    }
}

/// Delete every regular file in `entries_dir`. A missing directory is fine.
fn purge_stale(entries_dir: &Path, report: &mut RunReport) {
    purge_with(entries_dir, report, |file| fs::remove_file(file));
}

fn purge_with<F>(entries_dir: &Path, report: &mut RunReport, remove: F)
where
    F: Fn(&Path) -> io::Result<()>,
{
    let entries = match fs::read_dir(entries_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(source) => {
            report.fail(Error::Delete {
                path: entries_dir.to_path_buf(),
                source,
            });
            return;
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) if entry.path().is_file() => files.push(entry.path()),
            Ok(_) => {}
            Err(source) => report.fail(Error::Delete {
                path: entries_dir.to_path_buf(),
                source,
            }),
        }
    }
    files.sort();

    for file in files {
        info!("Deleting config file {}", file.display());
        match remove(&file) {
            Ok(()) => report.purged.push(file),
            Err(source) => report.fail(Error::Delete { path: file, source }),
        }
    }
}

fn prepare_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    info!("Generating {}", path.display());
    fs::write(path, text).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
