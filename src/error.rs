//! Error kinds raised while regenerating boot entries.
//!
//! Only [`Error::Scan`] and [`Error::OutputDir`] end a run. Everything else is
//! collected into the [`RunReport`](crate::sync::RunReport) and the run carries on.

use std::io;
use std::path::PathBuf;
/// An error produced by the discovery, resolution or writing steps.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The boot directory could not be listed.
    #[error("cannot read boot directory '{}': {source}", .path.display())]
    Scan {
        /// Directory that was being listed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The concrete version of one kernel could not be determined.
    #[error("cannot resolve version of kernel '{generic}': {reason}")]
    VersionResolution {
        /// Generic version token taken from the kernel filename.
        generic: String,
        /// What went wrong with the lookup.
        reason: String,
    },

    /// An output directory does not exist and could not be created.
    #[error("output directory '{}' is not writable: {source}", .path.display())]
    OutputDir {
        /// Directory that could not be prepared.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A single output file could not be written.
    #[error("cannot write '{}': {source}", .path.display())]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A stale entry file could not be removed.
    #[error("cannot delete '{}': {source}", .path.display())]
    Delete {
        /// File (or directory, when listing it failed) being purged.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Build a [`Error::VersionResolution`] from anything printable.
    pub fn resolution(generic: &str, reason: impl Into<String>) -> Self {
        Self::VersionResolution {
            generic: generic.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error ends the run instead of degrading it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Scan { .. } | Self::OutputDir { .. })
    }
}

/// Result alias used throughout the synchronization core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_scan_and_output_dir_are_fatal() {
        let resolution = Error::resolution("linux", "exit status 1");
        assert!(!resolution.is_fatal());

        let write = Error::Write {
            path: PathBuf::from("/boot/loader/entries/6.1.0.conf"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!write.is_fatal());

        let output = Error::OutputDir {
            path: PathBuf::from("/boot/loader/entries"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(output.is_fatal());
    }

    #[test]
    fn test_resolution_message_names_kernel() {
        let err = Error::resolution("linux-lts", "no Version field in output");
        let msg = err.to_string();
        assert!(msg.contains("linux-lts"));
        assert!(msg.contains("no Version field"));
    }
}
