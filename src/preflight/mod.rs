//! Preflight checks run before touching the boot partition.
//!
//! # Example
//!
//! ```rust
//! use systemd_boot_populate::preflight::command_exists;
//!
//! if !command_exists("pacman") {
//!     println!("pacman not installed");
//! }
//! ```

use anyhow::{bail, Result};
use log::warn;

/// Check if a command exists on the host system.
///
/// Uses the `which` crate to locate the command in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Whether the process runs with root privileges.
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Fail unless running as root; entry and loader files are root-owned.
pub fn require_root() -> Result<()> {
    if !running_as_root() {
        bail!("systemd-boot-populate must be run as root");
    }
    Ok(())
}

/// Warn when the package query program needed for version lookups is missing.
///
/// Not fatal: every lookup will then fail and be reported per kernel.
pub fn check_query_tool(program: &str) -> bool {
    let found = command_exists(program);
    if !found {
        warn!(
            "{} not found in PATH, kernel versions cannot be resolved",
            program
        );
    }
    found
}
