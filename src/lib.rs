//! Regenerates systemd-boot configuration from the contents of `/boot`.
//!
//! Every kernel image found in the boot directory gets one entry file under
//! `loader/entries/`, named after its version, and a single `loader.conf`
//! carries the loader-wide defaults.
//!
//! # Architecture
//!
//! ```text
//! sync::EntrySynchronizer
//!     │
//!     ├── scan         - list /boot, pair vmlinuz-* with initramfs-*
//!     ├── version      - generic token -> version (identity or pacman -Qi)
//!     ├── default_check - is the configured default among the kernels?
//!     └── render       - entry and loader file text
//!
//! config  - TOML file + command line overrides -> Settings
//! paths   - every location touched, built once
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use systemd_boot_populate::{CliOverrides, EntrySynchronizer, Settings};
//! use systemd_boot_populate::version::{resolver_for, OsIdentity, PackageQueryResolver};
//!
//! let settings = Settings::load(&CliOverrides::default())?;
//! let identity = OsIdentity::load(&settings.paths.os_release)?;
//! let resolver = resolver_for(&identity, PackageQueryResolver::pacman());
//! let report = EntrySynchronizer::new(&settings, resolver.as_ref()).run()?;
//! ```

pub mod config;
pub mod default_check;
pub mod error;
pub mod paths;
pub mod preflight;
pub mod render;
pub mod scan;
pub mod sync;
pub mod version;

pub use config::{CliOverrides, ConsoleMode, EntryOptions, LoaderSettings, Settings};
pub use default_check::DefaultMismatch;
pub use error::Error;
pub use paths::Paths;
pub use scan::{BootDirectorySnapshot, KernelImage};
pub use sync::{EntrySynchronizer, RunReport};
pub use version::{ResolvedKernel, VersionResolver};
