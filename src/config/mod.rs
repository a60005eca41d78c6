//! Configuration loading.
//!
//! Settings come from `/etc/systemd-boot-populate.toml` and are then
//! overridden by command line flags:
//!
//! ```toml
//! [main]
//! distro_name = "Arch Linux"
//! ucode = "intel-ucode.img"
//! options = ["root=LABEL=root", "rw"]
//!
//! [loader]
//! default = "linux"
//! timeout = 3
//! editor = false
//! console_mode = "max"
//!
//! [paths]
//! loader_conf = "/boot/loader/loader.conf"
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;

use crate::paths::Paths;

/// Title used when neither the config nor the command line names the distro.
pub const DEFAULT_DISTRO_NAME: &str = "Linux";

/// Loader-wide settings written to `loader.conf`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Generic version token of the default kernel, as seen in `/boot`.
    pub default_selection: Option<String>,
    pub timeout_secs: Option<u32>,
    pub editor: bool,
    pub auto_entries: bool,
    pub auto_firmware: bool,
    pub console_mode: Option<ConsoleMode>,
}

/// Per-entry settings shared by every kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOptions {
    pub distro_name: String,
    /// Microcode image loaded before the initramfs.
    pub microcode: Option<String>,
    /// Kernel command line, one word per element.
    pub kernel_cmdline: Vec<String>,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            distro_name: DEFAULT_DISTRO_NAME.to_string(),
            microcode: None,
            kernel_cmdline: Vec::new(),
        }
    }
}

/// Values accepted by systemd-boot's `console-mode` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    Auto,
    Max,
    Keep,
    Mode(u32),
}

impl fmt::Display for ConsoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Max => f.write_str("max"),
            Self::Keep => f.write_str("keep"),
            Self::Mode(n) => write!(f, "{n}"),
        }
    }
}

impl ConsoleMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "max" => Some(Self::Max),
            "keep" => Some(Self::Keep),
            other => other.parse().ok().map(Self::Mode),
        }
    }
}

/// Command line values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub no_delete: bool,
    pub distro_name: Option<String>,
    pub ucode: Option<String>,
}

/// Fully merged settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub verbose: bool,
    /// Delete existing entry files before writing new ones.
    pub purge_stale: bool,
    pub paths: Paths,
    pub loader: LoaderSettings,
    pub entry: EntryOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    main: MainToml,
    #[serde(default)]
    loader: LoaderToml,
    #[serde(default)]
    paths: PathsToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MainToml {
    verbose: Option<bool>,
    no_delete: Option<bool>,
    distro_name: Option<String>,
    ucode: Option<String>,
    options: Option<CmdlineToml>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CmdlineToml {
    Line(String),
    Words(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoaderToml {
    default: Option<String>,
    timeout: Option<u32>,
    editor: Option<bool>,
    auto_entries: Option<bool>,
    auto_firmware: Option<bool>,
    console_mode: Option<ConsoleModeToml>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConsoleModeToml {
    Number(i64),
    Name(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsToml {
    boot_dir: Option<PathBuf>,
    entries_dir: Option<PathBuf>,
    loader_conf: Option<PathBuf>,
    os_release: Option<PathBuf>,
}

impl Settings {
    /// Load the config file named by `cli` (or the default one) and apply
    /// the command line on top.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let mut paths = Paths::default();
        if let Some(config) = &cli.config {
            paths.config = config.clone();
        }
        let raw = read_config(&paths.config)?;
        Self::from_parts(raw, paths, cli)
    }

    /// Parse config text directly. Used for tests and embedded defaults.
    pub fn from_toml_str(content: &str, paths: Paths, cli: &CliOverrides) -> Result<Self> {
        let raw: ConfigToml = toml::from_str(content)
            .with_context(|| format!("parsing config '{}'", paths.config.display()))?;
        Self::from_parts(raw, paths, cli)
    }

    fn from_parts(raw: ConfigToml, mut paths: Paths, cli: &CliOverrides) -> Result<Self> {
        let config_path = paths.config.clone();
        let ConfigToml {
            main,
            loader,
            paths: path_overrides,
        } = raw;

        if let Some(dir) = path_overrides.boot_dir {
            paths.boot_dir = dir;
        }
        if let Some(dir) = path_overrides.entries_dir {
            paths.entries_dir = dir;
        }
        if let Some(file) = path_overrides.loader_conf {
            paths.loader_conf = file;
        }
        if let Some(file) = path_overrides.os_release {
            paths.os_release = file;
        }

        let distro_name = cli
            .distro_name
            .clone()
            .or(main.distro_name)
            .unwrap_or_else(|| DEFAULT_DISTRO_NAME.to_string());
        let distro_name = distro_name.trim().to_string();
        if distro_name.is_empty() {
            bail!(
                "invalid config '{}': distro_name must not be empty",
                config_path.display()
            );
        }

        let microcode = cli
            .ucode
            .clone()
            .or(main.ucode)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let kernel_cmdline = match main.options {
            Some(CmdlineToml::Line(line)) => {
                line.split_whitespace().map(str::to_string).collect()
            }
            Some(CmdlineToml::Words(words)) => words
                .into_iter()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
            None => Vec::new(),
        };

        let console_mode = loader
            .console_mode
            .map(|raw| parse_console_mode(raw, &config_path))
            .transpose()?;

        let default_selection = loader
            .default
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        check_single_line("distro_name", &distro_name, &config_path)?;
        if let Some(ucode) = &microcode {
            check_single_line("ucode", ucode, &config_path)?;
        }
        for word in &kernel_cmdline {
            check_single_line("options", word, &config_path)?;
        }
        if let Some(default) = &default_selection {
            check_single_line("default", default, &config_path)?;
        }

        Ok(Self {
            verbose: cli.verbose || main.verbose.unwrap_or(false),
            purge_stale: !(cli.no_delete || main.no_delete.unwrap_or(false)),
            paths,
            loader: LoaderSettings {
                default_selection,
                timeout_secs: loader.timeout,
                editor: loader.editor.unwrap_or(false),
                auto_entries: loader.auto_entries.unwrap_or(false),
                auto_firmware: loader.auto_firmware.unwrap_or(false),
                console_mode,
            },
            entry: EntryOptions {
                distro_name,
                microcode,
                kernel_cmdline,
            },
        })
    }
}

fn read_config(path: &Path) -> Result<ConfigToml> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No config at '{}', using defaults", path.display());
            return Ok(ConfigToml::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading config '{}'", path.display()));
        }
    };
    toml::from_str(&content).with_context(|| format!("parsing config '{}'", path.display()))
}

/// Values are copied into line-based files, so control characters would
/// start new lines or garble them.
fn check_single_line(field: &str, value: &str, config_path: &Path) -> Result<()> {
    if value.chars().any(char::is_control) {
        bail!(
            "invalid config '{}': {} must not contain control characters: {:?}",
            config_path.display(),
            field,
            value
        );
    }
    Ok(())
}

fn parse_console_mode(raw: ConsoleModeToml, config_path: &Path) -> Result<ConsoleMode> {
    let parsed = match &raw {
        ConsoleModeToml::Number(n) => u32::try_from(*n).ok().map(ConsoleMode::Mode),
        ConsoleModeToml::Name(name) => ConsoleMode::parse(name),
    };
    parsed.ok_or_else(|| {
        let shown = match raw {
            ConsoleModeToml::Number(n) => n.to_string(),
            ConsoleModeToml::Name(name) => name,
        };
        anyhow::anyhow!(
            "invalid config '{}': unsupported console_mode '{}' (expected 'auto', 'max', 'keep' or a mode number)",
            config_path.display(),
            shown
        )
    })
}
