//! Minimal reader for the os-release identity file.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

/// Distribution IDs whose kernel packages carry rolling generic names
/// (`vmlinuz-linux`, `vmlinuz-linux-lts`, ...).
const ROLLING_KERNEL_IDS: &[&str] = &["arch"];

/// The identifying fields of the running system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsIdentity {
    pub id: Option<String>,
    pub id_like: Vec<String>,
    pub name: Option<String>,
}

impl OsIdentity {
    /// Read `path`. A missing file gives an empty identity.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found, assuming a generic platform", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading '{}'", path.display())),
        }
    }

    /// Parse `KEY=value` lines, ignoring comments and unknown keys.
    pub fn parse(content: &str) -> Self {
        let fields: HashMap<&str, String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), unquote(value.trim())))
            .collect();

        Self {
            id: fields.get("ID").map(|v| v.to_ascii_lowercase()),
            id_like: fields
                .get("ID_LIKE")
                .map(|v| {
                    v.split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect()
                })
                .unwrap_or_default(),
            name: fields.get("NAME").cloned(),
        }
    }

    /// Whether kernels on this system are named after their package rather
    /// than their version, so the version has to come from the package
    /// database.
    pub fn uses_rolling_kernel_names(&self) -> bool {
        self.id
            .iter()
            .chain(self.id_like.iter())
            .any(|id| ROLLING_KERNEL_IDS.contains(&id.as_str()))
    }
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}
