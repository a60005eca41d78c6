//! Check that the configured default entry matches a discovered kernel.

use std::fmt;

use crate::scan::KernelImage;

/// The configured default names no kernel found in the boot directory.
///
/// Never fatal: entries are still generated for the kernels that exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMismatch {
    pub selection: String,
}

impl fmt::Display for DefaultMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot find default kernel selection \"{}\"",
            self.selection
        )
    }
}

/// Compare `selection` against the generic tokens of `kernels`.
///
/// Users configure the token they see in `/boot`, so the comparison is on
/// the generic version, never the resolved one.
pub fn validate_default(kernels: &[KernelImage], selection: Option<&str>) -> Option<DefaultMismatch> {
    let selection = selection?;
    if kernels.iter().any(|k| k.generic_version == selection) {
        return None;
    }
    Some(DefaultMismatch {
        selection: selection.to_string(),
    })
}
