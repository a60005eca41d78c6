//! Kernel version resolution.
//!
//! Most distributions name kernels after their version (`vmlinuz-6.1.0`), so
//! the token in the filename is already the version. Arch-style systems name
//! them after the package (`vmlinuz-linux`) and the version has to be looked
//! up in the package database.
//!
//! # Example
//!
//! ```rust
//! use systemd_boot_populate::version::{
//!     resolver_for, OsIdentity, PackageQueryResolver, VersionResolver,
//! };
//!
//! let identity = OsIdentity::parse("ID=fedora\n");
//! let resolver = resolver_for(&identity, PackageQueryResolver::pacman());
//! assert_eq!(resolver.resolve("6.1.0").unwrap(), "6.1.0");
//! ```

mod os_release;
mod package_query;

pub use os_release::OsIdentity;
pub use package_query::{parse_version_field, PackageQueryResolver, DEFAULT_QUERY_TIMEOUT};

use log::debug;

use crate::error::{Error, Result};
use crate::scan::KernelImage;

/// Maps a generic version token to the version used for output filenames.
pub trait VersionResolver {
    /// Resolve `generic`. The returned string is never empty.
    fn resolve(&self, generic: &str) -> Result<String>;
}

/// Returns the generic token unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl VersionResolver for IdentityResolver {
    fn resolve(&self, generic: &str) -> Result<String> {
        if generic.is_empty() {
            return Err(Error::resolution(generic, "empty version token"));
        }
        Ok(generic.to_string())
    }
}

/// Pick the resolver matching the running platform.
pub fn resolver_for(
    identity: &OsIdentity,
    query: PackageQueryResolver,
) -> Box<dyn VersionResolver> {
    if identity.uses_rolling_kernel_names() {
        debug!(
            "Platform {:?} uses package-named kernels, resolving versions with {}",
            identity.id,
            query.program().display()
        );
        Box::new(query)
    } else {
        debug!("Platform {:?} uses versioned kernel names", identity.id);
        Box::new(IdentityResolver)
    }
}

/// A kernel together with the version its files are named after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKernel {
    pub image: KernelImage,
    pub resolved_version: String,
}

/// Resolve one kernel and check the result is usable as a file name.
pub fn resolve_kernel(resolver: &dyn VersionResolver, image: KernelImage) -> Result<ResolvedKernel> {
    let resolved_version = resolver.resolve(&image.generic_version)?;

    if resolved_version.is_empty() {
        return Err(Error::resolution(
            &image.generic_version,
            "resolved to an empty version",
        ));
    }
    if resolved_version.contains(['/', '\0']) {
        return Err(Error::resolution(
            &image.generic_version,
            format!("resolved version '{resolved_version}' is not a valid file name"),
        ));
    }

    Ok(ResolvedKernel {
        image,
        resolved_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(&'static str);

    impl VersionResolver for FixedResolver {
        fn resolve(&self, _generic: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn image(token: &str) -> KernelImage {
        KernelImage {
            filename: format!("vmlinuz-{token}"),
            generic_version: token.to_string(),
            initramfs: None,
        }
    }

    #[test]
    fn test_identity_resolver_is_identity() {
        for token in ["6.1.0", "linux", "linux-lts", "5.10.0-23-amd64"] {
            assert_eq!(IdentityResolver.resolve(token).unwrap(), token);
        }
    }

    #[test]
    fn test_resolver_for_generic_platform_is_identity() {
        let identity = OsIdentity::parse("ID=debian\n");
        let query = PackageQueryResolver::new("/nonexistent/pacman", ["-Qi"]);
        let resolver = resolver_for(&identity, query);
        assert_eq!(resolver.resolve("linux").unwrap(), "linux");
    }

    #[test]
    fn test_resolver_for_arch_queries_package_db() {
        let identity = OsIdentity::parse("ID=arch\n");
        let query = PackageQueryResolver::new("/nonexistent/pacman", ["-Qi"]);
        let resolver = resolver_for(&identity, query);
        // The query program does not exist, so the lookup itself must fail
        // instead of falling back to the generic token.
        assert!(resolver.resolve("linux").is_err());
    }

    #[test]
    fn test_resolve_kernel_keeps_image() {
        let resolved = resolve_kernel(&FixedResolver("6.10.3.arch1-1"), image("linux")).unwrap();
        assert_eq!(resolved.resolved_version, "6.10.3.arch1-1");
        assert_eq!(resolved.image.generic_version, "linux");
    }

    #[test]
    fn test_resolve_kernel_rejects_unsafe_names() {
        assert!(resolve_kernel(&FixedResolver(""), image("linux")).is_err());
        assert!(resolve_kernel(&FixedResolver("../../etc/passwd"), image("linux")).is_err());
    }
}
