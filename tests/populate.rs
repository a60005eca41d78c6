use std::fs;
use std::path::Path;

use systemd_boot_populate::version::{resolver_for, OsIdentity, PackageQueryResolver};
use systemd_boot_populate::{CliOverrides, EntrySynchronizer, Error, Paths, Settings};
use tempfile::TempDir;

fn boot_tree(root: &Path, files: &[&str]) -> Paths {
    let paths = Paths::under(root);
    fs::create_dir_all(&paths.boot_dir).unwrap();
    for name in files {
        fs::write(paths.boot_dir.join(name), b"image").unwrap();
    }
    paths
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn versioned_kernel_end_to_end() {
    let temp = TempDir::new().unwrap();
    let paths = boot_tree(temp.path(), &["vmlinuz-5.10.0", "initramfs-5.10.0"]);
    let cli = CliOverrides {
        distro_name: Some("ExampleOS".to_string()),
        ..CliOverrides::default()
    };
    let settings = Settings::from_toml_str("", paths, &cli).unwrap();

    let identity = OsIdentity::load(&settings.paths.os_release).unwrap();
    let resolver = resolver_for(&identity, PackageQueryResolver::pacman());
    let report = EntrySynchronizer::new(&settings, resolver.as_ref())
        .run()
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(list(&settings.paths.entries_dir), ["5.10.0.conf"]);

    let entry = fs::read_to_string(settings.paths.entries_dir.join("5.10.0.conf")).unwrap();
    assert_eq!(
        entry,
        "title ExampleOS\nversion 5.10.0\nlinux /vmlinuz-5.10.0\ninitrd /initramfs-5.10.0\n"
    );
    assert!(!entry.contains("options"));

    let loader = fs::read_to_string(&settings.paths.loader_conf).unwrap();
    assert!(!loader.contains("default"));
    assert!(!loader.contains("\n\n"));
}

#[test]
fn arch_kernels_named_by_package_version() {
    let temp = TempDir::new().unwrap();
    let paths = boot_tree(
        temp.path(),
        &[
            "vmlinuz-linux",
            "initramfs-linux.img",
            "initramfs-linux-fallback.img",
            "vmlinuz-linux-zen",
            "intel-ucode.img",
        ],
    );
    fs::create_dir_all(paths.os_release.parent().unwrap()).unwrap();
    fs::write(&paths.os_release, "NAME=\"Arch Linux\"\nID=arch\n").unwrap();

    // linux is installed, linux-zen is not.
    let script = temp.path().join("pacman");
    fs::write(
        &script,
        "case \"$2\" in\n\
         linux) printf 'Name            : linux\\nVersion         : 6.10.3.arch1-1\\n' ;;\n\
         *) echo \"error: package '$2' was not found\" >&2; exit 1 ;;\n\
         esac\n",
    )
    .unwrap();
    let query = PackageQueryResolver::new("/bin/sh", [script.display().to_string(), "-Qi".to_string()]);

    let config = r#"
[main]
distro_name = "Arch Linux"
ucode = "intel-ucode.img"
options = "root=LABEL=root rw"

[loader]
default = "linux"
timeout = 3
console_mode = "keep"
"#;
    let settings = Settings::from_toml_str(config, paths, &CliOverrides::default()).unwrap();

    let identity = OsIdentity::load(&settings.paths.os_release).unwrap();
    let resolver = resolver_for(&identity, query);
    let report = EntrySynchronizer::new(&settings, resolver.as_ref())
        .run()
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        Error::VersionResolution { generic, .. } if generic == "linux-zen"
    ));
    assert_eq!(list(&settings.paths.entries_dir), ["6.10.3.arch1-1.conf"]);

    let entry =
        fs::read_to_string(settings.paths.entries_dir.join("6.10.3.arch1-1.conf")).unwrap();
    assert_eq!(
        entry,
        "title Arch Linux\n\
         version 6.10.3.arch1-1\n\
         linux /vmlinuz-linux\n\
         initrd /intel-ucode.img\n\
         initrd /initramfs-linux.img\n\
         options root=LABEL=root rw\n"
    );

    let loader = fs::read_to_string(&settings.paths.loader_conf).unwrap();
    assert_eq!(
        loader,
        "default 6.10.3.arch1-1.conf\n\
         timeout 3\n\
         editor no\n\
         auto-entries 0\n\
         auto-firmware 0\n\
         console-mode keep\n"
    );
}

#[test]
fn rerun_replaces_entries_of_removed_kernels() {
    let temp = TempDir::new().unwrap();
    let paths = boot_tree(temp.path(), &["vmlinuz-6.1.0", "vmlinuz-6.2.0"]);
    let settings = Settings::from_toml_str("", paths, &CliOverrides::default()).unwrap();
    let resolver = resolver_for(&OsIdentity::default(), PackageQueryResolver::pacman());

    EntrySynchronizer::new(&settings, resolver.as_ref())
        .run()
        .unwrap();
    assert_eq!(
        list(&settings.paths.entries_dir),
        ["6.1.0.conf", "6.2.0.conf"]
    );

    fs::remove_file(settings.paths.boot_dir.join("vmlinuz-6.1.0")).unwrap();
    let report = EntrySynchronizer::new(&settings, resolver.as_ref())
        .run()
        .unwrap();

    assert_eq!(report.purged.len(), 2);
    assert_eq!(list(&settings.paths.entries_dir), ["6.2.0.conf"]);
}
