//! Text rendering for entry and loader files.
//!
//! Both renderers fill a fixed line template. A field with no value leaves an
//! empty line behind, and [`strip_blank_lines`] removes every blank line
//! before the text is written, so unset fields simply disappear.
//!
//! Entry file for kernel `vmlinuz-linux` resolved to `6.10.3.arch1-1`:
//!
//! ```text
//! title Arch Linux
//! version 6.10.3.arch1-1
//! linux /vmlinuz-linux
//! initrd /intel-ucode.img
//! initrd /initramfs-linux.img
//! options root=LABEL=root rw
//! ```

use crate::config::{EntryOptions, LoaderSettings};
use crate::version::ResolvedKernel;

/// Render one `loader/entries/<version>.conf`.
pub fn render_entry(kernel: &ResolvedKernel, options: &EntryOptions) -> String {
    let cmdline = (!options.kernel_cmdline.is_empty()).then(|| options.kernel_cmdline.join(" "));

    let template = [
        field("title", Some(&options.distro_name)),
        field("version", Some(&kernel.resolved_version)),
        field("linux", Some(&esp_path(&kernel.image.filename))),
        field("initrd", options.microcode.as_deref().map(esp_path).as_ref()),
        field("initrd", kernel.image.initramfs.as_deref().map(esp_path).as_ref()),
        field("options", cmdline.as_ref()),
    ];
    strip_blank_lines(&template.join("\n"))
}

/// Render `loader/loader.conf`.
///
/// `default_entry` is the version the default entry file is named after.
/// The bootloader matches it against entry filenames, hence the `.conf`.
pub fn render_loader(settings: &LoaderSettings, default_entry: Option<&str>) -> String {
    let template = [
        field("default", default_entry.map(|v| format!("{v}.conf")).as_ref()),
        field("timeout", settings.timeout_secs.map(|t| t.to_string()).as_ref()),
        // systemd-boot wants yes/no here but 1/0 for the auto-* keys.
        field("editor", Some(&yes_no(settings.editor))),
        field("auto-entries", Some(&one_zero(settings.auto_entries))),
        field("auto-firmware", Some(&one_zero(settings.auto_firmware))),
        field(
            "console-mode",
            settings.console_mode.map(|m| m.to_string()).as_ref(),
        ),
    ];
    strip_blank_lines(&template.join("\n"))
}

/// Drop every line that is empty or whitespace-only.
///
/// Each remaining line ends with `\n`; an all-blank input becomes `""`.
pub fn strip_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn field(key: &str, value: Option<&String>) -> String {
    match value {
        Some(value) => format!("{key} {value}"),
        None => String::new(),
    }
}

/// Paths in entry files are absolute from the root of the boot partition.
fn esp_path(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

fn yes_no(flag: bool) -> String {
    String::from(if flag { "yes" } else { "no" })
}

fn one_zero(flag: bool) -> String {
    String::from(if flag { "1" } else { "0" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleMode;
    use crate::scan::KernelImage;
    use proptest::prelude::*;

    fn kernel(filename: &str, resolved: &str, initramfs: Option<&str>) -> ResolvedKernel {
        ResolvedKernel {
            image: KernelImage {
                filename: filename.to_string(),
                generic_version: filename.trim_start_matches("vmlinuz-").to_string(),
                initramfs: initramfs.map(str::to_string),
            },
            resolved_version: resolved.to_string(),
        }
    }

    fn options(name: &str) -> EntryOptions {
        EntryOptions {
            distro_name: name.to_string(),
            microcode: None,
            kernel_cmdline: Vec::new(),
        }
    }

    #[test]
    fn test_entry_minimal() {
        let text = render_entry(
            &kernel("vmlinuz-5.10.0", "5.10.0", Some("initramfs-5.10.0")),
            &options("ExampleOS"),
        );
        assert_eq!(
            text,
            "title ExampleOS\nversion 5.10.0\nlinux /vmlinuz-5.10.0\ninitrd /initramfs-5.10.0\n"
        );
        assert!(!text.contains("options"));
    }

    #[test]
    fn test_entry_full() {
        let opts = EntryOptions {
            distro_name: "Arch Linux".to_string(),
            microcode: Some("intel-ucode.img".to_string()),
            kernel_cmdline: vec!["root=LABEL=root".to_string(), "rw".to_string()],
        };
        let text = render_entry(
            &kernel("vmlinuz-linux", "6.10.3.arch1-1", Some("initramfs-linux.img")),
            &opts,
        );
        assert_eq!(
            text,
            "title Arch Linux\n\
             version 6.10.3.arch1-1\n\
             linux /vmlinuz-linux\n\
             initrd /intel-ucode.img\n\
             initrd /initramfs-linux.img\n\
             options root=LABEL=root rw\n"
        );
    }

    #[test]
    fn test_entry_without_initramfs() {
        let text = render_entry(&kernel("vmlinuz-6.2.0", "6.2.0", None), &options("Linux"));
        assert!(!text.contains("initrd"));
        assert!(text.ends_with("linux /vmlinuz-6.2.0\n"));
    }

    #[test]
    fn test_entry_keeps_absolute_microcode_path() {
        let mut opts = options("Linux");
        opts.microcode = Some("/amd-ucode.img".to_string());
        let text = render_entry(&kernel("vmlinuz-6.2.0", "6.2.0", None), &opts);
        assert!(text.contains("initrd /amd-ucode.img\n"));
    }

    #[test]
    fn test_loader_defaults() {
        let text = render_loader(&LoaderSettings::default(), None);
        assert_eq!(text, "editor no\nauto-entries 0\nauto-firmware 0\n");
    }

    #[test]
    fn test_loader_full() {
        let settings = LoaderSettings {
            default_selection: Some("linux".to_string()),
            timeout_secs: Some(5),
            editor: true,
            auto_entries: true,
            auto_firmware: false,
            console_mode: Some(ConsoleMode::Max),
        };
        let text = render_loader(&settings, Some("6.10.3.arch1-1"));
        assert_eq!(
            text,
            "default 6.10.3.arch1-1.conf\n\
             timeout 5\n\
             editor yes\n\
             auto-entries 1\n\
             auto-firmware 0\n\
             console-mode max\n"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let k = kernel("vmlinuz-6.1.0", "6.1.0", Some("initramfs-6.1.0.img"));
        let opts = options("Linux");
        assert_eq!(render_entry(&k, &opts), render_entry(&k, &opts));

        let settings = LoaderSettings::default();
        assert_eq!(
            render_loader(&settings, Some("6.1.0")),
            render_loader(&settings, Some("6.1.0"))
        );
    }

    #[test]
    fn test_strip_blank_lines() {
        assert_eq!(strip_blank_lines("a\n\n\nb\n  \n\tc"), "a\nb\nc\n");
        assert_eq!(strip_blank_lines("\n\n"), "");
        assert_eq!(strip_blank_lines(""), "");
    }

    proptest! {
        #[test]
        fn stripped_text_has_no_blank_lines(text in "[a-z \t\n]{0,64}") {
            let out = strip_blank_lines(&text);
            prop_assert!(out.lines().all(|line| !line.trim().is_empty()));
            prop_assert!(!out.contains("\n\n"));
        }

        #[test]
        fn stripping_keeps_content_lines(lines in prop::collection::vec("[a-z]{1,8}", 0..6)) {
            let padded = lines.join("\n\n \n");
            let out = strip_blank_lines(&padded);
            prop_assert_eq!(out.lines().collect::<Vec<_>>(), lines.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
