use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, LevelFilter};

use systemd_boot_populate::preflight::{check_query_tool, require_root};
use systemd_boot_populate::version::{resolver_for, OsIdentity, PackageQueryResolver};
use systemd_boot_populate::{CliOverrides, EntrySynchronizer, Settings};

/// Generate systemd-boot entries for every kernel in /boot.
#[derive(Debug, Parser)]
#[command(name = "systemd-boot-populate", version, about)]
struct Args {
    /// Displays additional information
    #[arg(short, long)]
    verbose: bool,

    /// Do not delete existing entry files
    #[arg(long)]
    no_delete: bool,

    /// Distribution name to display in the bootloader menu entry
    #[arg(short = 'n', long, value_name = "NAME")]
    distro_name: Option<String>,

    /// Microcode image to load
    #[arg(short = 'u', long, value_name = "IMAGE")]
    ucode: Option<String>,

    /// Configuration file to read instead of /etc/systemd-boot-populate.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            config: args.config,
            verbose: args.verbose,
            no_delete: args.no_delete,
            distro_name: args.distro_name,
            ucode: args.ucode,
        }
    }
}

fn main() -> ExitCode {
    let cli = CliOverrides::from(Args::parse());
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every entry and the loader file were written.
fn run(cli: &CliOverrides) -> Result<bool> {
    require_root()?;

    let settings = Settings::load(cli)?;
    if settings.verbose && !cli.verbose {
        log::set_max_level(LevelFilter::Info);
    }

    let identity = OsIdentity::load(&settings.paths.os_release)?;
    let query = PackageQueryResolver::pacman();
    if identity.uses_rolling_kernel_names() {
        check_query_tool(&query.program().to_string_lossy());
    }
    let resolver = resolver_for(&identity, query);

    let report = EntrySynchronizer::new(&settings, resolver.as_ref())
        .run()
        .with_context(|| {
            format!(
                "regenerating entries from '{}'",
                settings.paths.boot_dir.display()
            )
        })?;

    if !report.is_complete() {
        error!(
            "Finished with {} error(s); {} entries written",
            report.failures.len(),
            report.entries_written.len()
        );
    }
    Ok(report.is_complete())
}

/// Warnings and errors always; progress messages with `--verbose`.
///
/// The logger is set up before the config file is read so config errors are
/// reported too. The filter is built at `Info` and capped through
/// `log::set_max_level`, which lets `verbose = true` in the config raise it.
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();

    if !verbose && std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(LevelFilter::Warn);
    }
}
