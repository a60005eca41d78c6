//! Version lookup through the package database (`pacman -Qi <package>`).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use regex::Regex;

use super::VersionResolver;
use crate::error::{Error, Result};

/// How long a single query may run before it is killed.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Version\s*:[ \t]*(.+)$").unwrap_or_else(|e| panic!("version pattern: {e}"))
});

/// Resolves a generic kernel name by asking the package manager which version
/// of the package of that name is installed.
#[derive(Debug, Clone)]
pub struct PackageQueryResolver {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl PackageQueryResolver {
    /// `program args... <generic>` with the default timeout.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// `pacman -Qi <generic>`.
    pub fn pacman() -> Self {
        Self::new("pacman", ["-Qi"])
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn describe(&self, generic: &str) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.push(generic.to_string());
        parts.join(" ")
    }

    /// Run the query and return its standard output.
    fn query(&self, generic: &str) -> std::result::Result<String, String> {
        let command_line = self.describe(generic);
        debug!("Running '{command_line}'");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(generic)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("running '{command_line}': {e}"))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| format!("capturing stdout of '{command_line}'"))?;
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).map(|_| buf)
        });

        let status = wait_with_timeout(&mut child, self.timeout)
            .map_err(|e| format!("'{command_line}' {e}"))?;

        let output = reader
            .join()
            .map_err(|_| format!("reading output of '{command_line}' panicked"))?
            .map_err(|e| format!("reading output of '{command_line}': {e}"))?;

        if !status.success() {
            return Err(format!("'{command_line}' failed ({status})"));
        }
        Ok(output)
    }
}

impl VersionResolver for PackageQueryResolver {
    fn resolve(&self, generic: &str) -> Result<String> {
        let output = self
            .query(generic)
            .map_err(|reason| Error::resolution(generic, reason))?;

        parse_version_field(&output).ok_or_else(|| {
            Error::resolution(
                generic,
                format!("no Version field in '{}' output", self.describe(generic)),
            )
        })
    }
}

/// Value of the first `Version : ...` line, trimmed. `None` if absent or empty.
pub fn parse_version_field(output: &str) -> Option<String> {
    VERSION_RE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['\r', '\n']).trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> std::result::Result<ExitStatus, String> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => return Err(format!("could not be waited on: {e}")),
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("timed out after {}s", timeout.as_secs_f64()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
