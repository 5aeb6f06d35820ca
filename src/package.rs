use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tempfile::TempDir;
use crate::config::{Config, MANIFEST_FILE};

/// Manifest written into every ephemeral sandbox.
pub const SANDBOX_MANIFEST: &str = "module gobin\n";

/// Splits `pattern@version` on the first `@`.
pub fn split_pattern(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('@') {
        Some((package, version)) => (package, Some(version)),
        None => (raw, None),
    }
}

/// Directory a spec is resolved and built in.
#[derive(Debug)]
pub enum Workspace {
    /// The caller's own module root (`-m` mode).
    MainModule(PathBuf),
    /// A throwaway module, removed when dropped.
    Sandbox(TempDir),
}

impl Workspace {
    pub fn sandbox() -> Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix("gobin")
            .tempdir()
            .context("failed to create temp dir")?;
        std::fs::write(dir.path().join(MANIFEST_FILE), SANDBOX_MANIFEST)
            .context("failed to initialise temp Go module")?;
        Ok(Workspace::Sandbox(dir))
    }

    pub fn path(&self) -> &Path {
        match self {
            Workspace::MainModule(root) => root,
            Workspace::Sandbox(dir) => dir.path(),
        }
    }
}

/// One package argument from the command line.
#[derive(Debug)]
pub struct PackageSpec {
    /// The argument exactly as given.
    pub raw: String,
    /// Part before the `@`.
    pub package: String,
    /// Part after the `@`; empty when absent.
    pub version: String,
    workspace: Workspace,
}

impl PackageSpec {
    pub fn new(raw: &str, config: &Config) -> Result<PackageSpec> {
        let (package, version) = split_pattern(raw);
        let workspace = match &config.main_module {
            Some(root) => Workspace::MainModule(root.clone()),
            None => Workspace::sandbox()?,
        };
        Ok(PackageSpec {
            raw: raw.to_string(),
            package: package.to_string(),
            version: version.unwrap_or_default().to_string(),
            workspace,
        })
    }

    pub fn dir(&self) -> &Path {
        self.workspace.path()
    }

    /// In `-m` mode without an explicit version, the version already recorded
    /// in the main module is used as is and no fetch is run.
    pub fn trusts_current_version(&self, config: &Config) -> bool {
        config.main_mod && self.version.is_empty()
    }
}
