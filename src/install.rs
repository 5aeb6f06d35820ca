use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{Context, Result};
use crate::cache::{binary_name, CacheTarget};
use crate::config::{Config, ExecutionMode};
use crate::env::{build_env, Proxy};
use crate::resolve::MainPackage;
use crate::toolchain::{Invocation, Toolchain};

/// Import path of this tool. Installing it may mean overwriting the running binary.
pub const SELF_IMPORT_PATH: &str = "github.com/myitcv/gobin";

pub fn is_self(import_path: &str) -> bool {
    import_path == SELF_IMPORT_PATH
}

/// Builds main packages into the artifact cache and acts on the result.
pub struct Installer<'a, T: Toolchain> {
    config: &'a Config,
    toolchain: &'a T,
}

impl<'a, T: Toolchain> Installer<'a, T> {
    pub fn new(config: &'a Config, toolchain: &'a T) -> Self {
        Installer { config, toolchain }
    }

    /// Runs `go install` for `package` from `workspace` into its cache target.
    /// Dependencies are already fetched at this point, so only the local
    /// download cache is offered as a proxy.
    pub fn build(&self, package: &MainPackage, workspace: &Path) -> Result<CacheTarget> {
        let target = CacheTarget::new(&self.config.artifact_cache, package)?;

        if is_self(&package.import_path) {
            let _ = fs::remove_file(&target.binary);
        }

        let env = build_env(self.config, Proxy::LocalCache);
        self.toolchain
            .run(&Invocation::install(&package.import_path, workspace, env, &target.dir))?;
        Ok(target)
    }

    /// Acts on a built package according to the execution mode.
    pub fn dispatch<W: Write>(
        &self,
        package: &MainPackage,
        target: &CacheTarget,
        run_args: &[String],
        out: &mut W,
    ) -> Result<()> {
        match self.config.mode {
            ExecutionMode::DownloadOnly => {}
            ExecutionMode::Print => {
                writeln!(out, "{}", target.binary.display())?;
            }
            ExecutionMode::Version => {
                writeln!(out, "{} {}", package.module.path, package.module.version)?;
            }
            ExecutionMode::Run => {
                out.flush()?;
                exec(&target.binary, run_args)?;
            }
            ExecutionMode::Install => {
                let bin = publish(package, target, &self.config.install_dir)?;
                writeln!(
                    out,
                    "Installed {}@{} to {}",
                    package.import_path,
                    package.module.version,
                    bin.display()
                )?;
            }
        }
        Ok(())
    }
}

/// Copies a cached binary into `install_dir` and returns the installed path.
///
/// The tool's own binary is removed first and recreated exclusively, so a
/// running copy is never written to in place.
pub fn publish(package: &MainPackage, target: &CacheTarget, install_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(install_dir)
        .with_context(|| format!("failed to mkdir {}", install_dir.display()))?;

    let mut src = File::open(&target.binary)
        .with_context(|| format!("failed to open {}", target.binary.display()))?;
    let bin = install_dir.join(binary_name(&package.import_path));

    let mut options = OpenOptions::new();
    options.write(true);
    if is_self(&package.import_path) {
        let _ = fs::remove_file(&bin);
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }

    let mut dest = options
        .open(&bin)
        .with_context(|| format!("failed to open {} for writing", bin.display()))?;
    io::copy(&mut src, &mut dest)
        .with_context(|| format!("failed to copy {} to {}", target.binary.display(), bin.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        dest.set_permissions(fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to chmod {}", bin.display()))?;
    }
    Ok(bin)
}

/// Replaces the current process with `binary`. Only returns on failure.
#[cfg(unix)]
fn exec(binary: &Path, args: &[String]) -> Result<()> {
    use std::os::unix::process::CommandExt;
    let err = Command::new(binary).args(args).exec();
    anyhow::bail!("failed to exec {}: {}", binary.display(), err)
}

/// Without `exec`, runs `binary` as a child and exits with its status code.
#[cfg(not(unix))]
fn exec(binary: &Path, args: &[String]) -> Result<()> {
    let status = Command::new(binary)
        .args(args)
        .status()
        .with_context(|| format!("failed to exec {}", binary.display()))?;
    std::process::exit(status.code().unwrap_or(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;
    use crate::resolve::ModuleCoordinate;
    use crate::testutil::{test_config, FakeToolchain};
    use tempfile::tempdir;

    fn package(import_path: &str, module: &str, version: &str) -> MainPackage {
        MainPackage {
            import_path: import_path.to_string(),
            module: ModuleCoordinate {
                path: module.to_string(),
                version: version.to_string(),
                dir: String::new(),
            },
        }
    }

    fn mode(mode: ExecutionMode) -> Flags {
        Flags {
            print: mode == ExecutionMode::Print,
            version: mode == ExecutionMode::Version,
            download: mode == ExecutionMode::DownloadOnly,
            ..Flags::default()
        }
    }

    #[test]
    fn test_build_installs_into_cache_target() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new();
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.2.3");

        let target = Installer::new(&config, &toolchain).build(&pkg, dir.path()).unwrap();
        assert_eq!(target.dir, dir.path().join("cache/gobin/example.com/cmd/@v/v1.2.3"));
        assert!(target.binary.exists());

        let calls = toolchain.calls();
        assert_eq!(calls[0].command_line(), "go install example.com/cmd");
        assert!(calls[0].env_var("GOPROXY").unwrap().starts_with("file://"));
        assert_eq!(calls[0].env_var("GOBIN"), Some(target.dir.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_install_copies_to_install_dir() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.2.3");

        let target = installer.build(&pkg, dir.path()).unwrap();
        let mut out = Vec::new();
        installer.dispatch(&pkg, &target, &[], &mut out).unwrap();

        let bin = dir.path().join("bin").join(binary_name("example.com/cmd"));
        assert_eq!(fs::read_to_string(&bin).unwrap(), "built example.com/cmd");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Installed example.com/cmd@v1.2.3 to {}\n", bin.display())
        );
    }

    #[test]
    fn test_install_overwrites_existing_binary() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.2.3");

        let bin = dir.path().join("bin").join(binary_name("example.com/cmd"));
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, "an older and much longer binary").unwrap();

        let target = installer.build(&pkg, dir.path()).unwrap();
        installer.dispatch(&pkg, &target, &[], &mut Vec::new()).unwrap();
        assert_eq!(fs::read_to_string(&bin).unwrap(), "built example.com/cmd");
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_binary_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.2.3");

        let target = installer.build(&pkg, dir.path()).unwrap();
        let bin = publish(&pkg, &target, &config.install_dir).unwrap();
        assert_eq!(fs::metadata(bin).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn test_self_install_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package(SELF_IMPORT_PATH, SELF_IMPORT_PATH, "v0.0.9");

        let bin = dir.path().join("bin").join(binary_name(SELF_IMPORT_PATH));
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, "running copy").unwrap();

        let target = installer.build(&pkg, dir.path()).unwrap();
        installer.dispatch(&pkg, &target, &[], &mut Vec::new()).unwrap();
        assert_eq!(fs::read_to_string(&bin).unwrap(), format!("built {}", SELF_IMPORT_PATH));
    }

    #[test]
    fn test_self_build_removes_stale_cache_artifact() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new().failing_install();
        let pkg = package(SELF_IMPORT_PATH, SELF_IMPORT_PATH, "v0.0.9");

        let target = CacheTarget::new(&config.artifact_cache, &pkg).unwrap();
        fs::create_dir_all(&target.dir).unwrap();
        fs::write(&target.binary, "stale").unwrap();

        let err = Installer::new(&config, &toolchain).build(&pkg, dir.path()).unwrap_err();
        assert!(err.to_string().contains("go install"));
        assert!(!target.binary.exists());
    }

    #[test]
    fn test_other_build_keeps_cache_artifact() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), Flags::default());
        let toolchain = FakeToolchain::new().failing_install();
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.0.0");

        let target = CacheTarget::new(&config.artifact_cache, &pkg).unwrap();
        fs::create_dir_all(&target.dir).unwrap();
        fs::write(&target.binary, "cached").unwrap();

        assert!(Installer::new(&config, &toolchain).build(&pkg, dir.path()).is_err());
        assert!(target.binary.exists());
    }

    #[test]
    fn test_print_mode_outputs_cache_path() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), mode(ExecutionMode::Print));
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v1.2.3");

        let target = installer.build(&pkg, dir.path()).unwrap();
        let mut out = Vec::new();
        installer.dispatch(&pkg, &target, &[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", target.binary.display()));
        assert!(!dir.path().join("bin").exists());
    }

    #[test]
    fn test_version_mode_outputs_module_coordinate() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), mode(ExecutionMode::Version));
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v2.0.0");

        let target = installer.build(&pkg, dir.path()).unwrap();
        let mut out = Vec::new();
        installer.dispatch(&pkg, &target, &[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "example.com/cmd v2.0.0\n");
        assert!(!dir.path().join("bin").exists());
    }

    #[test]
    fn test_download_mode_is_silent() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), mode(ExecutionMode::DownloadOnly));
        let toolchain = FakeToolchain::new();
        let installer = Installer::new(&config, &toolchain);
        let pkg = package("example.com/cmd", "example.com/cmd", "v2.0.0");

        let target = installer.build(&pkg, dir.path()).unwrap();
        let mut out = Vec::new();
        installer.dispatch(&pkg, &target, &[], &mut out).unwrap();
        assert!(out.is_empty());
        assert!(target.binary.exists());
        assert!(!dir.path().join("bin").exists());
    }
}
