use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use thiserror::Error;
use crate::log;

/// The external toolchain binary.
pub const GO: &str = "go";

/// One fully specified toolchain subprocess.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    /// Complete environment of the child; nothing else is inherited.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(args: &[&str], dir: &Path, env: BTreeMap<String, String>) -> Self {
        Invocation {
            program: GO.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            dir: dir.to_path_buf(),
            env,
        }
    }

    /// `go get -d <pattern>`: records the requested version in the manifest.
    pub fn get(pattern: &str, dir: &Path, env: BTreeMap<String, String>) -> Self {
        Invocation::new(&["get", "-d", pattern], dir, env)
    }

    /// `go list -json <package>`: describes the packages a pattern matches.
    pub fn list(package: &str, dir: &Path, env: BTreeMap<String, String>) -> Self {
        Invocation::new(&["list", "-json", package], dir, env)
    }

    /// `go install <import path>` with the binary landing in `gobin`.
    pub fn install(import_path: &str, dir: &Path, mut env: BTreeMap<String, String>, gobin: &Path) -> Self {
        env.insert("GOBIN".to_string(), gobin.to_string_lossy().to_string());
        Invocation::new(&["install", import_path], dir, env)
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// The `GO*` variables, as shown in debug traces.
    pub fn toolchain_env(&self) -> String {
        self.env
            .iter()
            .filter(|(k, _)| k.starts_with("GO"))
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run {command}: {status}\n{stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Runs toolchain invocations and hands back their stdout.
pub trait Toolchain {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolchainError>;
}

/// Spawns the real `go` command. This is the only place subprocesses are started
/// for resolution and builds.
#[derive(Debug, Clone, Default)]
pub struct GoToolchain {
    debug: bool,
}

impl GoToolchain {
    pub fn new(debug: bool) -> Self {
        GoToolchain { debug }
    }
}

impl Toolchain for GoToolchain {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolchainError> {
        let start = Instant::now();
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolchainError::Spawn {
                command: invocation.command_line(),
                source,
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(ToolchainError::Failed {
                command: invocation.command_line(),
                status: output.status.to_string(),
                stderr,
            });
        }

        log::debug(
            self.debug,
            &format!(
                "+ cd {}; {} {} # took {:?}\n{}",
                invocation.dir.display(),
                invocation.toolchain_env(),
                invocation.command_line(),
                start.elapsed(),
                stderr
            ),
        );
        Ok(output.stdout)
    }
}
