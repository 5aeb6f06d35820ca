//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use crate::cache::binary_name;
use crate::config::{Config, Flags, HostEnv, UserDirs};
use crate::toolchain::{Invocation, Toolchain, ToolchainError};

/// A `go list -json` record.
pub fn listing(import_path: &str, name: &str, module: &str, version: &str) -> String {
    format!(
        r#"{{"ImportPath": "{import_path}", "Name": "{name}", "Dir": "/src/{import_path}", "Module": {{"Path": "{module}", "Version": "{version}"}}}}"#
    )
}

/// Config rooted in `root`, with a `go.mod` there so `-m` mode works.
pub fn test_config(root: &Path, flags: Flags) -> Config {
    std::fs::write(root.join("go.mod"), "module example.com/m\n").unwrap();
    let env = HostEnv {
        vars: vec![
            ("GOPATH".to_string(), root.join("gopath").to_string_lossy().to_string()),
            ("GOBIN".to_string(), root.join("bin").to_string_lossy().to_string()),
            ("GOPROXY".to_string(), "https://proxy.test".to_string()),
        ],
    };
    let dirs = UserDirs { home: Some(root.join("home")), cache: Some(root.join("cache")) };
    Config::from_parts(&flags, env, root, &dirs).unwrap()
}

/// Scripted stand-in for the `go` command.
///
/// `get` always succeeds, `list` answers from registered listings, `install`
/// writes a small file into `$GOBIN`. With `offline_missing`, everything run
/// against a `file://` proxy fails.
#[derive(Default)]
pub struct FakeToolchain {
    listings: HashMap<String, String>,
    offline_missing: bool,
    failing_install: bool,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        FakeToolchain::default()
    }

    pub fn with_listing(mut self, import_path: &str, name: &str, module: &str, version: &str) -> Self {
        self.listings
            .insert(import_path.to_string(), listing(import_path, name, module, version));
        self
    }

    pub fn offline_missing(mut self) -> Self {
        self.offline_missing = true;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.failing_install = true;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn fail(invocation: &Invocation, stderr: &str) -> ToolchainError {
        ToolchainError::Failed {
            command: invocation.command_line(),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }
    }
}

impl Toolchain for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolchainError> {
        self.calls.borrow_mut().push(invocation.clone());

        let offline = invocation
            .env_var("GOPROXY")
            .is_some_and(|proxy| proxy.starts_with("file://"));
        let target = invocation.args.last().cloned().unwrap_or_default();

        match invocation.args[0].as_str() {
            "get" | "list" if self.offline_missing && offline => {
                Err(Self::fail(invocation, "module lookup disabled"))
            }
            "get" => Ok(Vec::new()),
            "list" => match self.listings.get(&target) {
                Some(listing) => Ok(listing.clone().into_bytes()),
                None => Err(Self::fail(invocation, "cannot find module providing package")),
            },
            "install" if self.failing_install => Err(Self::fail(invocation, "build failed")),
            "install" => {
                let gobin = invocation.env_var("GOBIN").unwrap();
                std::fs::create_dir_all(gobin).unwrap();
                std::fs::write(Path::new(gobin).join(binary_name(&target)), format!("built {}", target)).unwrap();
                Ok(Vec::new())
            }
            other => panic!("unexpected toolchain command {other}"),
        }
    }
}
