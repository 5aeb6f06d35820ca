use std::fmt;
use serde::Deserialize;
use thiserror::Error;
use crate::config::Config;
use crate::env::{build_env, Proxy};
use crate::log;
use crate::package::PackageSpec;
use crate::toolchain::{Invocation, Toolchain, ToolchainError};

/// Package name the toolchain reports for executables.
pub const MAIN_PACKAGE: &str = "main";

/// The module that provides a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModuleCoordinate {
    pub path: String,
    pub version: String,
    pub dir: String,
}

/// One record of `go list -json` output. Only the fields used here are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListedPackage {
    pub import_path: String,
    pub name: String,
    pub dir: String,
    pub module: ModuleCoordinate,
}

/// A resolved main package and the module coordinate it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainPackage {
    pub import_path: String,
    pub module: ModuleCoordinate,
}

/// A spec whose pattern matched something other than a main package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonMainPackage {
    pub pattern: String,
    pub version: String,
}

impl fmt::Display for NonMainPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: not a main package", self.pattern, self.version)
    }
}

/// Outcome of resolving one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Main(Vec<MainPackage>),
    NotMain(NonMainPackage),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error("failed to decode package listing for {pattern}: {source}")]
    Decode {
        pattern: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{pattern} matched no packages")]
    NoPackages { pattern: String },
    #[error("{}", format_non_main(.0))]
    NotMain(Vec<NonMainPackage>),
}

fn format_non_main(packages: &[NonMainPackage]) -> String {
    let mut out = String::new();
    for package in packages {
        out.push_str(&package.to_string());
        out.push('\n');
    }
    let plural = if packages.len() > 1 { "s" } else { "" };
    out.push_str(&format!("failed to resolve module-based main package{}", plural));
    out
}

/// A spec together with the main packages it resolved to.
#[derive(Debug)]
pub struct Resolved<'s> {
    pub spec: &'s PackageSpec,
    pub packages: Vec<MainPackage>,
}

/// Decodes a stream of `go list -json` records for `spec`.
///
/// The first record whose name isn't `main` turns the whole spec into
/// [`Resolution::NotMain`].
pub fn decode_listing(spec: &PackageSpec, stdout: &[u8]) -> Result<Resolution, ResolveError> {
    let mut version = spec.version.clone();
    let mut packages = Vec::new();
    for record in serde_json::Deserializer::from_slice(stdout).into_iter::<ListedPackage>() {
        let listed = record.map_err(|source| ResolveError::Decode {
            pattern: spec.raw.clone(),
            source,
        })?;
        version = listed.module.version.clone();
        if listed.name != MAIN_PACKAGE {
            return Ok(Resolution::NotMain(NonMainPackage {
                pattern: spec.package.clone(),
                version,
            }));
        }
        packages.push(MainPackage {
            import_path: listed.import_path,
            module: listed.module,
        });
    }
    if packages.is_empty() {
        return Err(ResolveError::NoPackages { pattern: spec.raw.clone() });
    }
    Ok(Resolution::Main(packages))
}

/// Resolves specs first against the local download cache, then over the network.
pub struct Resolver<'a, T: Toolchain> {
    config: &'a Config,
    toolchain: &'a T,
}

impl<'a, T: Toolchain> Resolver<'a, T> {
    pub fn new(config: &'a Config, toolchain: &'a T) -> Self {
        Resolver { config, toolchain }
    }

    /// Resolves every spec, one at a time.
    ///
    /// Toolchain failures during the local phase send the spec to the network
    /// phase, unless network access is disabled, in which case they are fatal.
    /// Any failure in the network phase is fatal. Specs that matched a non-main
    /// package are reported together once all specs have been attempted.
    pub fn resolve_all<'s>(&self, specs: &'s [PackageSpec]) -> Result<Vec<Resolved<'s>>, ResolveError> {
        let mut outcomes: Vec<Option<Resolution>> = specs.iter().map(|_| None).collect();

        if !self.config.upgrade {
            for (spec, outcome) in specs.iter().zip(outcomes.iter_mut()) {
                match self.attempt(spec, Proxy::LocalCache) {
                    Ok(resolution) => *outcome = Some(resolution),
                    Err(ResolveError::Toolchain(err)) if !self.config.no_net => {
                        log::debug(
                            self.config.debug,
                            &format!("{}: not resolvable from the module cache, trying the network\n{}", spec.raw, err),
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        // Anything still unresolved is queued for the network.
        if self.config.no_net {
            assert!(
                outcomes.iter().all(Option::is_some),
                "specs queued for network resolution with network access disabled"
            );
        }

        for (spec, outcome) in specs.iter().zip(outcomes.iter_mut()) {
            if outcome.is_none() {
                *outcome = Some(self.attempt(spec, Proxy::Upstream)?);
            }
        }

        let mut resolved = Vec::new();
        let mut non_main = Vec::new();
        for (spec, outcome) in specs.iter().zip(outcomes.into_iter().flatten()) {
            match outcome {
                Resolution::Main(packages) => resolved.push(Resolved { spec, packages }),
                Resolution::NotMain(package) => non_main.push(package),
            }
        }
        if !non_main.is_empty() {
            return Err(ResolveError::NotMain(non_main));
        }
        Ok(resolved)
    }

    /// Fetch (unless the current version is trusted) then list, through `proxy`.
    pub fn attempt(&self, spec: &PackageSpec, proxy: Proxy) -> Result<Resolution, ResolveError> {
        let env = build_env(self.config, proxy);
        if !spec.trusts_current_version(self.config) {
            self.toolchain.run(&Invocation::get(&spec.raw, spec.dir(), env.clone()))?;
        }
        let stdout = self.toolchain.run(&Invocation::list(&spec.package, spec.dir(), env))?;
        decode_listing(spec, &stdout)
    }
}
