use std::io::Write;
use anyhow::{bail, Result};
use crate::cache::CacheTarget;
use crate::config::{Config, ExecutionMode};
use crate::install::Installer;
use crate::package::PackageSpec;
use crate::resolve::{MainPackage, Resolver};
use crate::toolchain::Toolchain;

/// Splits the positional arguments into package patterns and, in run mode,
/// the arguments for the program being run.
pub fn split_run_args(mode: ExecutionMode, args: &[String]) -> Result<(&[String], &[String])> {
    if args.is_empty() {
        bail!("need to provide at least one main package");
    }
    if mode == ExecutionMode::Run {
        Ok(args.split_at(1))
    } else {
        Ok((args, &args[..0]))
    }
}

/// Resolves, builds and then installs/prints/runs every package in `args`.
///
/// All builds finish and every sandbox is removed before anything is
/// dispatched, so a failed build leaves nothing published and run mode does
/// not leak temporary directories.
pub fn run<T: Toolchain, W: Write>(config: &Config, toolchain: &T, args: &[String], out: &mut W) -> Result<()> {
    let (patterns, run_args) = split_run_args(config.mode, args)?;

    let specs = patterns
        .iter()
        .map(|pattern| PackageSpec::new(pattern, config))
        .collect::<Result<Vec<_>>>()?;

    let installer = Installer::new(config, toolchain);
    let mut built: Vec<(MainPackage, CacheTarget)> = Vec::new();
    {
        let resolved = Resolver::new(config, toolchain).resolve_all(&specs)?;
        for entry in resolved {
            for package in entry.packages {
                let target = installer.build(&package, entry.spec.dir())?;
                built.push((package, target));
            }
        }
    }
    drop(specs);

    for (package, target) in &built {
        installer.dispatch(package, target, run_args, out)?;
    }
    Ok(())
}
