use clap::Parser;
use gobin::Flags;

/// Install and run main packages at exact module versions.
#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Resolve dependencies via the main module (as given by go env GOMOD)
    #[clap(short = 'm')]
    pub main_mod: bool,
    /// Provide additional control over updating and use of go.mod (readonly or vendor)
    #[clap(long = "mod", value_name = "MODE")]
    pub mod_mode: Option<String>,
    /// Run the provided main package; remaining arguments are passed to it
    #[clap(long)]
    pub run: bool,
    /// Print gobin install cache location for main packages
    #[clap(short = 'p')]
    pub print: bool,
    /// Print the module path and version for main packages
    #[clap(short = 'v')]
    pub print_version: bool,
    /// Stop after installing main packages to the gobin install cache
    #[clap(short = 'd')]
    pub download: bool,
    /// Check for the latest tagged version of main packages
    #[clap(short = 'u')]
    pub upgrade: bool,
    /// Prevent network access
    #[clap(long)]
    pub nonet: bool,
    /// Print debug information
    #[clap(long)]
    pub debug: bool,
    /// Packages to act on: <import path>[@<version>]
    #[clap(value_name = "PACKAGE", num_args = 1.., trailing_var_arg = true)]
    pub packages: Vec<String>,
}

impl From<&CLI> for Flags {
    fn from(cli: &CLI) -> Self {
        Flags {
            main_mod: cli.main_mod,
            mod_mode: cli.mod_mode.clone(),
            run: cli.run,
            print: cli.print,
            version: cli.print_version,
            download: cli.download,
            upgrade: cli.upgrade,
            no_net: cli.nonet,
            debug: cli.debug,
        }
    }
}
