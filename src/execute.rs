use anyhow::Result;
use gobin::pipeline;
use gobin::{Config, Flags, GoToolchain};
use crate::cli::CLI;

pub fn execute(cli: CLI) -> Result<()> {
    let flags = Flags::from(&cli);
    let config = Config::discover(&flags)?;
    let toolchain = GoToolchain::new(config.debug);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    pipeline::run(&config, &toolchain, &cli.packages, &mut out)
}
