mod cli;
mod execute;

use clap::Parser;
use gobin::log;
use crate::cli::CLI;

fn main() {
    log::init();
    let cli = CLI::parse();
    if let Err(err) = execute::execute(cli) {
        log::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
