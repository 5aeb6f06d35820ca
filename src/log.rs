//! Diagnostic output on stderr.
//!
//! Colour is only used when stderr is a terminal and `NO_COLOR` is unset.

use std::io::IsTerminal;
use colored::Colorize;

pub fn use_color() -> bool {
    std::io::stderr().is_terminal()
        && std::env::var("NO_COLOR").unwrap_or_default().is_empty()
}

/// Disables colouring globally when stderr can't show it.
pub fn init() {
    if !use_color() {
        colored::control::set_override(false);
    }
}

pub fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}

/// Prints `msg` only when `enabled` (the `--debug` flag) is set.
pub fn debug(enabled: bool, msg: &str) {
    if !enabled {
        return;
    }
    if use_color() {
        eprintln!("{}", msg.dimmed());
    } else {
        eprintln!("{}", msg);
    }
}
