//! # gobin Core Library
//!
//! Installs and runs Go main packages at exact module versions. A package
//! argument (`path[@version]`) is resolved with the `go` command, first against
//! the local module download cache and then over the network, built into a
//! cache laid out by module path and version, and finally installed, printed,
//! or executed.
//!
//! This library is built for the `gobin` CLI.
//!
//! ## Modules Overview
//! - [`config`] – Flags, environment and directory discovery, frozen into one `Config`
//! - [`package`] – Command line package specs and their resolution sandboxes
//! - [`env`] – Environment for `go` subprocesses (proxy mode, `GOFLAGS`)
//! - [`toolchain`] – The `go` subprocess seam
//! - [`resolve`] – Two-phase (local cache, then network) resolution to main packages
//! - [`cache`] – Escaped, collision-free layout of the binary cache
//! - [`install`] – Building into the cache and acting on the result
//! - [`pipeline`] – The whole run, from arguments to installed binaries
//! - [`log`] – Diagnostics on stderr

pub mod config;
pub mod package;
pub mod env;
pub mod toolchain;
pub mod resolve;
pub mod cache;
pub mod install;
pub mod pipeline;
pub mod log;

#[cfg(test)]
mod testutil;

pub use config::*;
pub use package::*;
pub use env::*;
pub use toolchain::*;
pub use resolve::*;
pub use cache::*;
pub use install::*;
pub use pipeline::*;
