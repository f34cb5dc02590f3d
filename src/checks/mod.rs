//! Health checks for `nightly-rail doctor`
//!
//! # Built-in Checks
//!
//! - **config**: nightly.toml loads, validates and pins a toolchain
//! - **toolchain**: a matching interpreter is available
//! - **credential**: the publish secret is present
//! - **identity**: the current repository passes the gate
//! - **history**: the checkout has full history
//! - **index-reachable**: the package index answers (thorough only)

mod config;
mod credential;
mod history;
mod identity;
mod index;
mod runner;
mod toolchain;
mod trait_def;

pub use runner::create_default_runner;
pub use trait_def::{CheckContext, Severity};
