//! Core building blocks shared by the pipeline and the commands
//!
//! - **config**: nightly.toml parsing and validation
//! - **error**: Error types with contextual help messages and exit codes
//! - **process**: Subprocess invocation behind a mockable runner
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod config;
pub mod error;
pub mod process;
pub mod vcs;
