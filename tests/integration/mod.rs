//! Integration tests for nightly-rail
//!
//! These drive the built binary against temporary checkouts. None of them
//! reach a package index: runs either skip at the gate or stop at a dry run.

mod helpers;

mod test_doctor;
mod test_init;
mod test_run;
mod test_schedule;
