//! Hot-update verification harness for incremental bundler builds.
//!
//! Drives a module bundler through a scripted sequence of source mutations,
//! locates the emitted bundle files after every build, and certifies that the
//! whole scripted sequence actually ran before any verdict is accepted. The
//! architecture keeps a strict separation:
//!
//! - **[`ledger`], [`target`], [`config`], [`locate`], [`gate`]**: pure,
//!   deterministic logic. No I/O, fully testable in isolation.
//! - **[`compiler`]**: boundary types and trait for the external bundler,
//!   which is a black box behind a config-in / report-out contract.
//! - **[`scenario`]**: orchestration of the sequential
//!   build -> locate -> run -> advance cycle for one test case.

pub mod compiler;
pub mod config;
pub mod gate;
pub mod ledger;
pub mod locate;
pub mod logging;
pub mod scenario;
pub mod target;
