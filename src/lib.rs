//! # workbench
//!
//! This is both an application and a library: the library runs the subcommands of the
//! `workbench` binary, so that they can be used and tested from other code.

#[macro_use]
extern crate log;

pub mod commands;
pub mod error;
pub mod opt;

pub use commands::*;
pub use opt::*;
