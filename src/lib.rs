//! `georisk-lag` library crate.
//!
//! The binary (`georisk`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - every stage (loaders, unifier, analytics) is reusable on its own
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod unify;
