//! forgesetup: declarative developer-machine bootstrap.
//!
//! Reads a YAML spec of inputs, environment and ordered steps, resolves the
//! host OS, and runs common then OS-specific steps: writing files, cloning
//! repositories and executing commands.

pub mod cli;
pub mod core;
pub mod error;
pub mod resources;
pub mod transport;
