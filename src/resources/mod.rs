//! Step action handlers, one module per action kind.
//!
//! Each handler honors dry-run by printing what it would do and touching
//! nothing, and reports how many failures `continue_on_error` absorbed.

pub mod command;
pub mod file;
pub mod repos;
