//! Core logic: spec types, parsing, interpolation, guards, context, planning, execution.

pub mod condition;
pub mod context;
pub mod executor;
pub mod parser;
pub mod planner;
pub mod platform;
pub mod repo;
pub mod resolver;
pub mod types;
