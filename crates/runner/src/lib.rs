//! Code runners for Tasksmith.
//!
//! All runners implement the `tasksmith_core::CodeRunner` trait.
//! Each invocation runs in a fresh interpreter process with a wall-clock
//! limit, so generated units never share state and a hung unit cannot
//! stall the pipeline.

pub mod harness;
pub mod python;

pub use python::{defines_top_level_function, PythonRunner};
