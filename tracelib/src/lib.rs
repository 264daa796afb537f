//! # TraceLib
//!
//! Tracelib is a library for studying cache behaviour of loop nests without running real code
//!
//! Programs are described as nested loops of array assignments, with loop bounds and array indices
//! given as small formulas over the loop variables. Running a program generates the exact sequence
//! of memory accesses the loop nest would make, which is fed through a set-associative cache model
//! to count hits and misses
//!
//! Formulas are evaluated by a deliberately tiny arithmetic and comparison grammar, so a scenario
//! file can never cause anything other than arithmetic to run

/// Contains the error type shared by every part of the library
pub mod error;

/// Contains the restricted expression evaluator
pub mod eval;

/// Contains formula templates, which bind loop variables into expressions before evaluation
pub mod formula;

/// Contains the program model: arrays, element accesses, statements, loops, and bodies
pub mod program;

/// Contains the implementation of the cache, and the trait used to receive accesses
pub mod cache;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the trace file format, for recording and replaying access sequences
pub mod trace;

/// Contains definitions for the JSON scenario format
pub mod config;

/// Contains the simulator used to run a scenario and collect its results
pub mod simulator;

/// Contains helpers for reading trace files from disk
pub mod io;

#[cfg(test)]
mod test;

/// Contains the reference scenarios, for running tests and benchmarks.
pub mod util;
