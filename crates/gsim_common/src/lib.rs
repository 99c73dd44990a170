//! Shared foundational types used across the gsim netlist simulator.
//!
//! This crate provides the four-valued logic domain and a packed, growable
//! vector of logic values used for per-cycle histories and test vectors.

#![warn(missing_docs)]

pub mod logic;
pub mod logic_vec;

pub use logic::Logic;
pub use logic_vec::LogicVec;
