//! Simulation error types.
//!
//! Every condition that aborts a run is a variant of [`SimError`]. Recoverable
//! problems are reported as warnings through the session's diagnostic sink
//! instead; see [`crate::warnings`].

use std::io;

use crate::store::Cycle;

/// Errors that stop a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A node's pins disagree with the nets they are attached to.
    #[error("node '{node}' is mismapped: {reason}")]
    MismappedNode {
        /// Name of the node whose fanout could not be followed.
        node: String,
        /// What was inconsistent.
        reason: String,
        /// Names of the node and its nearest drivers, nearest first.
        ancestry: String,
    },

    /// A node is still waiting for values that will never arrive.
    #[error("node '{node}' stalled at cycle {cycle}: input '{pin}' last updated at cycle {last}")]
    ScheduleStall {
        /// Name of the stalled node.
        node: String,
        /// Name of the input pin that lags behind.
        pin: String,
        /// Cycle being simulated.
        cycle: Cycle,
        /// Last cycle the pin was written, or -1 if never.
        last: i64,
        /// The backward update trace from the stalled node.
        trace: String,
    },

    /// A node kind the evaluator has no semantics for.
    #[error("node '{node}' of type {kind} cannot be simulated")]
    UnsupportedNode {
        /// Name of the node.
        node: String,
        /// Display name of its kind.
        kind: String,
    },

    /// A pin was written twice for the same cycle.
    #[error("pin '{pin}' already holds a value for cycle {cycle}")]
    WriteOnceViolation {
        /// Name of the pin.
        pin: String,
        /// The cycle written twice.
        cycle: Cycle,
    },

    /// A vector file header names lines in the wrong order or count.
    #[error("vector file header does not match the netlist: expected '{expected}', found '{found}'")]
    VectorHeaderMismatch {
        /// Line names taken from the netlist.
        expected: String,
        /// Line names read from the file.
        found: String,
    },

    /// A vector row carries the wrong number of values.
    #[error("{source_name}:{line}: expected {expected} values, found {found}")]
    VectorLineCount {
        /// The vector file.
        source_name: String,
        /// One-based line number in the file.
        line: usize,
        /// Number of lines in the header.
        expected: usize,
        /// Number of values on the row.
        found: usize,
    },

    /// A vector value token could not be parsed.
    #[error("{source_name}:{line}: invalid vector value '{token}'")]
    VectorParse {
        /// The vector file.
        source_name: String,
        /// One-based line number in the file.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// An input vector file ended before its first vector.
    #[error("input vector file '{source_name}' contains no vectors")]
    VectorExhausted {
        /// The vector file.
        source_name: String,
    },

    /// A memory-initialization file is malformed.
    #[error("{file}:{line}: {reason}")]
    MifError {
        /// The `.mif` file.
        file: String,
        /// One-based line number of the offending statement.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A node's pin layout does not fit its kind.
    #[error("node '{node}' is malformed: {reason}")]
    MalformedNode {
        /// Name of the node.
        node: String,
        /// What was wrong.
        reason: String,
    },

    /// The netlist refers to pins, nets or nodes it does not contain.
    #[error(transparent)]
    Netlist(#[from] gsim_netlist::NetlistError),

    /// The worker thread pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
