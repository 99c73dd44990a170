//! Errors raised while loading or saving a netlist.

use std::io;

/// Errors that can occur when reading or writing a netlist file.
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    /// The netlist file could not be read or written.
    #[error("failed to access netlist: {0}")]
    Io(#[from] io::Error),

    /// The JSON text does not describe a netlist.
    #[error("malformed netlist: {0}")]
    Json(#[from] serde_json::Error),

    /// A cross reference names a node, pin or net the netlist does not hold.
    #[error("{owner} refers to {target}, which does not exist")]
    DanglingId {
        /// The entity holding the reference, e.g. `pin p4`.
        owner: String,
        /// The missing entity, e.g. `net w9`.
        target: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_io() {
        let err = NetlistError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "failed to access netlist: gone");
    }

    #[test]
    fn display_json() {
        let json_err = serde_json::from_str::<u32>("{").unwrap_err();
        let err = NetlistError::from(json_err);
        assert!(err.to_string().starts_with("malformed netlist:"));
    }

    #[test]
    fn display_dangling_id() {
        let err = NetlistError::DanglingId {
            owner: "pin p0".into(),
            target: "net w7".into(),
        };
        assert_eq!(err.to_string(), "pin p0 refers to net w7, which does not exist");
    }
}
