//! Memory initialization (`.mif`) files.
//!
//! ```text
//! -- 4 words of 8 bits
//! WIDTH=8;
//! DEPTH=4;
//! ADDRESS_RADIX=HEX;
//! DATA_RADIX=BIN;
//! CONTENT BEGIN
//!   0 : 00000001;
//!   3 : 10000000;
//! END;
//! ```
//!
//! Parsing is case-insensitive and ignores whitespace, `--` line comments
//! and `%...%` block comments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gsim_common::Logic;
use num_bigint::BigUint;

use crate::error::SimError;
use crate::memory::MemoryArray;

/// Name of the file holding a memory's contents: the node name after its
/// last `+`, with a `.mif` extension. Memories named without a `+` have no
/// contents file.
pub fn mif_file_name(node_name: &str) -> Option<String> {
    let (_, base) = node_name.rsplit_once('+')?;
    Some(format!("{base}.mif"))
}

/// Path searched for a memory's contents inside `dir`.
pub fn mif_path(dir: &Path, node_name: &str) -> Option<PathBuf> {
    mif_file_name(node_name).map(|name| dir.join(name))
}

/// Loads `path` into `memory`.
///
/// Returns `Ok(false)` if the file does not exist.
pub fn load_mif(path: &Path, memory: &mut MemoryArray) -> Result<bool, SimError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let file = path.display().to_string();
    for (address, row) in parse_mif(&text, &file, memory.width(), memory.addr_width())? {
        memory.store(address, &row);
    }
    Ok(true)
}

/// Parses MIF text into `(address, row)` pairs with rows LSB first.
///
/// `file` only labels errors.
pub fn parse_mif(text: &str, file: &str, width: usize, addr_width: u32) -> Result<Vec<(u64, Vec<Logic>)>, SimError> {
    let error = |line: usize, reason: String| SimError::MifError {
        file: file.to_string(),
        line,
        reason,
    };

    let mut symbols: HashMap<String, String> = HashMap::new();
    let mut radix: Option<(u32, u32)> = None;
    let mut previous = String::new();
    let mut entries = Vec::new();

    for (index, line) in strip(text).into_iter().enumerate() {
        let number = index + 1;
        if line.is_empty() {
            continue;
        }

        if let Some((addr_radix, data_radix)) = radix {
            if line == "END;" {
                return Ok(entries);
            }
            let (address, data) = line
                .strip_suffix(';')
                .and_then(|body| body.split_once(':'))
                .ok_or_else(|| error(number, format!("syntax error: {line}")))?;
            let address = BigUint::parse_bytes(address.as_bytes(), addr_radix)
                .ok_or_else(|| error(number, format!("address {address} is not a base {addr_radix} number")))?;
            let value = BigUint::parse_bytes(data.as_bytes(), data_radix)
                .ok_or_else(|| error(number, format!("data {data} is not a base {data_radix} number")))?;
            let address = u64::try_from(&address)
                .ok()
                .filter(|&a| a < depth(addr_width))
                .ok_or_else(|| error(number, format!("address {address} is out of range")))?;
            let row = (0..width)
                .map(|bit| Logic::from_bool(value.bit(bit as u64)))
                .collect();
            entries.push((address, row));
        } else if line == "CONTENTBEGIN" || (line == "BEGIN" && previous == "CONTENT") {
            radix = Some(check_header(&symbols, width, addr_width).map_err(|reason| error(number, reason))?);
        } else if line == "CONTENT" {
            // BEGIN follows on the next line.
        } else {
            let (symbol, value) = line
                .strip_suffix(';')
                .and_then(|body| body.split_once('='))
                .ok_or_else(|| error(number, format!("syntax error: {line}")))?;
            symbols.insert(symbol.to_string(), value.to_string());
        }
        previous = line;
    }

    match radix {
        Some(_) => Ok(entries),
        None => Err(error(0, "missing CONTENT BEGIN".to_string())),
    }
}

fn depth(addr_width: u32) -> u64 {
    1u64.checked_shl(addr_width).unwrap_or(u64::MAX)
}

/// Validates the header symbols and returns the address and data radices.
fn check_header(symbols: &HashMap<String, String>, width: usize, addr_width: u32) -> Result<(u32, u32), String> {
    let number = |name: &str| -> Result<u64, String> {
        let value = symbols
            .get(name)
            .ok_or_else(|| format!("{name} parameter unspecified"))?;
        value
            .parse::<u64>()
            .map_err(|_| format!("{name} must be a decimal number, got {value}"))
    };
    let radix = |name: &str| -> Result<u32, String> {
        match symbols.get(name).map(String::as_str) {
            Some("HEX") => Ok(16),
            Some("DEC") => Ok(10),
            Some("OCT") => Ok(8),
            Some("BIN") => Ok(2),
            _ => Err(format!("invalid or missing {name}: must specify DEC, HEX, OCT, or BIN")),
        }
    };

    let declared_width = number("WIDTH")?;
    if declared_width != width as u64 {
        return Err(format!("width mismatch: must be {width} but {declared_width} was given"));
    }
    let declared_depth = number("DEPTH")?;
    if declared_depth != depth(addr_width) {
        return Err(format!(
            "depth mismatch: must be {} but {declared_depth} was given",
            depth(addr_width)
        ));
    }
    Ok((radix("ADDRESS_RADIX")?, radix("DATA_RADIX")?))
}

/// Removes comments and whitespace and upper-cases the text, keeping line
/// boundaries so errors can point at the original line.
fn strip(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut in_block = false;
    for raw in text.lines() {
        let mut line = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if in_block {
                in_block = c != '%';
            } else if c == '-' && chars.peek() == Some(&'-') {
                break;
            } else if c == '%' {
                in_block = true;
            } else if !c.is_whitespace() {
                line.push(c.to_ascii_uppercase());
            }
        }
        lines.push(line);
    }
    lines
}
