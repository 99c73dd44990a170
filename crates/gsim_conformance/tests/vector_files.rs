//! Vector file handling end to end: headers, row shapes, reference
//! comparison and memory contents loaded from disk.

use std::fs;
use std::io::Cursor;

use gsim_conformance::{accumulator, register, run_generated, run_vectors, single_port_ram};
use gsim_netlist::EdgeSensitivity;
use gsim_sim::vectors::Finding;
use gsim_sim::warnings::{MIF_MISSING, VECTOR_EQUIVALENT};
use gsim_sim::{simulate, verify_vectors, RunFiles, SimConfig, SimError, VectorInput};

#[test]
fn header_in_the_wrong_order_is_rejected() {
    let err = run_vectors(register(EdgeSensitivity::Rising), SimConfig::default(), "d clk\n0 1\n")
        .err()
        .unwrap();
    match err {
        SimError::VectorHeaderMismatch { expected, found } => {
            assert_eq!(expected, "clk d");
            assert_eq!(found, "d clk");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn short_row_reports_its_file_line() {
    let err = run_vectors(
        register(EdgeSensitivity::Rising),
        SimConfig::default(),
        "clk d\n0 1\n\n1\n",
    )
    .err()
    .unwrap();
    match err {
        SimError::VectorLineCount {
            line, expected, found, ..
        } => {
            assert_eq!(line, 4);
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_without_vectors_is_an_error() {
    let err = run_vectors(register(EdgeSensitivity::Rising), SimConfig::default(), "clk d\n")
        .err()
        .unwrap();
    assert!(matches!(err, SimError::VectorExhausted { .. }));
}

#[test]
fn unknown_reference_bits_accept_any_output() {
    let reference = "acc   parity\nxxxx x\nxxxx 1\n";
    let produced = "acc parity\n0X3 0\n0X4 1\n";
    let report = verify_vectors(Cursor::new(reference), Cursor::new(produced)).unwrap();
    assert!(report.passed());
    assert_eq!(report.compared, 2);
    assert_eq!(report.findings.len(), 2);
    assert!(report
        .findings
        .iter()
        .all(|f| matches!(f, Finding::Equivalent { .. })));
}

#[test]
fn simulated_output_matches_its_own_file() {
    let result = run_vectors(
        accumulator(3),
        SimConfig::default(),
        "clk x\n1 001\n0 010\n1 011\n0 100\n",
    )
    .unwrap();
    let mut produced = result.header.clone();
    for row in &result.rows {
        produced.push('\n');
        produced.push_str(row);
    }
    let report = verify_vectors(Cursor::new(produced.clone()), Cursor::new(produced)).unwrap();
    assert!(report.passed());
    assert!(report.findings.is_empty());
    assert_eq!(report.compared, 4);
}

#[test]
fn memory_contents_load_from_mif_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("table.mif"),
        "-- two programmed rows\n\
         WIDTH=4;\n\
         DEPTH=4;\n\
         ADDRESS_RADIX=HEX;\n\
         DATA_RADIX=BIN;\n\
         CONTENT BEGIN\n\
         \t1 : 1010;\n\
         \t2 : 0011;\n\
         END;\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("in.vec"),
        "clk addr data we\n0 01 0x0 0\n0 10 0x0 0\n0 00 0x0 0\n0 11 0x0 0\n",
    )
    .unwrap();
    // The first vector is left as don't-care to exercise equivalence.
    fs::write(
        dir.path().join("golden.vec"),
        "out\nxxxx\n0X3\nxxxx\nxxxx\n",
    )
    .unwrap();

    let config = SimConfig {
        mif_dir: Some(dir.path().to_path_buf()),
        ..SimConfig::default()
    };
    let mut files = RunFiles::new(
        VectorInput::File(dir.path().join("in.vec")),
        dir.path().join("out.vec"),
    );
    files.expected = Some(dir.path().join("golden.vec"));

    let result = simulate(single_port_ram(2, 4), &config, &files).unwrap();
    let out = fs::read_to_string(dir.path().join("out.vec")).unwrap();
    assert_eq!(out, "out\n0Xa\n0X3\nxxxx\nxxxx\n");

    let verification = result.verification.unwrap();
    assert!(verification.passed());
    assert_eq!(verification.compared, 4);
    assert_eq!(
        result
            .diagnostics
            .iter()
            .filter(|d| d.code == VECTOR_EQUIVALENT)
            .count(),
        1
    );
    assert!(result.diagnostics.iter().all(|d| d.code != MIF_MISSING));
}

#[test]
fn malformed_mif_fails_before_simulating() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("table.mif"),
        "WIDTH=8;\nDEPTH=4;\nADDRESS_RADIX=HEX;\nDATA_RADIX=HEX;\nCONTENT BEGIN\n0 : 01;\nEND;\n",
    )
    .unwrap();
    let config = SimConfig {
        mif_dir: Some(dir.path().to_path_buf()),
        ..SimConfig::default()
    };
    let err = run_vectors(single_port_ram(2, 4), config, "clk addr data we\n0 00 0x0 0\n")
        .err()
        .unwrap();
    match err {
        SimError::MifError { reason, .. } => assert!(reason.contains("width mismatch"), "{reason}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn seeded_generation_is_reproducible() {
    let config = || SimConfig {
        num_vectors: 32,
        ..SimConfig::default()
    };
    let first = run_generated(accumulator(4), config(), 7).unwrap();
    let second = run_generated(accumulator(4), config(), 7).unwrap();
    assert_eq!(first.rows.len(), 32);
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.summary, second.summary);
}
