//! Hex packet-dump reading: the line-oriented capture format the test
//! harness feeds the dissector (whitespace-separated hex byte tokens, one
//! TCP payload per line).

use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Parse one dump line. Returns `None` when any token is not a hex byte;
/// a blank line parses to an empty payload.
pub fn parse_hex_line(line: &str) -> Option<Vec<u8>> {
    line.split_whitespace()
        .map(|token| u8::from_str_radix(token, 16).ok())
        .collect()
}

/// Read every payload from a dump file. Blank lines yield no packet and
/// lines with non-hex tokens are skipped.
pub fn read_packets<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
    let contents = std::fs::read_to_string(path)?;
    let mut packets = Vec::new();
    for line in contents.lines() {
        match parse_hex_line(line) {
            Some(packet) if !packet.is_empty() => packets.push(packet),
            Some(_) => {}
            None => debug!("skipping non-hex dump line"),
        }
    }
    Ok(packets)
}

/// Read only the payloads at the given 1-based line numbers, in the order
/// requested. Out-of-range numbers are ignored.
pub fn packets_by_line<P: AsRef<Path>>(path: P, line_numbers: &[usize]) -> Result<Vec<Vec<u8>>> {
    let contents = std::fs::read_to_string(path)?;
    let lines: Vec<&str> = contents.lines().collect();

    let mut packets = Vec::new();
    for &number in line_numbers {
        if number == 0 || number > lines.len() {
            continue;
        }
        if let Some(packet) = parse_hex_line(lines[number - 1]) {
            if !packet.is_empty() {
                packets.push(packet);
            }
        }
    }
    Ok(packets)
}
