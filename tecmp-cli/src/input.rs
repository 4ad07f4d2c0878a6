//! Hex-dump input parsing
//!
//! Captures exported from packet tools usually arrive as one TECMP message per
//! line, hex encoded. Blank lines and lines starting with `#` are ignored, and
//! whitespace inside a line is allowed between bytes.

use anyhow::{Context, Result};

/// Parse every non-comment line into message bytes
///
/// Each result is paired with its 1-based line number so failures can be reported
/// without stopping the remaining lines.
pub fn parse_hex_lines(content: &str) -> Vec<(usize, Result<Vec<u8>>)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some((index + 1, parse_hex_line(line)))
        })
        .collect()
}

fn parse_hex_line(line: &str) -> Result<Vec<u8>> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.strip_prefix("0x").unwrap_or(&compact);
    hex::decode(compact).with_context(|| format!("Invalid hex message: {:.32}", line))
}
