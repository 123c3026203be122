use serde::{Deserialize, Serialize};
use super::tabular;

const FRAMES_LABEL: &str = "frames:";
const BYTES_LABEL: &str = "bytes:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStatRow {
    pub protocol: String,
    pub frames: u64,
    pub bytes: u64,
    pub depth: usize,
}

/// Normalizes `tshark -qz io,phs` output.
///
/// Depth comes from leading whitespace divided by `indent_unit` (a tab counts as one
/// full unit). Lines without parsable `frames:`/`bytes:` counts are dropped, which also
/// takes care of the banner, title and `Filter:` lines.
pub fn parse_hierarchy(text: &str, indent_unit: usize) -> Vec<ProtocolStatRow> {
    let unit = indent_unit.max(1);
    let mut rows: Vec<ProtocolStatRow> = Vec::new();
    
    // Splitting on the frames label leaves `<indent><name><padding>` and `N bytes:M`.
    for row in tabular::rows(text, FRAMES_LABEL) {
        if row.len() < 2 {
            continue;
        }
        
        let name_column = row.field(0);
        let counts = row.field(1);
        
        let frames = match leading_count(counts) {
            Some(frames) => frames,
            None => continue,
        };
        let bytes = match counts.find(BYTES_LABEL).and_then(|i| leading_count(&counts[i + BYTES_LABEL.len()..])) {
            Some(bytes) => bytes,
            None => continue,
        };
        let protocol = match name_column.split_whitespace().next() {
            Some(token) => token.to_string(),
            None => continue,
        };
        
        let depth = indent_width(name_column, unit) / unit;
        if let Some(previous) = rows.last() {
            if depth > previous.depth + 1 {
                log::warn!(
                    "Protocol hierarchy skips levels at '{}' (depth {} after {})",
                    protocol, depth, previous.depth
                );
            }
        }
        
        rows.push(ProtocolStatRow {
            protocol,
            frames,
            bytes,
            depth,
        });
    }
    
    rows
}

fn indent_width(line: &str, unit: usize) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { unit } else { 1 })
        .sum()
}

fn leading_count(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
