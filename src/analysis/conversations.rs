use serde::{Deserialize, Serialize};
use super::tabular::{self, Row};

const ARROW: &str = "<->";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    pub endpoint_a: String,
    pub endpoint_b: String,
    pub frames: u64,
    pub bytes: u64,
    pub frames_b_to_a: u64,
    pub bytes_b_to_a: u64,
    pub frames_a_to_b: u64,
    pub bytes_a_to_b: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Normalizes `tshark -qz conv,tcp` (or `conv,udp`) tables.
///
/// Lines without `<->` are headers and are skipped. Numeric columns are read left to
/// right: `<-` frames/bytes, `->` frames/bytes, total frames/bytes, then optional
/// relative start and duration. Rows with fewer than six counts are skipped.
pub fn parse_conversations(text: &str) -> Vec<ConversationRow> {
    tabular::rows(text, ARROW).filter_map(|row| parse_row(&row)).collect()
}

fn parse_row(row: &Row<'_>) -> Option<ConversationRow> {
    if row.len() < 2 {
        return None;
    }
    let endpoint_a = row.field(0).trim().to_string();
    
    let mut tokens = row.field(1).split_whitespace();
    let endpoint_b = tokens.next()?.to_string();
    let values = numeric_columns(tokens);
    
    if endpoint_a.is_empty() || values.len() < 6 {
        log::debug!("Skipping conversation row: {}", row.fields().join(ARROW).trim());
        return None;
    }
    
    let count = |i: usize| values[i] as u64;
    
    Some(ConversationRow {
        endpoint_a,
        endpoint_b,
        frames: count(4),
        bytes: count(5),
        frames_b_to_a: count(0),
        bytes_b_to_a: count(1),
        frames_a_to_b: count(2),
        bytes_a_to_b: count(3),
        relative_start: values.get(6).copied(),
        duration: values.get(7).copied(),
    })
}

/// Collects numbers in order. Thousands separators are stripped and a trailing unit
/// token (`bytes`, `kB`, `MB`, `GB`) scales the number before it.
fn numeric_columns<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<f64> {
    let mut values: Vec<f64> = Vec::new();
    
    for token in tokens {
        let multiplier = match token {
            "bytes" => Some(1.0),
            "kB" => Some(1_000.0),
            "MB" => Some(1_000_000.0),
            "GB" => Some(1_000_000_000.0),
            _ => None,
        };
        
        if let Some(multiplier) = multiplier {
            if let Some(last) = values.last_mut() {
                *last *= multiplier;
            }
            continue;
        }
        
        if let Ok(value) = token.replace(',', "").parse::<f64>() {
            values.push(value);
        }
    }
    
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    
    const CONV: &str = "\
================================================================================
TCP Conversations
Filter:<No Filter>
                                               |       <-      | |       ->      | |     Total     |    Relative    |   Duration   |
                                               | Frames  Bytes | | Frames  Bytes | | Frames  Bytes |      Start     |              |
192.168.1.5:51234          <-> 93.184.216.34:443         12      3456      10      1024      22      4480     0.120000000         1.5000
10.0.0.2:22                <-> 10.0.0.9:60000             4 1,200 bytes      3 2 kB      7 3,200 bytes     0.500000000         0.2500
================================================================================
";
    
    #[test]
    fn test_rows_parsed_positionally() {
        let rows = parse_conversations(CONV);
        
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].endpoint_a, "192.168.1.5:51234");
        assert_eq!(rows[0].endpoint_b, "93.184.216.34:443");
        assert_eq!(rows[0].frames_b_to_a, 12);
        assert_eq!(rows[0].bytes_b_to_a, 3456);
        assert_eq!(rows[0].frames_a_to_b, 10);
        assert_eq!(rows[0].bytes_a_to_b, 1024);
        assert_eq!(rows[0].frames, 22);
        assert_eq!(rows[0].bytes, 4480);
        assert_eq!(rows[0].duration, Some(1.5));
    }
    
    #[test]
    fn test_units_and_separators() {
        let rows = parse_conversations(CONV);
        
        assert_eq!(rows[1].bytes_b_to_a, 1200);
        assert_eq!(rows[1].bytes_a_to_b, 2000);
        assert_eq!(rows[1].frames, 7);
        assert_eq!(rows[1].bytes, 3200);
    }
    
    #[test]
    fn test_rows_without_arrow_skipped() {
        let rows = parse_conversations("TCP Conversations\n| Frames Bytes |\n");
        assert!(rows.is_empty());
    }
    
    #[test]
    fn test_short_row_skipped() {
        let rows = parse_conversations("1.1.1.1:1 <-> 2.2.2.2:2 5 100\n");
        assert!(rows.is_empty());
    }
}
