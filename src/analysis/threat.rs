use std::collections::HashSet;
use super::tabular::{self, TAB};

/// Fields exported to collect observed addresses.
pub const ADDRESS_FIELDS: &[&str] = &["ip.src", "ip.dst"];

/// Known-bad indicators, matched by exact string only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    entries: HashSet<String>,
}

impl Blacklist {
    /// One indicator per line; blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        
        Self { entries }
    }
    
    pub fn contains(&self, indicator: &str) -> bool {
        self.entries.contains(indicator.trim())
    }
    
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every address in a tab-separated field export, deduplicated, in order of first
/// appearance. Multi-valued cells (`a,b`) contribute each value.
pub fn observed_addresses(text: &str) -> Vec<String> {
    let cells = tabular::rows(text, TAB)
        .flat_map(|row| row.fields().to_vec())
        .flat_map(|cell| cell.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty());
    
    dedup_in_order(cells)
}

/// Observed addresses that are blacklisted, without duplicates, in observed order.
pub fn correlate<'a, I>(observed: I, blacklist: &Blacklist) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    dedup_in_order(
        observed
            .into_iter()
            .map(str::trim)
            .filter(|address| blacklist.contains(address)),
    )
}

fn dedup_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}
