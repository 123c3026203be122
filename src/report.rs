//! Text bodies returned by the tools. Every list-shaped section goes through
//! [`bound_list`] or [`bound_joined`] so the whole response stays within the
//! configured budget.

use serde::Serialize;
use crate::analysis::{
    bound_joined, bound_list, packets, ConversationRow, Extraction, PacketSummary, ProtocolStatRow,
};
use crate::{ProbeError, Result};

/// Room kept for the truncation note appended after a bounded section.
const NOTE_RESERVE: usize = 96;

/// Room kept for the `(+N more)` suffix of a cut header list.
const MORE_RESERVE: usize = 32;

const NONE: &str = "None";

/// `header`, a newline, then `items` as a JSON array cut to fit `max_chars` overall.
pub fn bounded_section<T: Serialize>(header: &str, items: &[T], max_chars: usize) -> Result<String> {
    let budget = max_chars.saturating_sub(header.len() + 1 + NOTE_RESERVE);
    let payload = bound_list(items, budget)?;
    
    let mut text = format!("{}\n{}", header, payload.text);
    if payload.truncated {
        text.push_str(&format!(
            "\n\n[Output truncated: showing {} of {} entries]",
            payload.kept, payload.total
        ));
    }
    
    ensure_within(text, max_chars)
}

/// `values` joined with `", "` in at most `max_len` bytes, or `None` when empty.
fn joined_list(values: &[String], max_len: usize) -> String {
    if values.is_empty() {
        return NONE.to_string();
    }
    
    let payload = bound_joined(values, ", ", max_len.saturating_sub(MORE_RESERVE));
    let dropped = payload.total - payload.kept;
    match (payload.truncated, payload.kept) {
        (false, _) => payload.text,
        (true, 0) => format!("(+{} more)", dropped),
        (true, _) => format!("{} (+{} more)", payload.text, dropped),
    }
}

fn ensure_within(text: String, max_chars: usize) -> Result<String> {
    if text.len() > max_chars {
        log::warn!("Response of {} bytes exceeds budget of {}", text.len(), max_chars);
        return Err(ProbeError::Budget(max_chars));
    }
    Ok(text)
}

pub fn captured_packets(packets: &[PacketSummary], max_chars: usize) -> Result<String> {
    bounded_section("Captured packet data:", packets, max_chars)
}

pub fn protocol_hierarchy(rows: &[ProtocolStatRow], max_chars: usize) -> Result<String> {
    bounded_section("Protocol hierarchy statistics:", rows, max_chars)
}

pub fn conversations(rows: &[ConversationRow], max_chars: usize) -> Result<String> {
    bounded_section("TCP/UDP conversation statistics:", rows, max_chars)
}

pub fn threats(observed: &[String], matches: &[String], max_chars: usize) -> Result<String> {
    let verdict = if matches.is_empty() {
        "No threats detected".to_string()
    } else {
        format!("Potential threats: {}", joined_list(matches, max_chars / 4))
    };
    
    let header = format!("{}\n\nCaptured IPs ({}):", verdict, observed.len());
    bounded_section(&header, observed, max_chars)
}

pub fn ip_check(ip: &str, listed: bool) -> String {
    let verdict = if listed {
        "Potential threat detected"
    } else {
        "No threat detected"
    };
    format!("IP checked: {}\n{}", ip, verdict)
}

pub fn pcap_analysis(path: &str, packets: &[PacketSummary], max_chars: usize) -> Result<String> {
    let overview = packets::overview(packets);
    let list_budget = max_chars / 12;
    
    let header = format!(
        "Analyzed PCAP: {}\n\nUnique IPs:\n{}\n\nURLs:\n{}\n\nProtocols:\n{}\n\nPacket data ({} packets):",
        path,
        joined_list(&overview.ips, list_budget),
        joined_list(&overview.urls, list_budget),
        joined_list(&overview.protocols, list_budget),
        packets.len()
    );
    
    bounded_section(&header, packets, max_chars)
}

pub fn credentials(extraction: &Extraction, max_chars: usize) -> Result<String> {
    ensure_within(extraction.render_within(max_chars), max_chars)
}
