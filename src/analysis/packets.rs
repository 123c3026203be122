use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use crate::Result;

/// Fields requested from `tshark -T json -e ...` for packet summaries.
pub const SUMMARY_FIELDS: &[&str] = &[
    "frame.number",
    "frame.time",
    "frame.protocols",
    "ip.src",
    "ip.dst",
    "tcp.srcport",
    "tcp.dstport",
    "udp.srcport",
    "udp.dstport",
    "tcp.flags",
    "http.host",
    "http.request.uri",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_flags: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Distinct addresses, URLs and protocols in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficOverview {
    pub ips: Vec<String>,
    pub urls: Vec<String>,
    pub protocols: Vec<String>,
}

/// Parses a `tshark -T json` export into packet summaries.
///
/// The document as a whole must be a JSON array; elements without a `_source.layers`
/// object are skipped. Empty output (no packets) yields an empty list.
pub fn parse_packets(json: &str) -> Result<Vec<PacketSummary>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    
    let records: Vec<Value> = serde_json::from_str(json)?;
    let total = records.len();
    
    let packets: Vec<PacketSummary> = records
        .iter()
        .filter_map(|record| record.pointer("/_source/layers")?.as_object())
        .map(summarize_layers)
        .collect();
    
    if packets.len() < total {
        log::debug!("Skipped {} records without layers", total - packets.len());
    }
    
    Ok(packets)
}

fn summarize_layers(layers: &Map<String, Value>) -> PacketSummary {
    let field = |name: &str| lookup(layers, name);
    
    let url = match (field("http.host"), field("http.request.uri")) {
        (Some(host), Some(uri)) => Some(format!("http://{}{}", host, uri)),
        _ => None,
    };
    
    PacketSummary {
        frame_number: field("frame.number"),
        time: field("frame.time"),
        src_ip: field("ip.src"),
        dst_ip: field("ip.dst"),
        src_port: field("tcp.srcport").or_else(|| field("udp.srcport")),
        dst_port: field("tcp.dstport").or_else(|| field("udp.dstport")),
        tcp_flags: field("tcp.flags"),
        protocols: field("frame.protocols")
            .map(|stack| stack.split(':').map(str::to_string).collect())
            .unwrap_or_default(),
        url,
    }
}

/// Finds a dotted field either at the top of `layers` (`-e` exports) or inside the
/// per-protocol objects of a full export. Multi-valued fields yield their first value.
fn lookup(layers: &Map<String, Value>, name: &str) -> Option<String> {
    if let Some(value) = layers.get(name).and_then(first_scalar) {
        return Some(value);
    }
    
    layers
        .values()
        .filter_map(Value::as_object)
        .find_map(|nested| lookup(nested, name))
}

fn first_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(first_scalar),
        _ => None,
    }
}

pub fn overview(packets: &[PacketSummary]) -> TrafficOverview {
    let mut overview = TrafficOverview::default();
    let mut seen_ips = HashSet::new();
    let mut seen_urls = HashSet::new();
    let mut seen_protocols = HashSet::new();
    
    for packet in packets {
        for ip in [&packet.src_ip, &packet.dst_ip].into_iter().flatten() {
            if seen_ips.insert(ip.clone()) {
                overview.ips.push(ip.clone());
            }
        }
        
        if let Some(ref url) = packet.url {
            if seen_urls.insert(url.clone()) {
                overview.urls.push(url.clone());
            }
        }
        
        for protocol in &packet.protocols {
            if seen_protocols.insert(protocol.clone()) {
                overview.protocols.push(protocol.clone());
            }
        }
    }
    
    overview
}

#[cfg(test)]
mod tests {
    use super::*;
    
    const EXPORT: &str = r#"[
  {
    "_index": "packets-2024-01-01",
    "_source": {
      "layers": {
        "frame.number": ["1"],
        "frame.time": ["Jan  1, 2024 10:00:00.000000000 UTC"],
        "frame.protocols": ["eth:ethertype:ip:tcp:http"],
        "ip.src": ["192.168.1.5"],
        "ip.dst": ["93.184.216.34"],
        "tcp.srcport": ["51234"],
        "tcp.dstport": ["80"],
        "tcp.flags": ["0x0018"],
        "http.host": ["example.com"],
        "http.request.uri": ["/index.html"]
      }
    }
  },
  { "_index": "broken" },
  {
    "_source": {
      "layers": {
        "frame.number": ["3"],
        "ip.src": ["10.0.0.1", "10.0.0.2"],
        "udp.srcport": ["53"],
        "udp.dstport": ["40000"],
        "frame.protocols": ["eth:ethertype:ip:udp:dns"]
      }
    }
  }
]"#;
    
    #[test]
    fn test_fields_selected() {
        let packets = parse_packets(EXPORT).unwrap();
        let first = &packets[0];
        
        assert_eq!(first.frame_number.as_deref(), Some("1"));
        assert_eq!(first.src_ip.as_deref(), Some("192.168.1.5"));
        assert_eq!(first.dst_port.as_deref(), Some("80"));
        assert_eq!(first.tcp_flags.as_deref(), Some("0x0018"));
        assert_eq!(first.protocols, vec!["eth", "ethertype", "ip", "tcp", "http"]);
        assert_eq!(first.url.as_deref(), Some("http://example.com/index.html"));
    }
    
    #[test]
    fn test_malformed_elements_skipped() {
        let packets = parse_packets(EXPORT).unwrap();
        
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].frame_number.as_deref(), Some("3"));
    }
    
    #[test]
    fn test_multi_valued_takes_first_and_udp_ports() {
        let packets = parse_packets(EXPORT).unwrap();
        let second = &packets[1];
        
        assert_eq!(second.src_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(second.src_port.as_deref(), Some("53"));
        assert!(second.url.is_none());
        assert!(second.tcp_flags.is_none());
    }
    
    #[test]
    fn test_nested_layers() {
        let json = r#"[{"_source":{"layers":{"frame":{"frame.number":"7"},"ip":{"ip.src":"1.2.3.4"}}}}]"#;
        let packets = parse_packets(json).unwrap();
        
        assert_eq!(packets[0].frame_number.as_deref(), Some("7"));
        assert_eq!(packets[0].src_ip.as_deref(), Some("1.2.3.4"));
    }
    
    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_packets("[{\"_source\":").is_err());
        assert!(parse_packets("{\"not\": \"an array\"}").is_err());
    }
    
    #[test]
    fn test_empty_output() {
        assert!(parse_packets("").unwrap().is_empty());
        assert!(parse_packets("[\n]").unwrap().is_empty());
    }
    
    #[test]
    fn test_missing_fields_omitted_when_serialized() {
        let json = serde_json::to_string(&PacketSummary {
            frame_number: Some("1".to_string()),
            ..Default::default()
        }).unwrap();
        
        assert_eq!(json, r#"{"frame_number":"1"}"#);
    }
    
    #[test]
    fn test_overview() {
        let packets = parse_packets(EXPORT).unwrap();
        let summary = overview(&packets);
        
        assert_eq!(summary.ips, vec!["192.168.1.5", "93.184.216.34", "10.0.0.1"]);
        assert_eq!(summary.urls, vec!["http://example.com/index.html"]);
        assert_eq!(summary.protocols, vec!["eth", "ethertype", "ip", "tcp", "http", "udp", "dns"]);
    }
}
