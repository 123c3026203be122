use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::OnceCell;
use crate::analysis::{
    self, credentials, packets, threat, Blacklist, CredentialExtractor,
};
use crate::config::Config;
use crate::intel::ThreatFeed;
use crate::report;
use crate::tshark::{self, TShark};
use crate::{ProbeError, Result};
use super::protocol::{CallToolResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct CaptureArgs {
    interface: Option<String>,
    duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IpArgs {
    ip: String,
}

#[derive(Debug, Deserialize)]
struct PcapArgs {
    #[serde(rename = "pcapPath")]
    pcap_path: String,
}

#[derive(Debug, Deserialize)]
struct CredentialArgs {
    #[serde(rename = "filePath")]
    file_path: String,
}

/// The tool set. Each call is independent; the only shared state is the lazily
/// located tshark binary.
pub struct ToolBox {
    config: Config,
    feed: ThreatFeed,
    tshark: OnceCell<TShark>,
    extractor: CredentialExtractor,
}

impl ToolBox {
    pub fn new(config: Config) -> Result<Self> {
        let feed = ThreatFeed::new(&config.threat)?;
        
        Ok(Self {
            config,
            feed,
            tshark: OnceCell::new(),
            extractor: CredentialExtractor::default(),
        })
    }
    
    pub fn with_tshark(config: Config, tshark: TShark) -> Result<Self> {
        let toolbox = Self::new(config)?;
        toolbox.tshark
            .set(tshark)
            .map_err(|_| ProbeError::Protocol("tshark already initialised".to_string()))?;
        Ok(toolbox)
    }
    
    pub fn definitions() -> Vec<ToolDefinition> {
        let capture_schema = json!({
            "type": "object",
            "properties": {
                "interface": {"type": "string", "description": "Network interface to capture from (e.g. eth0, en0)"},
                "duration": {"type": "integer", "description": "Capture duration in seconds", "minimum": 1}
            }
        });
        
        vec![
            ToolDefinition {
                name: "capture_packets".to_string(),
                description: "Capture live traffic and return packet summaries as JSON".to_string(),
                input_schema: capture_schema.clone(),
            },
            ToolDefinition {
                name: "get_summary_stats".to_string(),
                description: "Capture live traffic and return protocol hierarchy statistics".to_string(),
                input_schema: capture_schema.clone(),
            },
            ToolDefinition {
                name: "get_conversations".to_string(),
                description: "Capture live traffic and return TCP conversation statistics".to_string(),
                input_schema: capture_schema.clone(),
            },
            ToolDefinition {
                name: "check_threats".to_string(),
                description: "Capture live traffic and check observed IPs against the threat blacklist".to_string(),
                input_schema: capture_schema,
            },
            ToolDefinition {
                name: "check_ip_threats".to_string(),
                description: "Check a single IP address against the threat blacklist".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "ip": {"type": "string", "description": "IP address to check"}
                    },
                    "required": ["ip"]
                }),
            },
            ToolDefinition {
                name: "analyze_pcap".to_string(),
                description: "Summarize a capture file: addresses, URLs, protocols and packets".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pcapPath": {"type": "string", "description": "Path to the PCAP file"}
                    },
                    "required": ["pcapPath"]
                }),
            },
            ToolDefinition {
                name: "extract_credentials".to_string(),
                description: "Extract HTTP Basic, FTP, Telnet and Kerberos credentials from a capture file".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "filePath": {"type": "string", "description": "Path to the PCAP file"}
                    },
                    "required": ["filePath"]
                }),
            },
        ]
    }
    
    /// Runs a tool by name. Failures become an `isError` result starting with `Error:`.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> CallToolResult {
        let arguments = arguments.unwrap_or_else(|| json!({}));
        
        let outcome = match name {
            "capture_packets" => match parse_args::<CaptureArgs>(arguments) {
                Ok(args) => self.capture_packets(args.interface, args.duration).await,
                Err(e) => Err(e),
            },
            "get_summary_stats" => match parse_args::<CaptureArgs>(arguments) {
                Ok(args) => self.summary_stats(args.interface, args.duration).await,
                Err(e) => Err(e),
            },
            "get_conversations" => match parse_args::<CaptureArgs>(arguments) {
                Ok(args) => self.conversations(args.interface, args.duration).await,
                Err(e) => Err(e),
            },
            "check_threats" => match parse_args::<CaptureArgs>(arguments) {
                Ok(args) => self.check_threats(args.interface, args.duration).await,
                Err(e) => Err(e),
            },
            "check_ip_threats" => match parse_args::<IpArgs>(arguments) {
                Ok(args) => self.check_ip(&args.ip).await,
                Err(e) => Err(e),
            },
            "analyze_pcap" => match parse_args::<PcapArgs>(arguments) {
                Ok(args) => self.analyze_pcap(&args.pcap_path).await,
                Err(e) => Err(e),
            },
            "extract_credentials" => match parse_args::<CredentialArgs>(arguments) {
                Ok(args) => self.extract_credentials(&args.file_path).await,
                Err(e) => Err(e),
            },
            other => Err(ProbeError::Protocol(format!("unknown tool '{}'", other))),
        };
        
        match outcome {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                log::error!("Tool {} failed: {}", name, e);
                CallToolResult::error(e)
            }
        }
    }
    
    async fn tshark(&self) -> Result<&TShark> {
        self.tshark
            .get_or_try_init(|| TShark::locate(&self.config.capture))
            .await
    }
    
    fn max_chars(&self) -> usize {
        self.config.output.max_chars
    }
    
    async fn live_capture(&self, interface: Option<String>, duration: Option<u64>) -> Result<tshark::CaptureFile> {
        let interface = interface.unwrap_or_else(|| self.config.capture.default_interface.clone());
        let duration = duration.unwrap_or(self.config.capture.default_duration_secs);
        if duration == 0 {
            return Err(ProbeError::InvalidArgument("duration must be at least 1 second".to_string()));
        }
        
        self.tshark().await?.capture(&interface, duration).await
    }
    
    pub async fn capture_packets(&self, interface: Option<String>, duration: Option<u64>) -> Result<String> {
        let capture = self.live_capture(interface, duration).await?;
        let json = self.tshark().await?
            .export_json(capture.path(), packets::SUMMARY_FIELDS)
            .await?;
        let packets = analysis::parse_packets(&json)?;
        
        report::captured_packets(&packets, self.max_chars())
    }
    
    pub async fn summary_stats(&self, interface: Option<String>, duration: Option<u64>) -> Result<String> {
        let capture = self.live_capture(interface, duration).await?;
        self.summary_stats_for(capture.path()).await
    }
    
    pub async fn pcap_stats(&self, path: &str) -> Result<String> {
        require_file(path)?;
        self.summary_stats_for(Path::new(path)).await
    }
    
    async fn summary_stats_for(&self, path: &Path) -> Result<String> {
        let text = self.tshark().await?.statistics(path, "io,phs").await?;
        let rows = analysis::parse_hierarchy(&text, self.config.output.hierarchy_indent);
        
        report::protocol_hierarchy(&rows, self.max_chars())
    }
    
    pub async fn conversations(&self, interface: Option<String>, duration: Option<u64>) -> Result<String> {
        let capture = self.live_capture(interface, duration).await?;
        self.conversations_for(capture.path()).await
    }
    
    pub async fn pcap_conversations(&self, path: &str) -> Result<String> {
        require_file(path)?;
        self.conversations_for(Path::new(path)).await
    }
    
    async fn conversations_for(&self, path: &Path) -> Result<String> {
        let text = self.tshark().await?.statistics(path, "conv,tcp").await?;
        let rows = analysis::parse_conversations(&text);
        
        report::conversations(&rows, self.max_chars())
    }
    
    pub async fn check_threats(&self, interface: Option<String>, duration: Option<u64>) -> Result<String> {
        let capture = self.live_capture(interface, duration).await?;
        let fields = self.tshark().await?
            .export_fields(capture.path(), threat::ADDRESS_FIELDS)
            .await?;
        let observed = analysis::observed_addresses(&fields);
        
        let blacklist = self.feed.blacklist().await;
        let matches = analysis::correlate(observed.iter().map(String::as_str), &blacklist);
        log::info!("{} of {} observed addresses are blacklisted", matches.len(), observed.len());
        
        report::threats(&observed, &matches, self.max_chars())
    }
    
    pub async fn check_ip(&self, ip: &str) -> Result<String> {
        let ip = ip.trim();
        if ip.is_empty() {
            return Err(ProbeError::InvalidArgument("ip must not be empty".to_string()));
        }
        
        let blacklist = self.feed.blacklist().await;
        Ok(check_against(ip, &blacklist))
    }
    
    pub async fn analyze_pcap(&self, path: &str) -> Result<String> {
        require_file(path)?;
        
        let json = self.tshark().await?
            .export_json(Path::new(path), packets::SUMMARY_FIELDS)
            .await?;
        let packets = analysis::parse_packets(&json)?;
        
        report::pcap_analysis(path, &packets, self.max_chars())
    }
    
    pub async fn extract_credentials(&self, path: &str) -> Result<String> {
        require_file(path)?;
        
        let tshark = self.tshark().await?;
        let plaintext = tshark
            .export_fields(Path::new(path), credentials::PLAINTEXT_FIELDS)
            .await?;
        let kerberos = tshark
            .export_fields(Path::new(path), credentials::KERBEROS_FIELDS)
            .await?;
        
        let extraction = self.extractor.extract(&plaintext, &kerberos);
        report::credentials(&extraction, self.max_chars())
    }
}

fn check_against(ip: &str, blacklist: &Blacklist) -> String {
    report::ip_check(ip, blacklist.contains(ip))
}

fn require_file(path: &str) -> Result<()> {
    if tshark::file_exists(path) {
        Ok(())
    } else {
        Err(ProbeError::FileNotFound(path.to_string()))
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| ProbeError::InvalidArgument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn toolbox() -> ToolBox {
        let tshark = TShark::new("/nonexistent/shark-probe/tshark", std::env::temp_dir());
        ToolBox::with_tshark(Config::default(), tshark).unwrap()
    }
    
    #[test]
    fn test_definitions_cover_all_tools() {
        let names: Vec<String> = ToolBox::definitions().into_iter().map(|d| d.name).collect();
        
        assert_eq!(names, vec![
            "capture_packets",
            "get_summary_stats",
            "get_conversations",
            "check_threats",
            "check_ip_threats",
            "analyze_pcap",
            "extract_credentials",
        ]);
    }
    
    #[tokio::test]
    async fn test_unknown_tool() {
        let result = toolbox().call("format_disk", None).await;
        
        assert!(result.is_error);
        assert!(result.first_text().starts_with("Error:"));
    }
    
    #[tokio::test]
    async fn test_missing_argument() {
        let result = toolbox().call("analyze_pcap", Some(json!({}))).await;
        
        assert!(result.is_error);
        assert!(result.first_text().contains("pcapPath"));
    }
    
    #[tokio::test]
    async fn test_missing_pcap_file() {
        let result = toolbox()
            .call("extract_credentials", Some(json!({"filePath": "/nonexistent/capture.pcap"})))
            .await;
        
        assert!(result.is_error);
        assert_eq!(result.first_text(), "Error: File not found: /nonexistent/capture.pcap");
    }
    
    #[tokio::test]
    async fn test_capture_failure_surfaces_diagnostic() {
        let result = toolbox()
            .call("get_summary_stats", Some(json!({"interface": "lo", "duration": 1})))
            .await;
        
        assert!(result.is_error);
        assert!(result.first_text().starts_with("Error: tshark not found"));
    }
    
    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let result = toolbox().call("capture_packets", Some(json!({"duration": 0}))).await;
        
        assert!(result.is_error);
        assert!(result.first_text().contains("duration"));
    }
    
    #[test]
    fn test_check_against() {
        let blacklist = Blacklist::parse("192.168.1.1\nmalicious.example.com\n");
        
        assert!(check_against("192.168.1.1", &blacklist).ends_with("Potential threat detected"));
        assert!(check_against("10.0.0.1", &blacklist).ends_with("No threat detected"));
    }
}
