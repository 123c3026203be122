use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub threat: ThreatConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub tshark_path: Option<String>,
    pub search_paths: Vec<String>,
    pub default_interface: String,
    pub default_duration_secs: u64,
    pub temp_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    pub blacklist_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub max_chars: usize,
    pub hierarchy_indent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tshark_path: None,
            search_paths: vec![
                "/usr/bin/tshark".to_string(),
                "/usr/local/bin/tshark".to_string(),
                "/opt/homebrew/bin/tshark".to_string(),
                "/Applications/Wireshark.app/Contents/MacOS/tshark".to_string(),
                "C:\\Program Files\\Wireshark\\tshark.exe".to_string(),
            ],
            default_interface: "en0".to_string(),
            default_duration_secs: 5,
            temp_dir: None,
        }
    }
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            blacklist_url: "https://rules.emergingthreats.net/fwrules/emerging-Block-IPs.txt".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_chars: 720_000,
            hierarchy_indent: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
    
    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
