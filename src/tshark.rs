use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use crate::config::CaptureConfig;
use crate::{ProbeError, Result};

/// A located tshark binary plus the directory its temporary captures go to.
#[derive(Debug, Clone)]
pub struct TShark {
    binary: PathBuf,
    temp_dir: PathBuf,
}

/// Temporary capture written by [`TShark::capture`]. The file is removed on drop.
#[derive(Debug)]
pub struct CaptureFile {
    path: PathBuf,
}

impl CaptureFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
    
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CaptureFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed capture file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove capture file {}: {}", self.path.display(), e),
        }
    }
}

pub fn file_exists(path: &str) -> bool {
    Path::new(path).is_file()
}

impl TShark {
    pub fn new(binary: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            temp_dir: temp_dir.into(),
        }
    }
    
    /// Tries the configured path, then the search paths, then `tshark` on `PATH`.
    pub async fn locate(config: &CaptureConfig) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        
        if let Some(ref path) = config.tshark_path {
            candidates.push(PathBuf::from(path));
        }
        candidates.extend(
            config.search_paths
                .iter()
                .map(PathBuf::from)
                .filter(|path| path.is_file()),
        );
        candidates.push(PathBuf::from("tshark"));
        
        for candidate in candidates {
            if Self::responds(&candidate).await {
                log::info!("Using tshark at {}", candidate.display());
                return Ok(Self::new(candidate, config.temp_dir()));
            }
            log::debug!("tshark candidate {} did not respond", candidate.display());
        }
        
        Err(ProbeError::ToolNotFound(
            "install Wireshark/tshark or set capture.tshark_path".to_string(),
        ))
    }
    
    async fn responds(binary: &Path) -> bool {
        Command::new(binary)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
    
    pub fn binary(&self) -> &Path {
        &self.binary
    }
    
    /// Captures from `interface` for `duration_secs` into a temporary pcap.
    pub async fn capture(&self, interface: &str, duration_secs: u64) -> Result<CaptureFile> {
        let file = CaptureFile::new(self.temp_dir.join(crate::utils::capture_file_name()));
        log::info!("Capturing on {} for {}s", interface, duration_secs);
        
        self.run(&[
            "-i".to_string(),
            interface.to_string(),
            "-w".to_string(),
            file.path().to_string_lossy().to_string(),
            "-a".to_string(),
            format!("duration:{}", duration_secs),
        ]).await?;
        
        if !file.path().is_file() {
            return Err(ProbeError::Capture(format!(
                "no capture written to {}",
                file.path().display()
            )));
        }
        
        Ok(file)
    }
    
    pub async fn export_json(&self, capture: &Path, fields: &[&str]) -> Result<String> {
        let mut args = Self::read_args(capture);
        args.extend(["-T".to_string(), "json".to_string()]);
        args.extend(Self::field_args(fields));
        self.run(&args).await
    }
    
    /// Tab-separated `-T fields` export, one line per packet.
    pub async fn export_fields(&self, capture: &Path, fields: &[&str]) -> Result<String> {
        let mut args = Self::read_args(capture);
        args.extend(["-T".to_string(), "fields".to_string()]);
        args.extend(Self::field_args(fields));
        self.run(&args).await
    }
    
    /// Quiet statistics run, e.g. `io,phs` or `conv,tcp`.
    pub async fn statistics(&self, capture: &Path, stat: &str) -> Result<String> {
        let mut args = Self::read_args(capture);
        args.extend(["-q".to_string(), "-z".to_string(), stat.to_string()]);
        self.run(&args).await
    }
    
    fn read_args(capture: &Path) -> Vec<String> {
        vec!["-r".to_string(), capture.to_string_lossy().to_string()]
    }
    
    fn field_args(fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .flat_map(|field| ["-e".to_string(), field.to_string()])
            .collect()
    }
    
    async fn run(&self, args: &[String]) -> Result<String> {
        log::debug!("Running {} {}", self.binary.display(), args.join(" "));
        
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ProbeError::ToolNotFound(self.binary.display().to_string())
                }
                _ => ProbeError::Io(e),
            })?;
        
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProbeError::Capture(if stderr.is_empty() {
                format!("tshark exited with {}", output.status)
            } else {
                stderr
            }));
        }
        
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
