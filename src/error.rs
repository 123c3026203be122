use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    
    #[error("tshark not found: {0}")]
    ToolNotFound(String),
    
    #[error("File not found: {0}")]
    FileNotFound(String),
    
    #[error("Capture failed: {0}")]
    Capture(String),
    
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    
    #[error("Protocol error: {0}")]
    Protocol(String),
    
    #[error("Response does not fit in {0} bytes")]
    Budget(usize),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
