pub mod analysis;
pub mod config;
pub mod error;
pub mod intel;
pub mod report;
pub mod server;
pub mod tshark;
pub mod utils;

pub use error::{ProbeError, Result};
pub use config::Config;
