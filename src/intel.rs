use std::time::Duration;
use reqwest::Client;
use crate::analysis::Blacklist;
use crate::config::ThreatConfig;
use crate::Result;

/// Remote blacklist of known-bad indicators, one per line.
#[derive(Debug, Clone)]
pub struct ThreatFeed {
    client: Client,
    url: String,
}

impl ThreatFeed {
    pub fn new(config: &ThreatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("shark-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        
        Ok(Self {
            client,
            url: config.blacklist_url.clone(),
        })
    }
    
    pub fn url(&self) -> &str {
        &self.url
    }
    
    pub async fn fetch(&self) -> Result<(u16, String)> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
    
    /// Never fails: transport errors and non-2xx statuses yield an empty blacklist.
    pub async fn blacklist(&self) -> Blacklist {
        match self.fetch().await {
            Ok((status, body)) if (200..300).contains(&status) => {
                let blacklist = Blacklist::parse(&body);
                log::info!("Loaded {} blacklist entries from {}", blacklist.len(), self.url);
                blacklist
            }
            Ok((status, _)) => {
                log::warn!("Blacklist fetch from {} returned status {}", self.url, status);
                Blacklist::default()
            }
            Err(e) => {
                log::warn!("Blacklist fetch from {} failed: {}", self.url, e);
                Blacklist::default()
            }
        }
    }
}
