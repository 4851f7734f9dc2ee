use anyhow::Result;
use log::debug;
use std::time::Duration;

use crate::{
    client::{DEFAULT_API_URL, ExperimentClient},
    http::build_http_client,
};

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub connect_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: None,
        }
    }
}

impl Config {
    pub fn new(api_url: Option<String>, connect_timeout_secs: Option<u64>) -> Self {
        Self {
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            connect_timeout: connect_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn client(&self) -> Result<ExperimentClient> {
        debug!("Using API URL: {}", self.api_url);
        let http = build_http_client(self.connect_timeout)?;
        Ok(ExperimentClient::new(http, &self.api_url))
    }
}
