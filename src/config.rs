// Library Guide - Personal Library Catalog Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Client configuration
//!
//! Settings can be built in code through `ClientConfig::builder()` or read
//! from a TOML file. Every key is optional in the file:
//!
//! ```toml
//! base_url = "http://localhost:8080/api"
//! timeout_secs = 30
//! page_size = 25
//! access_token = "..."
//! log_level = "info"
//! ```

use crate::error::{LibraryError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default backend location
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Rows per page on every list screen
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for LibraryClient and the guide screens
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub page_size: usize,
    /// Bearer token attached to every request
    pub access_token: Option<String>,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("library-guide/", env!("CARGO_PKG_VERSION")).to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            access_token: None,
            log_level: "info".to_string(),
        }
    }
}

/// On-disk shape of the config file
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    page_size: Option<usize>,
    access_token: Option<String>,
    log_level: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Parse a TOML document, falling back to defaults for missing keys
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let defaults = ClientConfig::default();

        let config = ClientConfig {
            base_url: file.base_url.unwrap_or(defaults.base_url),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
            page_size: file.page_size.unwrap_or(defaults.page_size),
            access_token: file.access_token.filter(|t| !t.is_empty()),
            log_level: file.log_level.unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LibraryError::ConfigurationError(format!(
                "Unable to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(LibraryError::ConfigurationError(
                "page_size must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.base_url)?;
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::builder()
            .base_url("https://catalog.example.org/api")
            .timeout(Duration::from_secs(60))
            .page_size(10)
            .user_agent("TestAgent/1.0")
            .access_token("abc")
            .build();

        assert_eq!(config.base_url, "https://catalog.example.org/api");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.user_agent, "TestAgent/1.0");
        assert_eq!(config.access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_toml_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "http://10.0.0.5:8081/api"
            timeout_secs = 5
            access_token = ""
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:8081/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.access_token, None);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = ClientConfig::from_toml_str("page_size = 0");
        assert!(matches!(result, Err(LibraryError::ConfigurationError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = 50").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.page_size, 50);

        let missing = ClientConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(LibraryError::ConfigurationError(_))));
    }
}
