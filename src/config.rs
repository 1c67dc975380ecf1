//! Client configuration loaded from `~/.config/textfetch/config.toml`.
//!
//! ```toml
//! browser = "chrome"
//!
//! [headers]
//! Referer = "https://example.com/"
//!
//! [transport]
//! max_redirects = 5
//! timeout_secs = 30
//! proxy = "http://127.0.0.1:8080"
//! cookies = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::client::FetchClient;
use crate::handlers::{Handler, RedirectPolicy};
use crate::headers::HeaderProfile;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Header preset: `default`, `chrome`, `firefox`, `safari` or `random`
    #[serde(default)]
    pub browser: Option<String>,
    /// Extra headers added on top of the preset
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Handler settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// 0 disables redirect following
    pub max_redirects: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    #[serde(default)]
    pub cookies: bool,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid textfetch config")
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Header profile for the configured browser preset.
    pub fn header_profile(&self) -> Result<HeaderProfile> {
        let profile = match self.browser.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("default") => HeaderProfile::default(),
            Some("chrome") => HeaderProfile::chrome(),
            Some("firefox") => HeaderProfile::firefox(),
            Some("safari") => HeaderProfile::safari(),
            Some("random") => HeaderProfile::random(),
            Some(other) => bail!("unknown browser preset: {other}"),
        };
        Ok(profile)
    }

    /// Handlers described by the `[transport]` table, in a fixed order.
    pub fn handlers(&self) -> Result<Vec<Handler>> {
        let transport = &self.transport;
        let mut handlers = Vec::new();

        if let Some(max) = transport.max_redirects {
            let policy = if max == 0 {
                RedirectPolicy::None
            } else {
                RedirectPolicy::Limited(max)
            };
            handlers.push(Handler::Redirect(policy));
        }
        if let Some(proxy) = &transport.proxy {
            let url = Url::parse(proxy).with_context(|| format!("invalid proxy URL {proxy}"))?;
            handlers.push(Handler::Proxy(url));
        }
        if transport.cookies {
            handlers.push(Handler::Cookies);
        }
        if let Some(secs) = transport.timeout_secs {
            handlers.push(Handler::Timeout(Duration::from_secs(secs)));
        }

        Ok(handlers)
    }

    /// Build a client with headers added and handlers installed.
    pub fn build_client(&self) -> Result<FetchClient> {
        let client = FetchClient::with_profile(self.header_profile()?)?;

        for (key, value) in &self.headers {
            client
                .add_header(key, value)
                .with_context(|| format!("bad header {key} in config"))?;
        }

        let handlers = self.handlers()?;
        if !handlers.is_empty() {
            for handler in handlers {
                client.add_default_handler(handler);
            }
            client.install_default_handlers()?;
        }

        Ok(client)
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("textfetch")
        .join("config.toml")
}
