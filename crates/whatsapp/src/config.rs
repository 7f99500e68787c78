use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Session store file name under the system temp dir when none is configured.
const DEFAULT_STORE_FILE: &str = "wharf_whatsapp.db";

/// Default upper bound on the whole interactive pairing wait.
pub const DEFAULT_PAIRING_TIMEOUT_SECS: u64 = 180;

/// Configuration for the WhatsApp channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub enabled: bool,

    /// Session store location for native mode. `~` is expanded.
    pub store_path: String,

    /// WebSocket URL of an external bridge. Non-empty selects bridge mode.
    pub bridge_url: String,

    /// Sender allowlist. Empty means everyone is allowed.
    pub allow_from: Vec<String>,

    /// Directory for transient attachment files.
    pub media_dir: Option<PathBuf>,

    /// Upper bound on the pairing wait, in seconds.
    pub pairing_timeout_secs: u64,

    pub bridge: BridgeOptions,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            store_path: String::new(),
            bridge_url: String::new(),
            allow_from: Vec::new(),
            media_dir: None,
            pairing_timeout_secs: DEFAULT_PAIRING_TIMEOUT_SECS,
            bridge: BridgeOptions::default(),
        }
    }
}

impl WhatsAppConfig {
    /// Session store path with `~` expanded, or the temp-dir default.
    pub fn resolved_store_path(&self) -> PathBuf {
        let trimmed = self.store_path.trim();
        if trimmed.is_empty() {
            return std::env::temp_dir().join(DEFAULT_STORE_FILE);
        }
        expand_home_path(trimmed)
    }

    pub fn resolved_media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(wharf_media::MediaDownloader::default_dir)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }
}

/// Timing knobs for the bridge WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Bound on the initial connect + WebSocket handshake.
    pub handshake_timeout_ms: u64,
    /// Delay between dial attempts while no socket is held.
    pub idle_backoff_ms: u64,
    /// Delay after a read failure before reconnecting.
    pub error_backoff_ms: u64,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 10_000,
            idle_backoff_ms: 1_000,
            error_backoff_ms: 2_000,
        }
    }
}

impl BridgeOptions {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Which transport a channel instance uses. Fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Native,
    Bridge,
}

impl TransportMode {
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        if config.bridge_url.trim().is_empty() {
            Self::Native
        } else {
            Self::Bridge
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home_path(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
