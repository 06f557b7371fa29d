use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::Framing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub version: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Minimal configuration for a server at `base_url` with default endpoints.
    pub fn for_server(base_url: &str) -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::new(base_url),
            http: HttpConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    #[serde(default = "default_start_path")]
    pub start_path: String,
    #[serde(default = "default_cancel_path")]
    pub cancel_path: String,
    #[serde(default = "default_reset_path")]
    pub reset_path: String,
    #[serde(default = "default_progress_path")]
    pub progress_path: String,
    #[serde(default)]
    pub framing: Framing,
}

fn default_start_path() -> String {
    "/api/process".to_string()
}

fn default_cancel_path() -> String {
    "/api/cancel".to_string()
}

fn default_reset_path() -> String {
    "/api/reset".to_string()
}

fn default_progress_path() -> String {
    "/api/progress".to_string()
}

impl ServerConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            start_path: default_start_path(),
            cancel_path: default_cancel_path(),
            reset_path: default_reset_path(),
            progress_path: default_progress_path(),
            framing: Framing::default(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn start_url(&self) -> String {
        self.endpoint(&self.start_path)
    }

    pub fn cancel_url(&self) -> String {
        self.endpoint(&self.cancel_path)
    }

    pub fn reset_url(&self) -> String {
        self.endpoint(&self.reset_path)
    }

    pub fn progress_url(&self) -> String {
        self.endpoint(&self.progress_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Applies to start, cancel and reset calls. The progress stream itself
    /// has no overall timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    256
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
