use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;

const SUPPORTED_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let base_url = &config.server.base_url;
    let parsed = reqwest::Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
        url: base_url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: base_url.clone(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let paths = [
        ("start_path", &config.server.start_path),
        ("cancel_path", &config.server.cancel_path),
        ("reset_path", &config.server.reset_path),
        ("progress_path", &config.server.progress_path),
    ];
    for (name, path) in paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation {
                message: format!("server.{} must start with '/': '{}'", name, path),
            });
        }
    }

    if config.http.connect_timeout_secs == 0 || config.http.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "HTTP timeouts must be greater than zero".to_string(),
        });
    }

    if config.notifications.capacity == 0 {
        return Err(ConfigError::Validation {
            message: "notifications.capacity must be greater than zero".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Framing;
    use std::io::Write;

    fn minimal_config() -> &'static str {
        r#"{
            "version": "1.0",
            "server": { "base_url": "http://localhost:8000/" }
        }"#
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let config = load_config_from_str(minimal_config()).unwrap();
        assert_eq!(config.server.start_url(), "http://localhost:8000/api/process");
        assert_eq!(config.server.progress_url(), "http://localhost:8000/api/progress");
        assert_eq!(config.server.framing, Framing::Sse);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.notifications.capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"{
            "version": "1.0",
            "server": {
                "base_url": "https://ingest.example.com",
                "start_path": "/v2/jobs",
                "cancel_path": "/v2/jobs/cancel",
                "reset_path": "/v2/jobs/reset",
                "progress_path": "/v2/jobs/events",
                "framing": "ndjson"
            },
            "http": { "connect_timeout_secs": 3, "request_timeout_secs": 9 },
            "notifications": { "capacity": 16 },
            "logging": { "level": "debug", "json": true }
        }"#;
        let config = load_config_from_str(content).unwrap();
        assert_eq!(config.server.cancel_url(), "https://ingest.example.com/v2/jobs/cancel");
        assert_eq!(config.server.framing, Framing::Ndjson);
        assert_eq!(config.http.connect_timeout().as_secs(), 3);
        assert_eq!(config.notifications.capacity, 16);
        assert!(config.logging.json);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let content = r#"{"version": "2.0", "server": {"base_url": "http://localhost"}}"#;
        let err = load_config_from_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let content = r#"{"version": "1.0", "server": {"base_url": "not a url"}}"#;
        assert!(matches!(
            load_config_from_str(content),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let content = r#"{"version": "1.0", "server": {"base_url": "ftp://localhost"}}"#;
        assert!(matches!(
            load_config_from_str(content),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_relative_paths() {
        let content = r#"{"version": "1.0",
            "server": {"base_url": "http://localhost", "progress_path": "events"}}"#;
        match load_config_from_str(content) {
            Err(ConfigError::Validation { message }) => assert!(message.contains("progress_path")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let content = r#"{"version": "1.0", "server": {"base_url": "http://localhost"},
            "notifications": {"capacity": 0}}"#;
        assert!(matches!(
            load_config_from_str(content),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            load_config_from_str("{"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_config().as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/ingestwatch.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
