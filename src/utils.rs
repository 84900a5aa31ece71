// src/utils.rs - Logging, error taxonomy and small shared helpers

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use crate::constants::*;

/// Fatal launcher failures; every kind maps to process exit code 1.
#[derive(Debug, Clone)]
pub struct LaunchError {
    pub message: String,
    kind: LaunchErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchErrorKind {
    ConfigParse,
    ModelPath,
    Spawn,
    ServerExit(i32),
}

impl LaunchError {
    pub fn config_parse(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: LaunchErrorKind::ConfigParse,
        }
    }

    pub fn model_path(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: LaunchErrorKind::ModelPath,
        }
    }

    pub fn spawn(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: LaunchErrorKind::Spawn,
        }
    }

    pub fn server_exit(code: i32) -> Self {
        Self {
            message: format!("server exited with status {}", code),
            kind: LaunchErrorKind::ServerExit(code),
        }
    }

    pub fn kind(&self) -> LaunchErrorKind {
        self.kind
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LaunchErrorKind::ConfigParse => write!(f, "config error: {}", self.message),
            LaunchErrorKind::ModelPath => write!(f, "model path error: {}", self.message),
            LaunchErrorKind::Spawn => write!(f, "launch failed: {}", self.message),
            LaunchErrorKind::ServerExit(_) => write!(f, "{}", self.message),
        }
    }
}

impl Error for LaunchError {}

/// Per-request client failures, reported without aborting the test batch.
#[derive(Debug, Clone)]
pub struct ClientError {
    pub message: String,
    kind: ClientErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    Timeout,
    ConnectionRefused,
    HttpStatus(u16),
    MalformedBody,
    Request,
}

impl ClientError {
    pub fn timeout(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: ClientErrorKind::Timeout,
        }
    }

    pub fn connection_refused(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: ClientErrorKind::ConnectionRefused,
        }
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        let snippet: String = body.chars().take(ERROR_BODY_SNIPPET_LIMIT).collect();
        Self {
            message: format!("server returned {}: {}", status, snippet.trim()),
            kind: ClientErrorKind::HttpStatus(status),
        }
    }

    pub fn malformed_body(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: ClientErrorKind::MalformedBody,
        }
    }

    pub fn request(message: &str) -> Self {
        Self {
            message: message.to_string(),
            kind: ClientErrorKind::Request,
        }
    }

    /// Classify a transport-level failure into the enumerated taxonomy.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(&format!("request timed out: {}", err))
        } else if err.is_connect() {
            Self::connection_refused(&format!("connection failed: {}", err))
        } else {
            Self::request(&format!("request failed: {}", err))
        }
    }

    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            ClientErrorKind::HttpStatus(status) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ClientError {}

/// Simplified logger for single-operator use
#[derive(Debug, Clone)]
pub struct Logger {
    pub enabled: bool,
}

impl Logger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn log(&self, message: &str) {
        if self.enabled {
            println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled {
            println!(
                "[{}] {} {}",
                chrono::Local::now().format("%H:%M:%S"),
                LOG_PREFIX_WARNING,
                message
            );
        }
    }

    pub fn error(&self, message: &str) {
        if self.enabled {
            println!(
                "[{}] {} {}",
                chrono::Local::now().format("%H:%M:%S"),
                LOG_PREFIX_ERROR,
                message
            );
        }
    }

    /// Log an operation with its elapsed time
    pub fn log_timed(&self, prefix: &str, operation: &str, start: Instant) {
        if self.enabled {
            println!(
                "[{}] {} {} ({})",
                chrono::Local::now().format("%H:%M:%S"),
                prefix,
                operation,
                format_duration(start.elapsed())
            );
        }
    }
}

/// Fast duration formatting
pub fn format_duration(duration: Duration) -> String {
    let total_micros = duration.as_micros();

    if total_micros < 1_000 {
        format!("{}µs", total_micros)
    } else if total_micros < 1_000_000 {
        format!("{:.3}ms", total_micros as f64 / 1_000.0)
    } else {
        format!("{:.3}s", total_micros as f64 / 1_000_000.0)
    }
}

/// Check generated text for leaked chat-template reasoning markers
pub fn has_thinking_markers(content: &str) -> bool {
    THINKING_MARKERS.iter().any(|marker| content.contains(marker))
}

/// Base URL sanity check before building a client
pub fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(base_url).map_err(|e| format!("invalid base URL '{}': {}", base_url, e))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("unsupported URL scheme '{}': expected http or https", parsed.scheme()));
    }

    if parsed.host_str().is_none() {
        return Err(format!("base URL '{}' has no host", base_url));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_micros(750)), "750µs");
        assert_eq!(format_duration(Duration::from_millis(12)), "12.000ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.000s");
    }

    #[test]
    fn test_thinking_marker_detection() {
        assert!(has_thinking_markers("<think>hmm</think> answer"));
        assert!(has_thinking_markers("truncated </think> tail"));
        assert!(!has_thinking_markers("a plain answer about thinking"));
        assert!(!has_thinking_markers(""));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(validate_base_url("http://localhost:30000").is_ok());
        assert!(validate_base_url("https://10.0.0.2:8000").is_ok());
        assert!(validate_base_url("ftp://localhost").is_err());
        assert!(validate_base_url("localhost:30000").is_err());
        assert!(validate_base_url("").is_err());
    }

    #[test]
    fn test_client_error_kinds() {
        let err = ClientError::http_status(503, "overloaded");
        assert_eq!(err.kind(), ClientErrorKind::HttpStatus(503));
        assert_eq!(err.status_code(), Some(503));

        let err = ClientError::timeout("60s elapsed");
        assert_eq!(err.kind(), ClientErrorKind::Timeout);
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_http_status_body_truncated() {
        let long_body = "x".repeat(ERROR_BODY_SNIPPET_LIMIT * 2);
        let err = ClientError::http_status(500, &long_body);
        assert!(err.message.len() < long_body.len());
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = Logger::new(false);
        logger.log("quiet");
        logger.warn("quiet");
        logger.error("quiet");
        logger.log_timed(LOG_PREFIX_SUCCESS, "quiet", Instant::now());
        assert!(!logger.enabled);
    }

    #[test]
    fn test_launch_error_display() {
        let err = LaunchError::server_exit(3);
        assert_eq!(err.kind(), LaunchErrorKind::ServerExit(3));
        assert_eq!(err.to_string(), "server exited with status 3");

        let err = LaunchError::config_parse("bad yaml");
        assert!(err.to_string().contains("config error"));
    }
}
