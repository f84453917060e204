// src/error.rs
//! Error types for the NoSQL injection scanner
//!
//! This module provides a unified error type for all scanner operations,
//! including configuration validation, HTTP transport, raw request file
//! parsing, and body/URL parsing errors.

use std::fmt;

/// Main error type for scanner operations
#[derive(Debug)]
pub enum ScanError {
    /// Configuration validation error
    Config(String),

    /// HTTP request/response error
    Http(String),

    /// URL or data parsing error
    Parse(String),

    /// Raw HTTP request file error
    RequestFile(String),

    /// I/O error (file operations)
    Io(std::io::Error),
}

impl std::error::Error for ScanError {}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::Config(s) => write!(f, "Configuration error: {}", s),
            ScanError::Http(s) => write!(f, "HTTP error: {}", s),
            ScanError::Parse(s) => write!(f, "Parse error: {}", s),
            ScanError::RequestFile(s) => write!(f, "Request file error: {}", s),
            ScanError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

// Automatic conversion from std::io::Error
impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        ScanError::Io(e)
    }
}

// Automatic conversion from reqwest::Error
impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        ScanError::Http(e.to_string())
    }
}

// Automatic conversion from url::ParseError
impl From<url::ParseError> for ScanError {
    fn from(e: url::ParseError) -> Self {
        ScanError::Parse(e.to_string())
    }
}

// Automatic conversion from serde_json::Error
impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::Parse(format!("JSON parse error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = ScanError::Config("missing target".to_string());
        assert_eq!(error.to_string(), "Configuration error: missing target");
    }

    #[test]
    fn test_http_error() {
        let error = ScanError::Http("Connection timeout".to_string());
        assert_eq!(error.to_string(), "HTTP error: Connection timeout");
    }

    #[test]
    fn test_request_file_error() {
        let error = ScanError::RequestFile("missing Host header".to_string());
        assert_eq!(
            error.to_string(),
            "Request file error: missing Host header"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let scan_error: ScanError = io_error.into();
        assert!(matches!(scan_error, ScanError::Io(_)));
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let parse_error = url::Url::parse("not a valid url").unwrap_err();
        let scan_error: ScanError = parse_error.into();
        assert!(matches!(scan_error, ScanError::Parse(_)));
    }

    #[test]
    fn test_error_trait_implemented() {
        let error = ScanError::Config("test".to_string());
        let _: &dyn std::error::Error = &error;
    }
}
