// src/config.rs
use crate::error::ScanError;
use std::path::PathBuf;

/// Default User-Agent sent with every probe unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; NoSQLi-Scanner/1.0)";

/// Sleep duration injected by the timing detector, in milliseconds.
pub const DEFAULT_SLEEP_MS: u64 = 500;

/// Configuration for a single scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Target URL for the seed request
    pub target: Option<String>,
    /// Path to a raw HTTP request file; parsed into method/URL/headers/body
    pub request_file: Option<PathBuf>,
    /// Request body; Content-Type is derived from whether it parses as JSON
    pub request_data: Option<String>,
    /// Proxy URL; when unset, falls back to the HTTP_PROXY environment variable
    pub proxy: Option<String>,
    /// Overrides the default User-Agent
    pub user_agent: Option<String>,
    /// Rewrite http:// targets to https://
    pub require_https: bool,
    /// Disable TLS certificate verification
    pub allow_insecure_certificates: bool,
    /// Sleep duration for timing payloads, in milliseconds
    pub sleep_ms: u64,
    /// Overall request timeout in seconds
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target: None,
            request_file: None,
            request_data: None,
            proxy: None,
            user_agent: None,
            require_https: false,
            allow_insecure_certificates: false,
            sleep_ms: DEFAULT_SLEEP_MS,
            timeout_secs: 10,
            connect_timeout_secs: 30,
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.target.is_none() && self.request_file.is_none() {
            return Err(ScanError::Config(
                "you must specify either a target or a request file to scan".to_string(),
            ));
        }

        if let Some(ref target) = self.target {
            url::Url::parse(target)
                .map_err(|e| ScanError::Config(format!("invalid target URL: {}", e)))?;
        }

        if self.sleep_ms == 0 {
            return Err(ScanError::Config(
                "sleep duration must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Proxy to route probes through. An explicit setting wins; otherwise the
    /// HTTP_PROXY environment variable is consulted.
    pub fn proxy(&self) -> Option<String> {
        match self.proxy {
            Some(ref p) if !p.is_empty() => Some(p.clone()),
            _ => std::env::var("HTTP_PROXY").ok().filter(|p| !p.is_empty()),
        }
    }

    pub fn user_agent(&self) -> String {
        match self.user_agent {
            Some(ref ua) if !ua.is_empty() => ua.clone(),
            _ => DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_target_or_request_file() {
        let options = ScanOptions::default();
        assert!(matches!(options.validate(), Err(ScanError::Config(_))));

        let options = ScanOptions {
            target: Some("http://example.com/".to_string()),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_target() {
        let options = ScanOptions {
            target: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_user_agent_default_and_override() {
        let options = ScanOptions::default();
        assert_eq!(options.user_agent(), DEFAULT_USER_AGENT);

        let options = ScanOptions {
            user_agent: Some("custom/1.0".to_string()),
            ..Default::default()
        };
        assert_eq!(options.user_agent(), "custom/1.0");
    }

    #[test]
    fn test_explicit_proxy_wins() {
        let options = ScanOptions {
            proxy: Some("http://127.0.0.1:8080".to_string()),
            ..Default::default()
        };
        assert_eq!(options.proxy().as_deref(), Some("http://127.0.0.1:8080"));
    }
}
