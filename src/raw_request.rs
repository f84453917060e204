// src/raw_request.rs
//! Parser for raw HTTP request files (the kind saved from an intercepting
//! proxy). Produces the canonical parts the attack request is built from.

use crate::error::ScanError;
use std::path::Path;
use url::Url;

/// A raw request file parsed into its canonical parts.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Read and parse a raw HTTP request from a file. The absolute URL is
/// assembled from the Host header; `require_https` selects the scheme.
pub fn load_raw_request(path: &Path, require_https: bool) -> Result<RawRequest, ScanError> {
    let text = std::fs::read_to_string(path)?;
    parse_raw_request(&text, require_https)
}

pub fn parse_raw_request(text: &str, require_https: bool) -> Result<RawRequest, ScanError> {
    let (head, body) = match text.split_once("\r\n\r\n") {
        Some((head, body)) => (head, body),
        None => text.split_once("\n\n").unwrap_or((text, "")),
    };

    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| ScanError::RequestFile("empty request".to_string()))?;

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| ScanError::RequestFile("missing method in request line".to_string()))?
        .to_string();
    let path_part = parts
        .next()
        .ok_or_else(|| ScanError::RequestFile("missing path in request line".to_string()))?
        .to_string();

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            ScanError::RequestFile(format!("malformed header line: {:?}", line))
        })?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let host = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("host"))
        .map(|(_, value)| value.clone())
        .ok_or_else(|| ScanError::RequestFile("missing Host header".to_string()))?;

    let scheme = if require_https { "https" } else { "http" };
    let url = Url::parse(&format!("{}://{}{}", scheme, host, path_part))
        .map_err(|e| ScanError::RequestFile(format!("invalid request URL: {}", e)))?;

    Ok(RawRequest {
        method,
        url,
        headers,
        body: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "POST /login?next=%2Fhome HTTP/1.1\r\n\
        Host: target.example.com\r\n\
        User-Agent: curl/8.0\r\n\
        Content-Type: application/x-www-form-urlencoded\r\n\
        \r\n\
        user=admin&pass=secret";

    #[test]
    fn test_parse_full_request() {
        let raw = parse_raw_request(RAW, false).unwrap();
        assert_eq!(raw.method, "POST");
        assert_eq!(
            raw.url.as_str(),
            "http://target.example.com/login?next=%2Fhome"
        );
        assert_eq!(raw.body, "user=admin&pass=secret");
        assert!(raw
            .headers
            .iter()
            .any(|(k, v)| k == "User-Agent" && v == "curl/8.0"));
    }

    #[test]
    fn test_require_https_sets_scheme() {
        let raw = parse_raw_request(RAW, true).unwrap();
        assert_eq!(raw.url.scheme(), "https");
    }

    #[test]
    fn test_bare_newlines_accepted() {
        let text = "GET /search?q=a HTTP/1.1\nHost: example.com\n\n";
        let raw = parse_raw_request(text, false).unwrap();
        assert_eq!(raw.method, "GET");
        assert_eq!(raw.url.as_str(), "http://example.com/search?q=a");
        assert_eq!(raw.body, "");
    }

    #[test]
    fn test_missing_host_rejected() {
        let text = "GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        assert!(matches!(
            parse_raw_request(text, false),
            Err(ScanError::RequestFile(_))
        ));
    }
}
