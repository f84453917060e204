// src/response.rs
use serde::Serialize;

/// A captured HTTP response, detached from the transport that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedResponse {
    pub url: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub status: u16,
}

impl CapturedResponse {
    /// Equality over status code and body. This is the comparison blind
    /// detection uses; headers routinely carry per-response noise (dates,
    /// request ids) that would defeat differential analysis.
    pub fn content_equals(&self, other: &CapturedResponse) -> bool {
        self.status == other.status && self.body == other.body
    }

    /// Content equality plus header equality, for callers that are sensitive
    /// to header changes.
    pub fn deep_equals(&self, other: &CapturedResponse) -> bool {
        self.content_equals(other) && self.headers == other.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str, headers: Vec<(String, String)>) -> CapturedResponse {
        CapturedResponse {
            url: "http://example.com/".to_string(),
            body: body.to_string(),
            headers,
            status,
        }
    }

    #[test]
    fn test_content_equals_ignores_headers() {
        let a = response(200, "hello", vec![("x-req".into(), "1".into())]);
        let b = response(200, "hello", vec![("x-req".into(), "2".into())]);
        assert!(a.content_equals(&b));
        assert!(!a.deep_equals(&b));
    }

    #[test]
    fn test_content_equals_detects_differences() {
        let a = response(200, "hello", vec![]);
        assert!(!a.content_equals(&response(500, "hello", vec![])));
        assert!(!a.content_equals(&response(200, "goodbye", vec![])));
    }

    #[test]
    fn test_deep_equals_requires_identical_headers() {
        let headers = vec![("content-type".to_string(), "text/html".to_string())];
        let a = response(200, "hello", headers.clone());
        let b = response(200, "hello", headers);
        assert!(a.deep_equals(&b));
    }
}
