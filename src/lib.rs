// src/lib.rs
//! NoSQL injection scanner for MongoDB/Mongoose backed HTTP endpoints.
//!
//! A seed request is derived from a target URL, a raw request file, or both;
//! three independent detectors (error-based, boolean-blind, time-based)
//! replay it with families of malicious payloads and report the parameters
//! they can prove injectable.

pub mod combinations;
pub mod config;
pub mod detectors;
pub mod error;
pub mod injection;
pub mod payloads;
pub mod raw_request;
pub mod request;
pub mod response;
pub mod sender;

pub use config::ScanOptions;
pub use error::ScanError;
pub use injection::{unique, Injection, InjectionKind};
pub use request::{AttackRequest, BodyItem};
pub use response::CapturedResponse;
pub use sender::{HttpSender, RequestSender};

use std::sync::Arc;
use tracing::info;

/// Run every detector against a single seed request and return the
/// deduplicated findings. Detector order is error, blind, timing; requests
/// are dispatched strictly sequentially, which the timing statistics
/// depend on.
pub async fn scan(options: &ScanOptions) -> Result<Vec<Injection>, ScanError> {
    options.validate()?;

    let sender: Arc<dyn RequestSender> = Arc::new(HttpSender::new(options)?);
    let mut seed = AttackRequest::new(options, sender)?;
    seed.method = "POST".to_string();

    info!("running error based tests");
    let mut findings = detectors::error_based_injection_test(&seed).await;

    info!("running blind boolean tests");
    findings.extend(detectors::blind_boolean_injection_test(&seed).await);

    info!("running timing based tests");
    findings.extend(detectors::timing_injection_test(&seed, options.sleep_ms).await);

    Ok(unique(findings))
}

/// Render findings as the human-readable report.
pub fn render_report(findings: &[Injection]) -> String {
    let mut report = String::new();
    for finding in findings {
        report.push_str(&finding.to_string());
    }
    if findings.is_empty() {
        report.push_str("No injections found.\n");
    }
    report
}

/// Scan a single URL with an optional body and return the report. Uses
/// default options throughout; this is the embedding-friendly entry point.
pub async fn run(url: &str, request_data: &str) -> String {
    let options = ScanOptions {
        target: (!url.is_empty()).then(|| url.to_string()),
        request_data: (!request_data.is_empty()).then(|| request_data.to_string()),
        ..Default::default()
    };

    let mut report = format!("URL: {}\n", url);
    match scan(&options).await {
        Ok(findings) => report.push_str(&render_report(&findings)),
        Err(e) => return format!("Error: {}\n", e),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::RequestSnapshot;

    fn finding(param: &str) -> Injection {
        Injection {
            kind: InjectionKind::Blind,
            request: RequestSnapshot {
                method: "POST".to_string(),
                url: "http://example.com/lookup?user=alice".to_string(),
                body: String::new(),
            },
            injectable_param: param.to_string(),
            injected_param: format!("{}[$regex]", param),
            injected_value: "true: .*, false: a^".to_string(),
        }
    }

    #[test]
    fn test_render_report_empty() {
        assert_eq!(render_report(&[]), "No injections found.\n");
    }

    #[test]
    fn test_render_report_blocks() {
        let report = render_report(&[finding("user")]);
        assert_eq!(
            report,
            "Found Blind NoSQL Injection:\n\tURL: http://example.com/lookup?user=alice\n\tparam: user\n\tInjection: user[$regex]=true: .*, false: a^\n\n"
        );
    }

    #[tokio::test]
    async fn test_run_reports_configuration_errors() {
        let report = run("", "").await;
        assert!(report.starts_with("Error: Configuration error:"), "{}", report);
    }
}
