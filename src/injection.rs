// src/injection.rs
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Detection technique that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InjectionKind {
    Blind,
    Timed,
    Error,
    GetParam,
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InjectionKind::Blind => write!(f, "Blind NoSQL Injection"),
            InjectionKind::Timed => write!(f, "Timing based NoSQL Injection"),
            InjectionKind::Error => write!(f, "Error based NoSQL Injection"),
            InjectionKind::GetParam => write!(f, "Get Parameter NoSQL Injection"),
        }
    }
}

/// The request state a finding was observed against.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub body: String,
}

/// A confirmed injection point.
#[derive(Debug, Clone, Serialize)]
pub struct Injection {
    pub kind: InjectionKind,
    pub request: RequestSnapshot,
    /// The parameter (or body field) found to be injectable.
    pub injectable_param: String,
    /// The key the payload was delivered under.
    pub injected_param: String,
    /// The payload value itself.
    pub injected_value: String,
}

impl Injection {
    /// Dedup fingerprint over everything that identifies a finding.
    pub fn fingerprint(&self) -> String {
        let serial = format!(
            "{}{}{}{}{}",
            self.kind,
            self.request.url,
            self.injectable_param,
            self.injected_param,
            self.injected_value
        );
        format!("{:x}", md5::compute(serial))
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Found {}:\n\tURL: {}\n\tparam: {}\n\tInjection: {}={}\n\n",
            self.kind,
            self.request.url,
            self.injectable_param,
            self.injected_param,
            self.injected_value
        )
    }
}

/// Drop duplicate findings, keeping the first occurrence of each
/// fingerprint. Order is otherwise preserved.
pub fn unique(injections: Vec<Injection>) -> Vec<Injection> {
    let mut seen = HashSet::new();
    injections
        .into_iter()
        .filter(|injection| seen.insert(injection.fingerprint()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(kind: InjectionKind, param: &str, value: &str) -> Injection {
        Injection {
            kind,
            request: RequestSnapshot {
                method: "POST".to_string(),
                url: "http://example.com/users?name=john".to_string(),
                body: String::new(),
            },
            injectable_param: param.to_string(),
            injected_param: param.to_string(),
            injected_value: value.to_string(),
        }
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(InjectionKind::Blind.to_string(), "Blind NoSQL Injection");
        assert_eq!(
            InjectionKind::Timed.to_string(),
            "Timing based NoSQL Injection"
        );
        assert_eq!(
            InjectionKind::Error.to_string(),
            "Error based NoSQL Injection"
        );
        assert_eq!(
            InjectionKind::GetParam.to_string(),
            "Get Parameter NoSQL Injection"
        );
    }

    #[test]
    fn test_display_format() {
        let rendered = finding(InjectionKind::Error, "name", "'").to_string();
        assert_eq!(
            rendered,
            "Found Error based NoSQL Injection:\n\tURL: http://example.com/users?name=john\n\tparam: name\n\tInjection: name='\n\n"
        );
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        let findings = vec![
            finding(InjectionKind::Error, "name", "'"),
            finding(InjectionKind::Error, "age", "'"),
            finding(InjectionKind::Error, "name", "'"),
        ];
        let deduped = unique(findings);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].injectable_param, "name");
        assert_eq!(deduped[1].injectable_param, "age");
    }

    #[test]
    fn test_unique_is_idempotent() {
        let findings = vec![
            finding(InjectionKind::Blind, "user", ".*"),
            finding(InjectionKind::Blind, "user", ".*"),
            finding(InjectionKind::Timed, "user", ";sleep(500);"),
        ];
        let once = unique(findings);
        let fingerprints: Vec<String> = once.iter().map(|f| f.fingerprint()).collect();
        let twice = unique(once.clone());
        assert_eq!(
            twice.iter().map(|f| f.fingerprint()).collect::<Vec<_>>(),
            fingerprints
        );
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn test_fingerprint_distinguishes_kind() {
        let a = finding(InjectionKind::Blind, "user", "x");
        let b = finding(InjectionKind::Timed, "user", "x");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
