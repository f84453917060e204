// src/detectors/blind.rs
//! Boolean-blind detection: pair every always-true payload with always-false
//! counterparts and compare both responses against a baseline. A parameter
//! is injectable when exactly one of the pair diverges from the baseline.

use super::{has_js_error, has_nosql_error};
use crate::combinations::subsets;
use crate::injection::{unique, Injection, InjectionKind};
use crate::payloads::{js_injections, OBJECT_INJECTIONS_FALSE, OBJECT_INJECTIONS_TRUE};
use crate::request::AttackRequest;
use crate::response::CapturedResponse;
use std::collections::HashMap;
use tracing::warn;

const TRUE_REGEX: &str = ".*";
const FALSE_REGEX: &str = "a^";
const TRUE_REGEX_OBJECT: &str = r#"{"$regex": ".*"}"#;
const FALSE_REGEX_OBJECT: &str = r#"{"$regex": "a^"}"#;

pub async fn blind_boolean_injection_test(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = iterate_regex_query_injections(att).await;
    findings.extend(iterate_regex_body_injections(att).await);
    findings.extend(iterate_js_query_injections(att).await);
    findings.extend(iterate_js_body_injections(att).await);
    findings.extend(iterate_object_injections(att).await);
    unique(findings)
}

/// Decide injectability from a baseline and a true/false response pair.
/// Error-tainted probes are left to the error detector; a pair where both or
/// neither response diverges proves nothing.
pub fn is_blind_injectable(
    baseline: &CapturedResponse,
    true_res: &CapturedResponse,
    false_res: &CapturedResponse,
) -> bool {
    if has_nosql_error(&false_res.body) || has_nosql_error(&true_res.body) {
        return false;
    }
    if has_js_error(&false_res.body) || has_js_error(&true_res.body) {
        // A JS error suggests injection, but no usable boolean test string.
        return false;
    }

    let true_matches = baseline.content_equals(true_res);
    let false_matches = baseline.content_equals(false_res);
    true_matches != false_matches
}

/// Send baseline, true and false probes (cache bypassed) and emit a finding
/// when the decision procedure fires. Probes that fail in transport
/// contribute nothing.
async fn run_injection(
    baseline: &mut AttackRequest,
    true_obj: &mut AttackRequest,
    false_obj: &mut AttackRequest,
    key: &str,
    injected_key: &str,
    true_value: &str,
    false_value: &str,
) -> Option<Injection> {
    baseline.ignore_cache = true;
    true_obj.ignore_cache = true;
    false_obj.ignore_cache = true;

    let baseline_res = match baseline.send().await {
        Ok(res) => res,
        Err(e) => {
            warn!("blind baseline failed: {}", e);
            return None;
        }
    };
    let true_res = match true_obj.send().await {
        Ok(res) => res,
        Err(e) => {
            warn!("blind true probe failed: {}", e);
            return None;
        }
    };
    let false_res = match false_obj.send().await {
        Ok(res) => res,
        Err(e) => {
            warn!("blind false probe failed: {}", e);
            return None;
        }
    };

    if is_blind_injectable(&baseline_res, &true_res, &false_res) {
        return Some(Injection {
            kind: InjectionKind::Blind,
            request: baseline.snapshot(),
            injectable_param: key.to_string(),
            injected_param: injected_key.to_string(),
            injected_value: format!("true: {}, false: {}", true_value, false_value),
        });
    }
    None
}

/// Query parameters rewritten as `key[$regex]` with always-true / always-
/// false expressions. A neutral baseline (every parameter emptied) widens
/// the match surface when the application tolerates it.
async fn iterate_regex_query_injections(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = Vec::new();
    let keys: Vec<String> = att.query_params().into_iter().map(|(k, _)| k).collect();

    let mut baseline = att.copy();
    let mut neutral = att.copy();
    for key in &keys {
        neutral.set_query_param(key, "");
    }
    match neutral.send().await {
        Ok(res) if !has_js_error(&res.body) && !has_nosql_error(&res.body) => {
            baseline = neutral;
        }
        Ok(_) => {}
        Err(e) => warn!("neutral baseline failed: {}", e),
    }

    // Parameters can interact, so every combination is tried.
    for keylist in subsets(&keys) {
        let mut true_obj = baseline.copy();
        for key in &keylist {
            true_obj.replace_query_param(key, &format!("{}[$regex]", key), TRUE_REGEX);
        }

        // Then flip each selected key to the false regex individually.
        for key in &keylist {
            let injected_key = format!("{}[$regex]", key);
            let mut false_obj = true_obj.copy();
            false_obj.set_query_param(&injected_key, FALSE_REGEX);

            if let Some(finding) = run_injection(
                &mut baseline,
                &mut true_obj,
                &mut false_obj,
                key,
                &injected_key,
                TRUE_REGEX,
                FALSE_REGEX,
            )
            .await
            {
                findings.push(finding);
            }
        }
    }
    unique(findings)
}

/// Body fields replaced with `{"$regex": ...}` documents, keys included.
async fn iterate_regex_body_injections(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = Vec::new();
    let mut baseline = att.copy();
    let inject_keys = true;

    for keylist in subsets(&att.body_values) {
        let mut true_obj = att.copy();
        for item in &keylist {
            true_obj.replace_body_object(
                &item.value,
                TRUE_REGEX_OBJECT,
                inject_keys,
                item.placement as isize,
            );
        }

        let mut false_obj = true_obj.copy();
        for (i, item) in keylist.iter().enumerate() {
            false_obj.replace_body_object(
                TRUE_REGEX_OBJECT,
                FALSE_REGEX_OBJECT,
                inject_keys,
                i as isize,
            );

            if let Some(finding) = run_injection(
                &mut baseline,
                &mut true_obj,
                &mut false_obj,
                &item.value,
                &item.value,
                TRUE_REGEX_OBJECT,
                FALSE_REGEX_OBJECT,
            )
            .await
            {
                findings.push(finding);
            }

            false_obj.replace_body_object(FALSE_REGEX_OBJECT, TRUE_REGEX_OBJECT, inject_keys, -1);
        }
    }
    unique(findings)
}

/// JavaScript boolean pairs appended to query parameter values, under both
/// quote styles.
async fn iterate_js_query_injections(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = Vec::new();
    let params: HashMap<String, String> = att.query_params().into_iter().collect();
    let keys: Vec<String> = att.query_params().into_iter().map(|(k, _)| k).collect();
    let mut baseline = att.copy();

    for quote in ["'", "\""] {
        let injections = js_injections(quote);
        for keylist in subsets(&keys) {
            for (true_js, false_list) in &injections {
                let mut true_obj = att.copy();
                for key in &keylist {
                    true_obj.set_query_param(key, &format!("{}{}", params[key], true_js));
                }

                let mut false_obj = true_obj.copy();
                for key in &keylist {
                    for false_js in false_list {
                        let injection = format!("{}{}", params[key], false_js);
                        false_obj.set_query_param(key, &injection);

                        if let Some(finding) = run_injection(
                            &mut baseline,
                            &mut true_obj,
                            &mut false_obj,
                            key,
                            key,
                            &format!("{}{}", params[key], true_js),
                            &injection,
                        )
                        .await
                        {
                            findings.push(finding);
                        }

                        false_obj.set_query_param(key, &params[key]);
                    }
                }
            }
        }
    }
    unique(findings)
}

/// JavaScript boolean pairs spliced into body values, quote-wrapped.
/// Only the single-quote variant is enumerated here.
async fn iterate_js_body_injections(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = Vec::new();
    let mut baseline = att.copy();

    for quote in ["'"] {
        let injections = js_injections(quote);
        for keylist in subsets(&att.body_values) {
            for (true_js, false_list) in &injections {
                let mut true_obj = att.copy();
                for item in &keylist {
                    let injection = format!("\"{}{}\"", item.value, true_js);
                    true_obj.replace_body_object(
                        &item.value,
                        &injection,
                        false,
                        item.placement as isize,
                    );
                }

                for (i, item) in keylist.iter().enumerate() {
                    for false_js in false_list {
                        let mut false_obj = true_obj.copy();
                        let injection = format!("\"{}{}\"", item.value, false_js);
                        false_obj.replace_body_object(
                            &format!("{}{}", item.value, true_js),
                            &injection,
                            false,
                            i as isize,
                        );

                        if let Some(finding) = run_injection(
                            &mut baseline,
                            &mut true_obj,
                            &mut false_obj,
                            &item.value,
                            &item.value,
                            &format!("{}{}", item.value, true_js),
                            &injection,
                        )
                        .await
                        {
                            findings.push(finding);
                        }
                    }
                }
            }
        }
    }
    unique(findings)
}

/// Whole-body object injections: replace the entire body with matching /
/// non-matching Mongo documents.
async fn iterate_object_injections(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = Vec::new();
    let mut baseline = att.copy();
    let mut true_request = att.copy();
    let mut false_request = att.copy();

    for true_object in OBJECT_INJECTIONS_TRUE {
        true_request.set_body(true_object);
        for false_object in OBJECT_INJECTIONS_FALSE {
            false_request.set_body(false_object);

            if let Some(finding) = run_injection(
                &mut baseline,
                &mut true_request,
                &mut false_request,
                "Body",
                "",
                true_object,
                false_object,
            )
            .await
            {
                findings.push(finding);
            }
        }
    }
    unique(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> CapturedResponse {
        CapturedResponse {
            url: "http://example.com/".to_string(),
            body: body.to_string(),
            headers: Vec::new(),
            status,
        }
    }

    #[test]
    fn test_injectable_when_exactly_one_diverges() {
        let baseline = response(200, "result set");
        assert!(is_blind_injectable(
            &baseline,
            &response(200, "result set"),
            &response(200, "")
        ));
        assert!(is_blind_injectable(
            &baseline,
            &response(200, ""),
            &response(200, "result set")
        ));
    }

    #[test]
    fn test_not_injectable_when_both_match() {
        let baseline = response(200, "result set");
        assert!(!is_blind_injectable(
            &baseline,
            &response(200, "result set"),
            &response(200, "result set")
        ));
    }

    #[test]
    fn test_not_injectable_when_both_diverge() {
        let baseline = response(200, "result set");
        assert!(!is_blind_injectable(
            &baseline,
            &response(200, "noise-1"),
            &response(200, "noise-2")
        ));
    }

    #[test]
    fn test_error_signatures_suppress_decision() {
        let baseline = response(200, "result set");
        assert!(!is_blind_injectable(
            &baseline,
            &response(200, "result set"),
            &response(500, "MongoError: bad query")
        ));
        assert!(!is_blind_injectable(
            &baseline,
            &response(200, "result set"),
            &response(500, "SyntaxError: unexpected token")
        ));
    }

    #[test]
    fn test_status_change_counts_as_divergence() {
        let baseline = response(200, "ok");
        assert!(is_blind_injectable(
            &baseline,
            &response(200, "ok"),
            &response(404, "ok")
        ));
    }
}
