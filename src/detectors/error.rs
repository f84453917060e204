// src/detectors/error.rs
//! Error-based detection: inject characters the Mongo query parser chokes on
//! and watch the response for database error signatures leaking through.

use super::has_nosql_error;
use crate::injection::{Injection, InjectionKind};
use crate::payloads::{MONGO_JSON_ERROR_ATTACKS, MONGO_SPECIAL_CHARS, MONGO_SPECIAL_KEY_CHARS};
use crate::request::AttackRequest;
use tracing::{debug, warn};

pub async fn error_based_injection_test(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = inject_special_chars_into_query(att).await;
    findings.extend(inject_special_chars_into_body(att).await);
    findings
}

async fn inject_special_chars_into_query(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = iterate_query_injections(att, MONGO_SPECIAL_CHARS, false).await;
    findings.extend(iterate_query_injections(att, MONGO_SPECIAL_KEY_CHARS, true).await);
    findings
}

async fn inject_special_chars_into_body(att: &AttackRequest) -> Vec<Injection> {
    let mut findings = iterate_body_injections(att, MONGO_SPECIAL_CHARS, false).await;
    findings.extend(iterate_body_injections(att, MONGO_SPECIAL_KEY_CHARS, true).await);
    findings.extend(iterate_body_injections(att, MONGO_JSON_ERROR_ATTACKS, true).await);
    findings
}

/// Probe each query parameter with each injection string, either as the
/// value or appended to the key. The parameter is restored after each probe,
/// so identical requests hit the response cache.
async fn iterate_query_injections(
    att: &AttackRequest,
    injections: &[&str],
    inject_keys: bool,
) -> Vec<Injection> {
    let mut findings = Vec::new();
    let mut att = att.copy();

    for injection in injections {
        for (key, value) in att.query_params() {
            let snapshot = att.snapshot();

            let (injected_key, injected_value) = if inject_keys {
                let new_key = format!("{}{}", key, injection);
                att.replace_query_param(&key, &new_key, &value);
                (new_key, value.clone())
            } else {
                att.set_query_param(&key, injection);
                (key.clone(), injection.to_string())
            };

            match att.send().await {
                Ok(response) if has_nosql_error(&response.body) => {
                    debug!("error signature for query param {:?}", key);
                    findings.push(Injection {
                        kind: InjectionKind::Error,
                        request: snapshot,
                        injectable_param: key.clone(),
                        injected_param: injected_key.clone(),
                        injected_value,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("error probe failed: {}", e),
            }

            // Reset the parameter to its original shape.
            if inject_keys {
                att.replace_query_param(&injected_key, &key, &value);
            } else {
                att.set_query_param(&key, &value);
            }
        }
    }
    findings
}

async fn iterate_body_injections(
    att: &AttackRequest,
    injections: &[&str],
    inject_keys: bool,
) -> Vec<Injection> {
    let mut findings = Vec::new();
    let mut att = att.copy();

    for injection in injections {
        for item in att.body_values.clone() {
            let snapshot = att.snapshot();
            att.replace_body_object(&item.value, injection, inject_keys, item.placement as isize);

            match att.send().await {
                Ok(response) if has_nosql_error(&response.body) => {
                    debug!("error signature for body value {:?}", item.value);
                    findings.push(Injection {
                        kind: InjectionKind::Error,
                        request: snapshot,
                        injectable_param: item.value.clone(),
                        injected_param: injection.to_string(),
                        injected_value: String::new(),
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("error probe failed: {}", e),
            }

            att.restore_body();
        }
    }
    findings
}
