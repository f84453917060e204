// src/detectors/timing.rs
//! Timing detection: inject server-side sleeps and compare round-trip times
//! against a measured baseline. Every probe bypasses the response cache, and
//! probes are dispatched strictly one at a time so the statistics hold.

use crate::injection::{unique, Injection, InjectionKind};
use crate::payloads::{
    js_timing_strings, JS_PREFIXES, JS_SUFFIXES, JS_TIMING_OBJECT_INJECTIONS_RAW,
    JS_TIMING_STRINGS_RAW,
};
use crate::request::AttackRequest;
use std::time::Instant;
use tracing::warn;

const BASELINE_SAMPLES: usize = 3;

pub async fn timing_injection_test(att: &AttackRequest, sleep_ms: u64) -> Vec<Injection> {
    let mut att = att.copy();
    att.ignore_cache = true;

    let mut findings = iterate_query_timing_injections(&att, sleep_ms).await;
    findings.extend(iterate_body_timing_injections(&att, sleep_ms).await);
    findings.extend(iterate_object_timing_injections(&att, sleep_ms).await);
    findings
}

/// Round-trip time of one dispatch, in seconds. A transport failure still
/// yields the elapsed time; it simply will not pass the classifier.
async fn measure_request(request: &mut AttackRequest) -> f64 {
    let start = Instant::now();
    if let Err(e) = request.send().await {
        warn!("timing probe failed: {}", e);
    }
    start.elapsed().as_secs_f64()
}

async fn measure_baseline(att: &AttackRequest) -> Vec<f64> {
    let mut request = att.copy();
    let mut times = Vec::with_capacity(BASELINE_SAMPLES);
    for _ in 0..BASELINE_SAMPLES {
        times.push(measure_request(&mut request).await);
    }
    times
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (Bessel's correction, n - 1).
fn std_dev_sample(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// A probe is timing-injectable when it exceeds both the injected sleep and
/// the baseline mean by two sample standard deviations.
pub fn is_timing_injectable(baselines: &[f64], injection_time: f64, sleep_ms: u64) -> bool {
    injection_time > sleep_ms as f64 / 1000.0
        && injection_time > mean(baselines) + 2.0 * std_dev_sample(baselines)
}

async fn iterate_query_timing_injections(att: &AttackRequest, sleep_ms: u64) -> Vec<Injection> {
    let baselines = measure_baseline(att).await;
    let mut findings = Vec::new();

    for (key, value) in att.query_params() {
        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for timing_injection in js_timing_strings(JS_TIMING_STRINGS_RAW, sleep_ms) {
                    for keep_value in [String::new(), value.clone()] {
                        let mut attack_obj = att.copy();
                        let attack_string =
                            format!("{}{}{}{}", keep_value, prefix, timing_injection, suffix);
                        attack_obj.set_query_param(&key, &attack_string);

                        let timing = measure_request(&mut attack_obj).await;
                        if is_timing_injectable(&baselines, timing, sleep_ms) {
                            findings.push(Injection {
                                kind: InjectionKind::Timed,
                                request: attack_obj.snapshot(),
                                injectable_param: key.clone(),
                                injected_param: keep_value.clone(),
                                injected_value: attack_string,
                            });
                        }
                    }
                }
            }
        }
    }
    unique(findings)
}

async fn iterate_body_timing_injections(att: &AttackRequest, sleep_ms: u64) -> Vec<Injection> {
    let baselines = measure_baseline(att).await;
    let mut findings = Vec::new();

    for item in &att.body_values {
        for prefix in JS_PREFIXES {
            for suffix in JS_SUFFIXES {
                for timing_injection in js_timing_strings(JS_TIMING_STRINGS_RAW, sleep_ms) {
                    for keep_value in [String::new(), item.value.clone()] {
                        for wrap_quote in ["", "\""] {
                            let mut attack_obj = att.copy();
                            let attack_string = format!(
                                "{}{}{}{}{}{}",
                                wrap_quote, keep_value, prefix, timing_injection, suffix, wrap_quote
                            );
                            attack_obj.replace_body_object(
                                &item.value,
                                &attack_string,
                                false,
                                item.placement as isize,
                            );

                            let timing = measure_request(&mut attack_obj).await;
                            if is_timing_injectable(&baselines, timing, sleep_ms) {
                                findings.push(Injection {
                                    kind: InjectionKind::Timed,
                                    request: attack_obj.snapshot(),
                                    injectable_param: item.value.clone(),
                                    injected_param: item.value.clone(),
                                    injected_value: attack_string,
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    unique(findings)
}

async fn iterate_object_timing_injections(att: &AttackRequest, sleep_ms: u64) -> Vec<Injection> {
    let baselines = measure_baseline(att).await;
    let mut findings = Vec::new();

    let mut timed_request = att.copy();
    for timing_injection in js_timing_strings(JS_TIMING_OBJECT_INJECTIONS_RAW, sleep_ms) {
        timed_request.set_body(&timing_injection);

        let timing = measure_request(&mut timed_request).await;
        if is_timing_injectable(&baselines, timing, sleep_ms) {
            findings.push(Injection {
                kind: InjectionKind::Timed,
                request: timed_request.snapshot(),
                injectable_param: "Whole Body".to_string(),
                injected_param: "Whole Body".to_string(),
                injected_value: timing_injection,
            });
        }
    }
    unique(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_stddev_threshold_is_mean() {
        // Identical baselines collapse the threshold to max(sleep, mean).
        let baselines = [0.6, 0.6, 0.6];
        assert!(is_timing_injectable(&baselines, 0.61, 500));
        assert!(!is_timing_injectable(&baselines, 0.6, 500));
        assert!(!is_timing_injectable(&baselines, 0.59, 500));
    }

    #[test]
    fn test_sleep_floor_applies() {
        // Fast baselines alone never qualify a probe under the sleep floor.
        let baselines = [0.01, 0.01, 0.01];
        assert!(!is_timing_injectable(&baselines, 0.4, 500));
        assert!(is_timing_injectable(&baselines, 0.6, 500));
    }

    #[test]
    fn test_dispersed_baselines_raise_threshold() {
        let baselines = [0.1, 0.5, 0.9];
        // mean 0.5, sample stddev 0.4: threshold 1.3
        assert!(!is_timing_injectable(&baselines, 1.2, 500));
        assert!(is_timing_injectable(&baselines, 1.31, 500));
    }

    #[test]
    fn test_stats_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
        assert_eq!(std_dev_sample(&[1.0]), 0.0);
        let sd = std_dev_sample(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138).abs() < 0.01);
    }
}
