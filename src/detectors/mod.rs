// src/detectors/mod.rs
//! The three detection engines. Each takes a seed request, spawns mutated
//! copies, and returns the findings it could confirm; transport failures
//! are logged and never abort a scan.

pub mod blind;
pub mod error;
pub mod timing;

pub use blind::blind_boolean_injection_test;
pub use error::error_based_injection_test;
pub use timing::timing_injection_test;

use crate::payloads::{
    js_syntax_error_signatures, mongo_error_signatures, mongoose_error_signatures,
};

/// True when the body carries a Mongo or Mongoose error signature.
pub fn has_nosql_error(body: &str) -> bool {
    mongo_error_signatures().iter().any(|re| re.is_match(body))
        || mongoose_error_signatures().iter().any(|re| re.is_match(body))
}

/// True when the body carries a JavaScript syntax error.
pub fn has_js_error(body: &str) -> bool {
    js_syntax_error_signatures().iter().any(|re| re.is_match(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nosql_error_detection() {
        assert!(has_nosql_error("MongoError: unknown operator"));
        assert!(has_nosql_error("Cast to string failed for value \"{}\""));
        assert!(!has_nosql_error("{\"users\": []}"));
    }

    #[test]
    fn test_js_error_detection() {
        assert!(has_js_error("SyntaxError: missing ) after argument list"));
        assert!(!has_js_error("MongoError: unknown operator"));
    }
}
