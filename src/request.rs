// src/request.rs
//! The canonical attack request: a mutable HTTP request with structured
//! mutation operations over its query string and body, plus a cache-keyed
//! send. Detectors copy a seed request freely and mutate the copies.

use crate::config::ScanOptions;
use crate::error::ScanError;
use crate::injection::RequestSnapshot;
use crate::raw_request::load_raw_request;
use crate::response::CapturedResponse;
use crate::sender::RequestSender;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// An addressable body field. `placement` is the 0-based occurrence index of
/// `value` among identically-valued fields, used to target one occurrence of
/// a repeated value during substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyItem {
    pub value: String,
    pub placement: usize,
}

pub struct AttackRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: String,
    original_body: String,
    pub body_values: Vec<BodyItem>,
    pub content_length: usize,
    pub ignore_cache: bool,
    cache: HashMap<String, CapturedResponse>,
    sender: Arc<dyn RequestSender>,
}

impl AttackRequest {
    pub fn new(
        options: &ScanOptions,
        sender: Arc<dyn RequestSender>,
    ) -> Result<Self, ScanError> {
        let mut request = if let Some(ref path) = options.request_file {
            let raw = load_raw_request(path, options.require_https)?;
            let mut request = Self::from_parts(raw.method, raw.url, raw.headers, sender);
            request.body = raw.body.clone();
            request.original_body = raw.body;
            request.content_length = request.body.len();
            request.extract_body_values();
            request
        } else if let Some(ref target) = options.target {
            let mut target = target.clone();
            if options.require_https && target.starts_with("http://") {
                target = target.replacen("http://", "https://", 1);
            }
            Self::from_parts("GET".to_string(), Url::parse(&target)?, Vec::new(), sender)
        } else {
            return Err(ScanError::Config(
                "you must specify either a target or a request file to scan".to_string(),
            ));
        };

        if let Some(ref data) = options.request_data {
            if !data.is_empty() {
                request.set_body(data);
                if is_json(&request.body) {
                    request.set_header("Accept", "application/json");
                }
            }
        }

        // A User-Agent parsed from a raw request survives unless an override
        // was supplied.
        if options.user_agent.is_some() || request.header("User-Agent").is_none() {
            request.set_header("User-Agent", &options.user_agent());
        }

        Ok(request)
    }

    fn from_parts(
        method: String,
        url: Url,
        headers: Vec<(String, String)>,
        sender: Arc<dyn RequestSender>,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body: String::new(),
            original_body: String::new(),
            body_values: Vec::new(),
            content_length: 0,
            ignore_cache: false,
            cache: HashMap::new(),
            sender,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Assign the request body and its restoration snapshot. An empty body
    /// flips the method to GET, anything else to POST. JSON bodies keep their
    /// shape; form bodies are canonicalized to their URL-encoded form, which
    /// becomes the new snapshot.
    pub fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
        self.original_body = body.to_string();

        if self.body.is_empty() {
            self.method = "GET".to_string();
            self.content_length = 0;
            self.body_values.clear();
            return;
        }
        self.method = "POST".to_string();

        if is_json(&self.body) {
            self.set_header("Content-Type", "application/json");
        } else {
            self.set_header("Content-Type", "application/x-www-form-urlencoded");
            self.url_encode_body();
            self.original_body = self.body.clone();
        }
        self.extract_body_values();
        self.content_length = self.body.len();
    }

    /// body := snapshot taken at the most recent set_body.
    pub fn restore_body(&mut self) {
        self.body = self.original_body.clone();
        self.content_length = self.body.len();
    }

    /// First value for each query key, in URL order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        for (key, value) in self.url.query_pairs() {
            if !params.iter().any(|(existing, _)| *existing == *key) {
                params.push((key.into_owned(), value.into_owned()));
            }
        }
        params
    }

    pub fn query_string(&self) -> &str {
        self.url.query().unwrap_or("")
    }

    /// Set the first value of `key`, adding the pair when the key is absent.
    pub fn set_query_param(&mut self, key: &str, payload: &str) {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        match pairs.iter_mut().find(|(k, _)| k.as_str() == key) {
            Some((_, value)) => *value = payload.to_string(),
            None => pairs.push((key.to_string(), payload.to_string())),
        }
        self.set_query_pairs(pairs);
    }

    /// Delete every pair under `old_key` and add `(key, value)`.
    pub fn replace_query_param(&mut self, old_key: &str, key: &str, value: &str) {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .filter(|(k, _)| k.as_str() != old_key)
            .collect();
        pairs.push((key.to_string(), value.to_string()));
        self.set_query_pairs(pairs);
    }

    fn set_query_pairs(&mut self, mut pairs: Vec<(String, String)>) {
        // Canonical encoding sorts by key; stable sort keeps the relative
        // order of repeated keys.
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        if pairs.is_empty() {
            self.url.set_query(None);
            return;
        }
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(&pairs);
        let query = serializer.finish();
        self.url.set_query(Some(&query));
    }

    /// Replace a body field, dispatching on the body format. For JSON bodies
    /// the substitution is type-aware; `index` selects the occurrence to
    /// rewrite (-1 for all). For form bodies the key or value matching
    /// `pattern` is replaced.
    pub fn replace_body_object(
        &mut self,
        pattern: &str,
        payload: &str,
        inject_keys: bool,
        index: isize,
    ) {
        if self.body_is_json() {
            self.set_body_json_param(pattern, payload, index);
        } else if let Err(e) = self.set_body_query_param(pattern, payload, inject_keys) {
            // A body that fails to parse leaves the mutation a no-op; the
            // probe is still sent.
            warn!("body mutation skipped: {}", e);
        }
        self.content_length = self.body.len();
    }

    fn body_is_json(&self) -> bool {
        if self.header("Content-Type") == Some("application/json") {
            return true;
        }
        is_json(&self.body)
    }

    fn set_body_json_param(&mut self, pattern: &str, payload: &str, index: isize) {
        match json_type(pattern) {
            JsonType::String => {
                // String fields appear quoted in the body text.
                let quoted = format!("\"{}\"", pattern);
                self.body = str_replace(&self.body, &quoted, payload, index);
            }
            JsonType::Number | JsonType::Boolean | JsonType::Null => {
                self.replace_json_literal(pattern, payload, index);
            }
            JsonType::Other => {
                self.body = str_replace(&self.body, pattern, payload, index);
            }
        }
    }

    /// Replace a bare JSON literal (number, boolean, null). Such literals are
    /// only valid as values: preceded by `[`, `,` or `:` and followed by `,`,
    /// `]` or `}`. The surrounding delimiters survive the substitution.
    fn replace_json_literal(&mut self, pattern: &str, payload: &str, index: isize) {
        let expression = format!(
            r"(?P<prefix>[\[,:]\s*?)(?P<value>{})(?P<suffix>\s*?[,\]\}}])",
            regex::escape(pattern)
        );
        let re = match Regex::new(&expression) {
            Ok(re) => re,
            Err(e) => {
                warn!("literal replace skipped: {}", e);
                return;
            }
        };

        let mut ranges = Vec::new();
        for (count, caps) in re.captures_iter(&self.body).enumerate() {
            if index != -1 && index != count as isize {
                continue;
            }
            if let Some(m) = caps.name("value") {
                ranges.push((m.start(), m.end()));
            }
        }
        let mut body = self.body.clone();
        for (start, end) in ranges.into_iter().rev() {
            body.replace_range(start..end, payload);
        }
        self.body = body;
    }

    fn set_body_query_param(
        &mut self,
        pattern: &str,
        payload: &str,
        replace_key: bool,
    ) -> Result<(), ScanError> {
        let decoded = urlencoding::decode(&self.body.replace('+', "%20"))
            .map_err(|e| ScanError::Parse(format!("body decode failed: {}", e)))?
            .into_owned();

        let mut pairs: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(decoded.as_bytes()).into_owned() {
            match pairs.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, values)) => values.push(value),
                None => pairs.push((key, vec![value])),
            }
        }

        for (key, values) in pairs.iter_mut() {
            if replace_key && key.as_str() == pattern {
                *key = payload.to_string();
            } else {
                // Values always match on their URL-encoded form.
                for value in values.iter_mut() {
                    if urlencoding::encode(value) == pattern {
                        *value = payload.to_string();
                    }
                }
            }
        }

        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &pairs {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        self.body = serializer.finish();
        Ok(())
    }

    fn url_encode_body(&mut self) {
        let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(&pairs);
        self.body = serializer.finish();
    }

    /// Re-derive the addressable body fields from the current body, with a
    /// per-value occurrence counter assigning placements.
    fn extract_body_values(&mut self) {
        self.body_values.clear();

        let values = if is_json(&self.body) {
            flatten_json(&self.body)
        } else {
            extract_query_values(&self.body)
        };

        let mut counter: HashMap<String, usize> = HashMap::new();
        for value in values {
            let placement = counter
                .entry(value.clone())
                .and_modify(|c| *c += 1)
                .or_insert(0);
            self.body_values.push(BodyItem {
                value,
                placement: *placement,
            });
        }
    }

    /// Fingerprint over everything that affects the response.
    pub fn hash(&self) -> String {
        let serial = format!(
            "{}{}{}{}",
            self.body, self.url, self.ignore_cache, self.method
        );
        format!("{:x}", md5::compute(serial))
    }

    /// Deep copy sharing only the sender. The response cache starts empty.
    pub fn copy(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            original_body: self.original_body.clone(),
            body_values: self.body_values.clone(),
            content_length: self.content_length,
            ignore_cache: self.ignore_cache,
            cache: HashMap::new(),
            sender: Arc::clone(&self.sender),
        }
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.clone(),
            url: self.url.to_string(),
            body: self.body.clone(),
        }
    }

    /// Dispatch the request, consulting the per-instance response cache
    /// unless `ignore_cache` is set.
    pub async fn send(&mut self) -> Result<CapturedResponse, ScanError> {
        let key = self.hash();
        if !self.ignore_cache {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let response = self
            .sender
            .send(&self.method, &self.url, &self.headers, &self.body)
            .await?;
        self.cache.insert(key, response.clone());
        Ok(response)
    }
}

/// Replace occurrences of `pattern` in `source`. `index == -1` replaces all;
/// otherwise only the `index`-th occurrence is rewritten, including one that
/// ends the string.
pub fn str_replace(source: &str, pattern: &str, replacement: &str, index: isize) -> String {
    if index == -1 {
        return source.replace(pattern, replacement);
    }

    let components: Vec<&str> = source.split(pattern).collect();
    let last = components.len() - 1;
    let mut result = String::new();
    for (i, component) in components.iter().enumerate() {
        if i == last {
            result.push_str(component);
            if i as isize == index && source.ends_with(pattern) {
                result.push_str(replacement);
            }
        } else if i as isize == index {
            result.push_str(component);
            result.push_str(replacement);
        } else {
            result.push_str(component);
            result.push_str(pattern);
        }
    }
    result
}

/// The scanner treats only JSON objects as JSON bodies; everything else goes
/// through the form-encoded path.
fn is_json(data: &str) -> bool {
    matches!(serde_json::from_str::<Value>(data), Ok(Value::Object(_)))
}

enum JsonType {
    String,
    Number,
    Boolean,
    Null,
    Other,
}

/// Classify a pattern by the JSON type it would have as a document fragment.
/// Anything that fails to parse is treated as a bare string.
fn json_type(data: &str) -> JsonType {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Number(_)) => JsonType::Number,
        Ok(Value::Bool(_)) => JsonType::Boolean,
        Ok(Value::Null) => JsonType::Null,
        Ok(Value::String(_)) => JsonType::String,
        Ok(_) => JsonType::Other,
        Err(_) => JsonType::String,
    }
}

/// Walk a JSON document collecting every object key and every string-coerced
/// scalar, in traversal order.
pub fn flatten_json(data: &str) -> Vec<String> {
    let mut values = Vec::new();
    if let Ok(parsed) = serde_json::from_str::<Value>(data) {
        walk_json(&parsed, &mut values);
    }
    values
}

fn walk_json(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                out.push(key.clone());
                match entry {
                    Value::Object(_) | Value::Array(_) => walk_json(entry, out),
                    scalar => out.push(scalar_text(scalar)),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => walk_json(item, out),
                    scalar => out.push(scalar_text(scalar)),
                }
            }
        }
        scalar => out.push(scalar_text(scalar)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Form bodies yield each key and each of its values, in first-seen order.
fn extract_query_values(body: &str) -> Vec<String> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()).into_owned() {
        match grouped.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }

    let mut out = Vec::new();
    for (key, values) in grouped {
        out.push(key);
        out.extend(values);
    }
    out
}
