//! Generic request dispatcher.
//!
//! Turns a method + path template + caller parameters into exactly one outbound HTTP request and
//! returns whatever the upstream answered. Non-2xx responses are data, not errors; only input
//! validation and transport failures are errors.

use crate::document::null_as_default;
use crate::error::{Result, RexiError};
use base64::Engine as _;
use indexmap::IndexMap;
use indexmap::map::Entry;
use mime::Mime;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}/]+)\}").expect("placeholder regex is valid"));

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Static API key; when set it is sent in `api_key_header` on every call.
    pub api_key: Option<String>,
    pub api_key_header: String,
    /// Replaces the base URL resolved from the spec.
    pub base_url: Option<String>,
    /// Used when a call does not carry its own timeout.
    pub default_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            base_url: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One call as requested by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallRequest {
    pub method: String,
    pub path: String,
    /// Values for `{name}` placeholders. Only used for substitution.
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_params: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: Map<String, Value>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Merged over the default headers; caller values win.
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_headers: Map<String, Value>,
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
}

/// What the upstream answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    /// Final request URL (after redirects).
    pub url: String,
    /// Parsed JSON when the body is JSON, else the raw text.
    pub data: Value,
}

/// A fully validated request, ready to send.
#[derive(Debug)]
pub struct PreparedCall {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    config: DispatcherConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    #[must_use]
    pub fn with_client(client: Client, config: DispatcherConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The configured override if any, else `spec_base_url`.
    #[must_use]
    pub fn effective_base_url<'a>(&'a self, spec_base_url: &'a str) -> &'a str {
        self.config
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(spec_base_url)
    }

    /// Validate `request` and build everything needed to send it. Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`RexiError::Validation`] for an unknown method, a missing path parameter, an
    /// unparsable URL, an invalid header, or an invalid timeout.
    pub fn prepare(&self, spec_base_url: &str, request: &CallRequest) -> Result<PreparedCall> {
        let method = parse_method(&request.method)?;
        let path = substitute_path_params(&request.path, &request.path_params)?;
        let mut url = build_url(self.effective_base_url(spec_base_url), &path)?;
        append_query(&mut url, &request.query);
        let headers = self.build_headers(&request.extra_headers)?;
        let timeout = match request.timeout_seconds {
            Some(secs) => timeout_from_secs(secs)?,
            None => self.config.default_timeout,
        };
        let body = request.body.clone().filter(|b| !b.is_null());

        Ok(PreparedCall {
            method,
            url,
            headers,
            body,
            timeout,
        })
    }

    /// Issue exactly one request. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`RexiError::Validation`] if the request is rejected before sending (see
    /// [`Self::prepare`]) and [`RexiError::Request`] on transport failure or timeout.
    pub async fn call(&self, spec_base_url: &str, request: &CallRequest) -> Result<CallResult> {
        let prepared = self.prepare(spec_base_url, request)?;
        self.send(prepared).await
    }

    async fn send(&self, prepared: PreparedCall) -> Result<CallResult> {
        let PreparedCall {
            method,
            url,
            headers,
            body,
            timeout,
        } = prepared;

        tracing::info!(method = %method, url = %redact_url(&url), "calling upstream");

        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RexiError::Request(sanitize_reqwest_error(&e)))?;

        let status = response.status();
        let url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RexiError::Request(sanitize_reqwest_error(&e)))?;

        tracing::debug!(
            method = %method,
            status = status.as_u16(),
            bytes = bytes.len(),
            "upstream responded"
        );

        Ok(CallResult {
            status: status.as_u16(),
            headers,
            url,
            data: decode_body(&bytes, content_type.as_deref()),
        })
    }

    fn build_headers(&self, extra: &Map<String, Value>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let name = header_name(&self.config.api_key_header)?;
            let mut value = HeaderValue::from_str(key).map_err(|_| {
                RexiError::Validation("configured API key is not a valid header value".into())
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        for (name, value) in extra {
            let value_str = value_to_string(value);
            let value = HeaderValue::from_str(&value_str).map_err(|_| {
                RexiError::Validation(format!("invalid value for header '{name}'"))
            })?;
            headers.insert(header_name(name)?, value);
        }

        Ok(headers)
    }
}

/// Uppercase `method` and check it is one of the verbs an `OpenAPI` path item can carry.
///
/// # Errors
///
/// Returns [`RexiError::Validation`] for anything else.
pub fn parse_method(method: &str) -> Result<Method> {
    match method.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "PUT" => Ok(Method::PUT),
        "POST" => Ok(Method::POST),
        "DELETE" => Ok(Method::DELETE),
        "OPTIONS" => Ok(Method::OPTIONS),
        "HEAD" => Ok(Method::HEAD),
        "PATCH" => Ok(Method::PATCH),
        "TRACE" => Ok(Method::TRACE),
        _ => Err(RexiError::Validation(format!(
            "unsupported HTTP method: {method}"
        ))),
    }
}

/// Replace every `{name}` in `template` with the string form of `params[name]`.
///
/// Values are inserted as-is; encoding is the caller's job.
///
/// # Errors
///
/// Returns [`RexiError::Validation`] if a placeholder has no entry, or its value is not a
/// string, number or boolean.
pub fn substitute_path_params(template: &str, params: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        let value = params
            .get(name)
            .ok_or_else(|| RexiError::Validation(format!("missing path parameter: {name}")))?;
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(RexiError::Validation(format!(
                    "path parameter '{name}' must be a string, number or boolean"
                )));
            }
        };

        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// `base` without trailing `/`, then `/`, then `path` without leading `/`.
///
/// # Errors
///
/// Returns [`RexiError::Validation`] if the result is not a valid URL.
pub fn build_url(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| RexiError::Validation(format!("invalid URL '{joined}': {e}")))
}

fn append_query(url: &mut Url, query: &Map<String, Value>) {
    let pairs = query_pairs(query);
    if pairs.is_empty() {
        return;
    }
    let mut q = url.query_pairs_mut();
    for (k, v) in &pairs {
        q.append_pair(k, v);
    }
}

/// Scalars become one pair, arrays repeat the key, objects are sent as JSON text, `null` is
/// skipped.
fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), value_to_string(item)));
                }
            }
            other => pairs.push((key.clone(), value_to_string(other))),
        }
    }
    pairs
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| RexiError::Validation(format!("invalid header name '{name}'")))
}

fn timeout_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(RexiError::Validation(format!(
            "timeout must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| RexiError::Validation(format!("invalid timeout {secs}: {e}")))
}

/// Repeated headers are joined with `, `.
fn collect_headers(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut out: IndexMap<String, String> = IndexMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match out.entry(name.as_str().to_string()) {
            Entry::Occupied(mut e) => {
                let existing = e.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(e) => {
                e.insert(value);
            }
        }
    }
    out
}

fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return json!({
            "encoding": "base64",
            "mimeType": content_type,
            "data": base64::engine::general_purpose::STANDARD.encode(bytes),
        });
    };

    if text.trim().is_empty() {
        return Value::String(text.to_string());
    }

    match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            if is_json_content_type(content_type) {
                tracing::debug!(error = %e, "response claimed JSON but did not parse; returning text");
            }
            Value::String(text.to_string())
        }
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(m) = content_type.and_then(|ct| ct.parse::<Mime>().ok()) else {
        return false;
    };
    m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
}

/// Convert a JSON value to a string for URL/header parameters.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// URL for logs and error messages: no credentials, query or fragment.
fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    if e.is_timeout() && !msg.contains("timed out") {
        msg.push_str(" (timed out)");
    }
    msg
}
