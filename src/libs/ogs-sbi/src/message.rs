//! SBI Message Structures
//!
//! Request/response envelopes exchanged over the SBI and the RFC 7807
//! `ProblemDetails` body used for every error answer.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{content_type, header};

/// Escaped in a single path segment or query key/value
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode one path segment or query key/value
pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Percent-decode one path segment or query key/value
pub fn decode_component(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// SBI Header - method and request target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SbiHeader {
    /// HTTP method (GET, POST, PUT, DELETE, PATCH, OPTIONS)
    pub method: String,
    /// Full URI (path and optional query)
    pub uri: String,
}

impl SbiHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new header with method and URI
    pub fn with_method_uri(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
        }
    }

    /// URI path without the query component
    pub fn path(&self) -> &str {
        let uri = self.uri.as_str();
        // Absolute-form targets carry scheme and authority ahead of the path
        let uri = match uri.find("://") {
            Some(pos) => {
                let rest = &uri[pos + 3..];
                rest.find('/').map(|p| &rest[p..]).unwrap_or("/")
            }
            None => uri,
        };
        uri.split('?').next().unwrap_or(uri)
    }

    /// Non-empty path segments, percent-decoded,
    /// e.g. `["nudm-pp", "v1", "5g-vn-groups", "grp@example.com"]`
    pub fn path_segments(&self) -> Vec<String> {
        self.path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(decode_component)
            .collect()
    }
}

/// SBI HTTP Message - query parameters, headers and body
#[derive(Debug, Clone, Default)]
pub struct SbiHttpMessage {
    /// Query parameters
    pub params: HashMap<String, String>,
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Body content
    pub content: Option<String>,
}

impl SbiHttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get_param(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Store the parameters of a raw query string, percent-decoded
    pub fn set_query(&mut self, query: &str) {
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.set_param(decode_component(key), decode_component(value));
        }
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Get a header; names are matched case-insensitively
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(key).or_else(|| {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }
}

/// SBI Request - matches ogs_sbi_request_t
#[derive(Debug, Clone, Default)]
pub struct SbiRequest {
    pub header: SbiHeader,
    pub http: SbiHttpMessage,
}

impl SbiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_method(method: &str, uri: impl Into<String>) -> Self {
        Self {
            header: SbiHeader::with_method_uri(method, uri),
            http: SbiHttpMessage::new(),
        }
    }

    /// Request as received: query parameters come from the target
    pub fn from_target(method: impl Into<String>, target: impl Into<String>) -> Self {
        let header = SbiHeader::with_method_uri(method, target);
        let mut http = SbiHttpMessage::new();
        if let Some((_, query)) = header.uri.split_once('?') {
            http.set_query(query);
        }
        Self { header, http }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::with_method("GET", uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::with_method("POST", uri)
    }

    pub fn put(uri: impl Into<String>) -> Self {
        Self::with_method("PUT", uri)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::with_method("DELETE", uri)
    }

    pub fn patch(uri: impl Into<String>) -> Self {
        Self::with_method("PATCH", uri)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http
            .set_header(header::CONTENT_TYPE, content_type::APPLICATION_JSON);
        Ok(self)
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header(header::CONTENT_TYPE, content_type);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_param(key, value);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Parse the JSON body; an absent body is an error
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.http.content.as_deref().unwrap_or(""))
    }
}

/// SBI Response - matches ogs_sbi_response_t
#[derive(Debug, Clone, Default)]
pub struct SbiResponse {
    pub header: SbiHeader,
    pub http: SbiHttpMessage,
    /// HTTP status code
    pub status: u16,
}

impl SbiResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a response with status code
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn created() -> Self {
        Self::with_status(201)
    }

    pub fn no_content() -> Self {
        Self::with_status(204)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http
            .set_header(header::CONTENT_TYPE, content_type::APPLICATION_JSON);
        Ok(self)
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header(header::CONTENT_TYPE, content_type);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether a non-empty body was received
    pub fn has_body(&self) -> bool {
        self.http
            .content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }

    /// Parse JSON body
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        let content = self.http.content.as_deref().unwrap_or("{}");
        serde_json::from_str(content)
    }

    /// Parse a `ProblemDetails` body if the peer sent one
    pub fn problem_details(&self) -> Option<ProblemDetails> {
        if !self.has_body() {
            return None;
        }
        self.json_body::<ProblemDetails>().ok()
    }
}

/// Problem Details - RFC 7807 compliant error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// A short, human-readable summary of the problem type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Application-specific error cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Invalid parameters
    #[serde(rename = "invalidParams", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<InvalidParam>>,
}

impl ProblemDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_invalid_params(mut self, params: Vec<InvalidParam>) -> Self {
        if !params.is_empty() {
            self.invalid_params = Some(params);
        }
        self
    }
}

/// Invalid Parameter for ProblemDetails
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidParam {
    /// Parameter name (or JSON pointer)
    pub param: String,
    /// Reason why the parameter is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
