//! SBI HTTP/2 Client
//!
//! HTTP/2 (prior knowledge) client using hyper for SBI communication.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http2::SendRequest;
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::{SbiError, SbiResult};
use crate::message::{encode_component, SbiRequest, SbiResponse};
use crate::types::UriScheme;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// SBI Client configuration
#[derive(Debug, Clone)]
pub struct SbiClientConfig {
    /// URI scheme; only cleartext HTTP/2 is dialled
    pub scheme: UriScheme,
    /// Target host (FQDN or IP)
    pub host: String,
    /// Target port
    pub port: u16,
    pub connect_timeout: Duration,
    /// Upper bound for a single request/response exchange
    pub request_timeout: Duration,
}

impl Default for SbiClientConfig {
    fn default() -> Self {
        Self {
            scheme: UriScheme::Http,
            host: "localhost".to_string(),
            port: 80,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl SbiClientConfig {
    /// Create a new client configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the base URI
    pub fn base_uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// `host:port` used as connection-pool key
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection state for HTTP/2
struct ConnectionState {
    sender: SendRequest<Full<Bytes>>,
}

/// SBI Client - HTTP/2 client for SBI communication
/// Matches ogs_sbi_client_t
pub struct SbiClient {
    config: SbiClientConfig,
    /// Connection state (lazily initialized)
    connection: Arc<Mutex<Option<ConnectionState>>>,
}

impl SbiClient {
    /// Create a new SBI client
    pub fn new(config: SbiClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a client with host and port
    pub fn with_host_port(host: impl Into<String>, port: u16) -> Self {
        Self::new(SbiClientConfig::new(host, port))
    }

    /// Create a client for the authority of an absolute URI
    /// (`http://host[:port]/...`), as carried in callback references.
    pub fn for_uri(uri: &str, request_timeout: Duration) -> SbiResult<Self> {
        let parsed: Uri = uri
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{uri}: {e}")))?;
        let scheme = parsed
            .scheme_str()
            .and_then(UriScheme::from_str_opt)
            .ok_or_else(|| SbiError::InvalidUri(format!("{uri}: missing or unknown scheme")))?;
        let host = parsed
            .host()
            .ok_or_else(|| SbiError::InvalidUri(format!("{uri}: missing host")))?;
        let port = parsed.port_u16().unwrap_or_else(|| scheme.default_port());

        let mut config = SbiClientConfig::new(host.trim_matches(|c| c == '[' || c == ']'), port)
            .with_request_timeout(request_timeout);
        config.scheme = scheme;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SbiClientConfig {
        &self.config
    }

    /// Connect to the server
    async fn connect(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        if self.config.scheme == UriScheme::Https {
            return Err(SbiError::ClientError(format!(
                "https is not supported for {}",
                self.config.authority()
            )));
        }

        let addr = self.config.authority();

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SbiError::Timeout)?
            .map_err(|e| SbiError::ConnectionError(e.to_string()))?;

        let io = TokioIo::new(stream);

        let (sender, conn) =
            hyper::client::conn::http2::handshake(hyper_util::rt::TokioExecutor::new(), io)
                .await
                .map_err(|e| SbiError::ConnectionError(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::warn!("HTTP/2 connection error: {e}");
            }
        });

        Ok(sender)
    }

    /// Get or create a connection
    async fn get_connection(&self) -> SbiResult<SendRequest<Full<Bytes>>> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(ref state) = *conn_guard {
            if state.sender.is_ready() {
                return Ok(state.sender.clone());
            }
        }

        let sender = self.connect().await?;
        *conn_guard = Some(ConnectionState {
            sender: sender.clone(),
        });
        Ok(sender)
    }

    /// Send an SBI request and receive a response
    pub async fn send_request(&self, request: SbiRequest) -> SbiResult<SbiResponse> {
        let mut sender = self.get_connection().await?;

        let uri_str = if request.header.uri.starts_with("http") {
            request.header.uri.clone()
        } else {
            format!("{}{}", self.config.base_uri(), request.header.uri)
        };

        let uri_with_params = if request.http.params.is_empty() {
            uri_str
        } else {
            let mut params: Vec<String> = request
                .http
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect();
            params.sort();
            let separator = if uri_str.contains('?') { '&' } else { '?' };
            format!("{}{}{}", uri_str, separator, params.join("&"))
        };

        let uri: Uri = uri_with_params
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("{uri_with_params}: {e}")))?;

        let method = match request.header.method.to_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "OPTIONS" => Method::OPTIONS,
            other => return Err(SbiError::InvalidMethod(other.to_string())),
        };

        let body = request
            .http
            .content
            .map(|c| Full::new(Bytes::from(c)))
            .unwrap_or_else(|| Full::new(Bytes::new()));

        let mut req_builder = Request::builder().method(method).uri(uri);

        for (key, value) in &request.http.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        let http_request = req_builder
            .body(body)
            .map_err(|e| SbiError::ClientError(e.to_string()))?;

        // The whole exchange, including reading the body, is bounded
        tokio::time::timeout(self.config.request_timeout, async {
            let response = sender
                .send_request(http_request)
                .await
                .map_err(|e| SbiError::HyperError(e.to_string()))?;
            Self::convert_response(response).await
        })
        .await
        .map_err(|_| SbiError::Timeout)?
    }

    /// Convert hyper response to SbiResponse
    async fn convert_response(response: hyper::Response<Incoming>) -> SbiResult<SbiResponse> {
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SbiError::InvalidResponse(e.to_string()))?
            .to_bytes();

        let content = if body_bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&body_bytes).to_string())
        };

        let mut sbi_response = SbiResponse::with_status(status);
        sbi_response.http.headers = headers;
        sbi_response.http.content = content;

        Ok(sbi_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config() {
        let config = SbiClientConfig::new("127.0.0.20", 7777)
            .with_connect_timeout(Duration::from_secs(10))
            .with_request_timeout(Duration::from_millis(1500));

        assert_eq!(config.base_uri(), "http://127.0.0.20:7777");
        assert_eq!(config.authority(), "127.0.0.20:7777");
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_client_for_uri() {
        let client =
            SbiClient::for_uri("http://10.10.0.5:8080/nsmf-callback/vn-group", Duration::from_secs(2))
                .unwrap();
        assert_eq!(client.config().host, "10.10.0.5");
        assert_eq!(client.config().port, 8080);

        let client = SbiClient::for_uri("http://smf.example.org/cb", Duration::from_secs(2)).unwrap();
        assert_eq!(client.config().port, 80);

        assert!(SbiClient::for_uri("/relative/only", Duration::from_secs(2)).is_err());
    }

    #[tokio::test]
    async fn test_https_is_rejected() {
        let client = SbiClient::for_uri("https://smf.example.org/cb", Duration::from_secs(1)).unwrap();
        let result = client.send_request(SbiRequest::get("/cb")).await;
        assert!(matches!(result, Err(SbiError::ClientError(_))));
    }
}
