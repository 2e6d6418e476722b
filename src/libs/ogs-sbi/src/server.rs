//! SBI HTTP/2 Server
//!
//! HTTP/2 (prior knowledge) server using hyper for SBI communication.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::constants::{content_type, header};
use crate::error::{SbiError, SbiResult};
use crate::message::{ProblemDetails, SbiRequest, SbiResponse};

/// Server configuration
#[derive(Debug, Clone)]
pub struct SbiServerConfig {
    /// Bind address
    pub addr: SocketAddr,
}

impl Default for SbiServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 7777)),
        }
    }
}

impl SbiServerConfig {
    /// Create a new server configuration
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Create configuration with host and port
    pub fn with_host_port(host: impl AsRef<str>, port: u16) -> SbiResult<Self> {
        let addr: SocketAddr = format!("{}:{}", host.as_ref(), port)
            .parse()
            .map_err(|e| SbiError::InvalidUri(format!("Invalid address: {}", e)))?;
        Ok(Self::new(addr))
    }
}

/// Request handler trait
pub trait SbiRequestHandler: Send + Sync + 'static {
    /// Handle an incoming SBI request
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>>;
}

/// Function-based request handler
impl<F, Fut> SbiRequestHandler for F
where
    F: Fn(SbiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SbiResponse> + Send + 'static,
{
    fn handle(&self, request: SbiRequest) -> Pin<Box<dyn Future<Output = SbiResponse> + Send>> {
        Box::pin(self(request))
    }
}

/// Hyper service wrapper
struct SbiService<H: SbiRequestHandler> {
    handler: Arc<H>,
}

impl<H: SbiRequestHandler> Clone for SbiService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<H: SbiRequestHandler> Service<Request<Incoming>> for SbiService<H> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.handler.clone();

        Box::pin(async move {
            let sbi_request = convert_request(req).await;
            let sbi_response = handler.handle(sbi_request).await;
            Ok(convert_response(sbi_response))
        })
    }
}

/// Convert hyper request to SbiRequest; path and query stay as received and
/// query parameters are percent-decoded
async fn convert_request(req: Request<Incoming>) -> SbiRequest {
    let method = req.method().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().to_string());

    let mut request = SbiRequest::from_target(method, target);
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            request.http.set_header(key.to_string(), v.to_string());
        }
    }

    if let Ok(body) = req.into_body().collect().await {
        let bytes = body.to_bytes();
        if !bytes.is_empty() {
            request
                .http
                .set_content(String::from_utf8_lossy(&bytes).to_string());
        }
    }

    request
}

/// Convert SbiResponse to hyper response
fn convert_response(sbi_response: SbiResponse) -> Response<Full<Bytes>> {
    let status = sbi_response.status;
    let mut builder = Response::builder().status(status);

    for (key, value) in &sbi_response.http.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = sbi_response
        .http
        .content
        .map(|c| Full::new(Bytes::from(c)))
        .unwrap_or_else(|| Full::new(Bytes::new()));

    builder.body(body).unwrap_or_else(|e| {
        log::error!("Invalid response (status {}): {}", status, e);
        let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Server state
enum ServerState {
    Stopped,
    Running(oneshot::Sender<()>),
}

/// SBI Server - HTTP/2 server for SBI communication
/// Matches ogs_sbi_server_t
pub struct SbiServer {
    /// Server configuration
    config: SbiServerConfig,
    /// Server state
    state: Arc<Mutex<ServerState>>,
}

impl SbiServer {
    /// Create a new SBI server
    pub fn new(config: SbiServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ServerState::Stopped)),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &SbiServerConfig {
        &self.config
    }

    /// Start the server with a request handler
    pub async fn start<H: SbiRequestHandler>(&self, handler: H) -> SbiResult<()> {
        let mut state = self.state.lock().await;

        if matches!(*state, ServerState::Running(_)) {
            return Err(SbiError::ServerError("Server already running".to_string()));
        }

        let listener = TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| SbiError::ServerError(format!("Failed to bind: {}", e)))?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *state = ServerState::Running(shutdown_tx);
        drop(state);

        let handler = Arc::new(handler);
        let addr = self.config.addr;
        log::debug!("SBI server bound to {}", addr);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = SbiService {
                                    handler: handler.clone(),
                                };

                                tokio::spawn(async move {
                                    if let Err(e) = http2::Builder::new(
                                        hyper_util::rt::TokioExecutor::new()
                                    )
                                    .serve_connection(io, service)
                                    .await
                                    {
                                        log::warn!("HTTP/2 connection error: {}", e);
                                    }
                                });
                            }
                            Err(e) => {
                                log::error!("[{}] Accept error: {}", addr, e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the server
    pub async fn stop(&self) -> SbiResult<()> {
        let mut state = self.state.lock().await;

        if let ServerState::Running(shutdown_tx) =
            std::mem::replace(&mut *state, ServerState::Stopped)
        {
            let _ = shutdown_tx.send(());
        }

        Ok(())
    }

    /// Check if the server is running
    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        matches!(*state, ServerState::Running(_))
    }
}

/// Send a `ProblemDetails` body with the status it carries
pub fn send_problem(problem: &ProblemDetails) -> SbiResponse {
    let status = problem
        .status
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(500);

    SbiResponse::with_status(status)
        .with_json_body(problem)
        .map(|r| r.with_header(header::CONTENT_TYPE, content_type::APPLICATION_PROBLEM_JSON))
        .unwrap_or_else(|_| SbiResponse::with_status(status))
}

/// Helper function to send an error response
pub fn send_error(status: u16, title: &str, detail: &str, cause: Option<&str>) -> SbiResponse {
    let problem = ProblemDetails::with_status(status as i32)
        .with_title(title)
        .with_detail(detail);

    let problem = if let Some(c) = cause {
        problem.with_cause(c)
    } else {
        problem
    };

    send_problem(&problem)
}

/// Send a 400 Bad Request error response
pub fn send_bad_request(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(400, "Bad Request", detail, cause)
}

/// Send a 403 Forbidden error response
pub fn send_forbidden(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(403, "Forbidden", detail, cause)
}

/// Send a 404 Not Found error response
pub fn send_not_found(detail: &str, cause: Option<&str>) -> SbiResponse {
    send_error(404, "Not Found", detail, cause)
}

/// Send a 405 Method Not Allowed error response
pub fn send_method_not_allowed(method: &str, resource: &str) -> SbiResponse {
    send_error(
        405,
        "Method Not Allowed",
        &format!("Method {} not allowed for resource {}", method, resource),
        Some("METHOD_NOT_ALLOWED"),
    )
}

/// Send a 500 Internal Server Error response
pub fn send_internal_error(detail: &str) -> SbiResponse {
    send_error(500, "Internal Server Error", detail, Some("SYSTEM_FAILURE"))
}

/// Send a 504 Gateway Timeout error response
pub fn send_gateway_timeout(detail: &str) -> SbiResponse {
    send_error(504, "Gateway Timeout", detail, Some("TIMED_OUT_REQUEST"))
}
