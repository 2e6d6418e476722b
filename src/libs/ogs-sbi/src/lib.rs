//! NextGCore SBI (Service Based Interface) Library
//!
//! HTTP/2 client and server plumbing shared by the 5G core network functions,
//! built on hyper.
//!
//! # Features
//!
//! - HTTP/2 (prior knowledge) client and server using hyper
//! - OpenAPI message bodies serialized with serde_json
//! - RFC 7807 `ProblemDetails` error responses
//!
//! # Example
//!
//! ```rust,no_run
//! use ogs_sbi::{SbiClient, SbiRequest};
//!
//! async fn example() {
//!     let client = SbiClient::with_host_port("127.0.0.20", 7777);
//!     let response = client
//!         .send_request(SbiRequest::get("/nudr-dr/v1/policy-data/ues/imsi-001010000000001/am-data"))
//!         .await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`types`] - URI scheme
//! - [`constants`] - HTTP status codes, methods, headers and application causes
//! - [`message`] - SBI message structures (request, response, problem details)
//! - [`client`] - HTTP/2 client implementation
//! - [`server`] - HTTP/2 server implementation
//! - [`error`] - Error types

pub mod constants;
pub mod error;
pub mod message;
pub mod types;

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{SbiClient, SbiClientConfig};
pub use error::{SbiError, SbiResult};
pub use message::{
    decode_component, encode_component, InvalidParam, ProblemDetails, SbiHeader, SbiHttpMessage,
    SbiRequest, SbiResponse,
};
pub use server::{
    send_bad_request, send_error, send_forbidden, send_gateway_timeout, send_internal_error,
    send_method_not_allowed, send_not_found, send_problem, SbiRequestHandler, SbiServer,
    SbiServerConfig,
};
pub use types::UriScheme;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = SbiRequest::patch("/nudr-dr/v1/subscription-data/group-data/5g-vn-groups/ext-1")
            .with_param("supported-features", "1")
            .with_header("Accept", "application/json");

        assert_eq!(request.header.method, "PATCH");
        assert_eq!(request.http.get_param("supported-features"), Some(&"1".to_string()));
    }

    #[test]
    fn test_problem_details_serialization() {
        let problem = ProblemDetails::with_status(403)
            .with_title("Forbidden")
            .with_detail("group creation rejected")
            .with_cause("CREATION_NOT_ALLOWED");

        let json = serde_json::to_string(&problem).unwrap();
        assert!(json.contains("403"));
        assert!(json.contains("CREATION_NOT_ALLOWED"));

        let parsed: ProblemDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, Some(403));
        assert_eq!(parsed.cause.as_deref(), Some("CREATION_NOT_ALLOWED"));
    }
}
