//! SBI Constants
//!
//! HTTP status codes, methods, headers, content types and the 3GPP
//! application error causes carried in `ProblemDetails.cause`.

/// HTTP Status Codes
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const NO_CONTENT: u16 = 204;
    pub const BAD_REQUEST: u16 = 400;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// HTTP Methods
pub mod method {
    pub const DELETE: &str = "DELETE";
    pub const GET: &str = "GET";
    pub const PATCH: &str = "PATCH";
    pub const POST: &str = "POST";
    pub const PUT: &str = "PUT";
}

/// HTTP Headers
pub mod header {
    pub const ACCEPT: &str = "Accept";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const LOCATION: &str = "Location";
}

/// Content Types
pub mod content_type {
    pub const APPLICATION_JSON: &str = "application/json";
    pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";
    pub const APPLICATION_PATCH_JSON: &str = "application/json-patch+json";
}

/// Application error causes (TS 29.500 / TS 29.503)
pub mod cause {
    pub const MANDATORY_IE_INCORRECT: &str = "MANDATORY_IE_INCORRECT";
    pub const MANDATORY_IE_MISSING: &str = "MANDATORY_IE_MISSING";
    pub const INVALID_MSG_FORMAT: &str = "INVALID_MSG_FORMAT";
    pub const DATA_NOT_FOUND: &str = "DATA_NOT_FOUND";
    pub const RESOURCE_URI_STRUCTURE_NOT_FOUND: &str = "RESOURCE_URI_STRUCTURE_NOT_FOUND";
    pub const CREATION_NOT_ALLOWED: &str = "CREATION_NOT_ALLOWED";
    pub const MODIFICATION_NOT_ALLOWED: &str = "MODIFICATION_NOT_ALLOWED";
    pub const SYSTEM_FAILURE: &str = "SYSTEM_FAILURE";
    pub const TIMED_OUT_REQUEST: &str = "TIMED_OUT_REQUEST";
    pub const INSERT_GROUPID_FAILURE: &str = "INSERT_GROUPID_FAILURE";
    pub const UDM_CREATE_GROUP_UDR_ERROR: &str = "UDM_CREATE_GROUP_UDR_ERROR";
}
