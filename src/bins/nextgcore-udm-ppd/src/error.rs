//! VN group provisioning errors and their `ProblemDetails` rendering

use ogs_sbi::constants::{cause, status};
use ogs_sbi::{InvalidParam, ProblemDetails};
use thiserror::Error;

use crate::model::ReportItem;
use crate::nudr_client::RepositoryError;

/// Appended to the UDR detail when a member lacks subscription data
pub const NO_SUBSCRIPTION_DATA: &str =
    "[or] At Least One of Group Members have no Subscription Data";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VnGroupError {
    /// A proposed member has no subscription data in the UDR
    #[error("member {member} rejected ({status}): {detail}")]
    ValidationFailure {
        member: String,
        status: u16,
        cause: Option<String>,
        detail: String,
    },

    /// Id space exhausted or the mapping store failed
    #[error("internal group id allocation failed: {0}")]
    AllocationFailure(String),

    #[error("external group id {0} is already mapped")]
    DuplicateExternalId(String),

    #[error("UDR rejected group creation ({status}): {detail}")]
    RemoteCreateRejected {
        status: u16,
        cause: Option<String>,
        detail: String,
    },

    /// The UDR stored a different member list than submitted
    #[error("UDR stored {stored} of {submitted} members")]
    RemoteInconsistency { submitted: usize, stored: usize },

    #[error("{} immutable attribute(s) changed", .0.len())]
    ForbiddenChange(Vec<ReportItem>),

    /// UDR failure passed through verbatim
    #[error("UDR request failed ({status}): {detail}")]
    RemoteFailure {
        status: u16,
        cause: Option<String>,
        detail: String,
    },

    #[error("UDR request timed out")]
    RemoteTimeout,

    #[error("system failure: {0}")]
    SystemFailure(String),

    #[error("unknown group {0}")]
    UnknownGroup(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl VnGroupError {
    pub fn status(&self) -> u16 {
        match self {
            Self::ValidationFailure { status, .. } | Self::RemoteFailure { status, .. } => *status,
            Self::AllocationFailure(_) | Self::DuplicateExternalId(_) | Self::SystemFailure(_) => {
                status::INTERNAL_SERVER_ERROR
            }
            Self::RemoteCreateRejected { .. }
            | Self::RemoteInconsistency { .. }
            | Self::ForbiddenChange(_) => status::FORBIDDEN,
            Self::RemoteTimeout => status::GATEWAY_TIMEOUT,
            Self::UnknownGroup(_) => status::NOT_FOUND,
            Self::InvalidRequest(_) => status::BAD_REQUEST,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::ValidationFailure { cause, .. } | Self::RemoteFailure { cause, .. } => {
                cause.as_deref()
            }
            Self::AllocationFailure(_) | Self::DuplicateExternalId(_) => {
                Some(cause::INSERT_GROUPID_FAILURE)
            }
            Self::RemoteCreateRejected { .. } | Self::RemoteInconsistency { .. } => {
                Some(cause::CREATION_NOT_ALLOWED)
            }
            Self::ForbiddenChange(_) => Some(cause::MODIFICATION_NOT_ALLOWED),
            Self::RemoteTimeout => Some(cause::TIMED_OUT_REQUEST),
            Self::SystemFailure(_) => Some(cause::SYSTEM_FAILURE),
            Self::UnknownGroup(_) => Some(cause::DATA_NOT_FOUND),
            Self::InvalidRequest(_) => Some(cause::MANDATORY_IE_INCORRECT),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::AllocationFailure(_) | Self::DuplicateExternalId(_) => "Insert GroupID failure",
            Self::RemoteCreateRejected { .. } | Self::RemoteInconsistency { .. } => {
                "Group creation failure"
            }
            Self::ForbiddenChange(_) => "Group modification failure",
            _ => match self.status() {
                400 => "Bad Request",
                403 => "Forbidden",
                404 => "Not Found",
                504 => "Gateway Timeout",
                s if s >= 500 => "Internal Server Error",
                _ => "Request failure",
            },
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::ValidationFailure { detail, .. }
            | Self::RemoteCreateRejected { detail, .. }
            | Self::RemoteFailure { detail, .. } => detail.clone(),
            Self::RemoteInconsistency { .. } => {
                format!("{}: {}", cause::UDM_CREATE_GROUP_UDR_ERROR, self)
            }
            _ => self.to_string(),
        }
    }

    pub fn to_problem_details(&self) -> ProblemDetails {
        let mut problem = ProblemDetails::with_status(i32::from(self.status()))
            .with_title(self.title())
            .with_detail(self.detail());
        if let Some(c) = self.cause() {
            problem = problem.with_cause(c);
        }
        if let Self::ForbiddenChange(items) = self {
            problem = problem.with_invalid_params(
                items
                    .iter()
                    .map(|item| InvalidParam {
                        param: item.path.clone(),
                        reason: item.reason.clone(),
                    })
                    .collect(),
            );
        }
        problem
    }

    /// Creation failures collapse into `RemoteCreateRejected`, whatever the cause
    pub(crate) fn create_rejected(err: RepositoryError) -> Self {
        Self::RemoteCreateRejected {
            status: err.status(),
            cause: err.cause().map(str::to_string),
            detail: err.detail(),
        }
    }
}

impl From<RepositoryError> for VnGroupError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Remote {
                status,
                cause,
                detail,
            } => Self::RemoteFailure {
                status,
                cause,
                detail,
            },
            RepositoryError::Timeout => Self::RemoteTimeout,
            RepositoryError::Unavailable(reason) | RepositoryError::Malformed(reason) => {
                Self::SystemFailure(reason)
            }
        }
    }
}
