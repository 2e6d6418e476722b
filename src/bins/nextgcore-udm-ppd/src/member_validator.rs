//! Group member validation
//!
//! Every proposed member must already have access and mobility policy data in
//! the UDR. Members are checked one by one and the first failure aborts.

use std::sync::Arc;

use crate::error::{VnGroupError, NO_SUBSCRIPTION_DATA};
use crate::nudr_client::{GroupDataRepository, RepositoryError};

pub struct MemberValidator {
    repository: Arc<dyn GroupDataRepository>,
}

impl MemberValidator {
    pub fn new(repository: Arc<dyn GroupDataRepository>) -> Self {
        Self { repository }
    }

    pub async fn validate_members(&self, members: &[String]) -> Result<(), VnGroupError> {
        for member in members {
            match self.repository.get_member_subscription(member).await {
                Ok(()) => {}
                Err(RepositoryError::Remote {
                    status,
                    cause,
                    detail,
                }) => {
                    log::warn!("[{}] no subscription data: {} ({})", member, detail, status);
                    return Err(VnGroupError::ValidationFailure {
                        member: member.clone(),
                        status,
                        cause,
                        detail: format!("{} {}", detail, NO_SUBSCRIPTION_DATA),
                    });
                }
                Err(e) => {
                    log::error!("[{}] member check failed: {}", member, e);
                    return Err(e.into());
                }
            }
        }
        log::debug!("{} member(s) validated", members.len());
        Ok(())
    }
}
