//! NextGCore UDM Parameter Provisioning Library
//!
//! Nudm_PP 5G VN group management: internal group id allocation, member
//! validation against the UDR, configuration diffing, and change
//! notifications to subscribed network functions.

pub mod config;
pub mod config_diff;
pub mod context;
pub mod error;
pub mod id_allocator;
pub mod member_validator;
pub mod model;
pub mod notify;
pub mod nudm_pp_handler;
pub mod nudr_client;
pub mod sbi_path;
pub mod subscription;
pub mod vn_group;


pub use config::{ConfigError, UdmPpConfig};
pub use config_diff::{diff, ConfigDiff};
pub use context::{PlmnId, UdmPpContext, DEFAULT_SERVICE_ID};
pub use error::VnGroupError;
pub use id_allocator::{IdentifierAllocator, RandomSuffix, SuffixSource};
pub use member_validator::MemberValidator;
pub use notify::{NotificationDispatcher, NotificationSender, NotifyError, NotifyOutcome};
pub use nudm_pp_handler::{dispatch, handle, PpRequest, PpResponse};
pub use nudr_client::{GroupDataRepository, PatchOutcome, RepositoryError, UdrClient};
pub use sbi_path::{pp_sbi_close, pp_sbi_open, SbiNotificationSender};
pub use subscription::SubscriptionRegistry;
pub use vn_group::{
    EngineOptions, GroupIdKey, GroupIdentifiersQuery, GroupProvisioningEngine, ModifyOutcome,
    SubscriptionCreated, ANY_UE,
};
