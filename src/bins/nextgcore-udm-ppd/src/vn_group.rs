//! 5G VN Group Provisioning
//!
//! Create/get/modify/delete of 5G VN groups, configuration subscriptions and
//! the group identifiers lookup. Each operation is a short-lived workflow
//! spanning the UDR and the external/internal group id map.

use std::sync::Arc;

use crate::config_diff::diff;
use crate::error::VnGroupError;
use crate::id_allocator::IdentifierAllocator;
use crate::member_validator::MemberValidator;
use crate::model::{
    GroupConfiguration, GroupIdentifiers, PatchItem, PatchResult, PpDataEntry, UeId,
    VnGroupSubscription,
};
use crate::notify::{NotificationDispatcher, NotifyOutcome};
use crate::nudr_client::GroupDataRepository;
use ogs_dbi::GroupIdMapping;
use ogs_sbi::constants::status;

const VN_GROUPS_BASE: &str = "/nudm-pp/v1/5g-vn-groups";

/// The only `ueId` served by the per-AF PP data retrieval
pub const ANY_UE: &str = "anyUE";

/// Resource URI of a VN group, used as `resourceId` in notifications
pub fn group_resource_uri(ext_group_id: &str) -> String {
    format!("{}/{}", VN_GROUPS_BASE, ext_group_id)
}

/// Create workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateState {
    Validating,
    Allocating,
    CreatingRemote,
    RollingBack,
    Committed,
    Rejected,
}

struct CreateWorkflow<'a> {
    ext_group_id: &'a str,
    state: CreateState,
}

impl<'a> CreateWorkflow<'a> {
    fn new(ext_group_id: &'a str) -> Self {
        Self {
            ext_group_id,
            state: CreateState::Validating,
        }
    }

    fn transition(&mut self, new_state: CreateState) {
        log::debug!(
            "[{}] VN group create: {:?} -> {:?}",
            self.ext_group_id,
            self.state,
            new_state
        );
        self.state = new_state;
    }

    fn reject(&mut self, err: VnGroupError) -> VnGroupError {
        self.transition(CreateState::Rejected);
        log::warn!("[{}] VN group creation rejected: {}", self.ext_group_id, err);
        err
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Drop the id mapping once the UDR deleted the group
    pub remove_mapping_on_delete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModifyOutcome {
    /// Nothing to change
    Unchanged,
    /// The UDR applied the patch; carries its report when it sent one
    Patched(Option<PatchResult>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionCreated {
    pub location: String,
    pub subscription: VnGroupSubscription,
}

/// Which identifier a group identifiers lookup starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupIdKey {
    External(String),
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIdentifiersQuery {
    pub key: GroupIdKey,
    /// Also return the member UE ids
    pub ue_id_ind: bool,
    pub af_id: Option<String>,
    pub supported_features: Option<String>,
}

pub struct GroupProvisioningEngine {
    repository: Arc<dyn GroupDataRepository>,
    validator: MemberValidator,
    allocator: IdentifierAllocator,
    dispatcher: NotificationDispatcher,
    options: EngineOptions,
}

impl GroupProvisioningEngine {
    pub fn new(
        repository: Arc<dyn GroupDataRepository>,
        allocator: IdentifierAllocator,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            validator: MemberValidator::new(repository.clone()),
            repository,
            allocator,
            dispatcher,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    async fn find_mapping(&self, key: &GroupIdKey) -> Result<Option<GroupIdMapping>, VnGroupError> {
        let store = self.allocator.store();
        let found = match key {
            GroupIdKey::External(id) => store.find_by_external_id(id).await,
            GroupIdKey::Internal(id) => store.find_by_internal_id(id).await,
        };
        found.map_err(|e| VnGroupError::SystemFailure(e.to_string()))
    }

    /// Remove a mapping that was reserved for a creation that failed
    async fn roll_back(&self, workflow: &mut CreateWorkflow<'_>, internal_id: &str) {
        workflow.transition(CreateState::RollingBack);
        match self.allocator.release(internal_id).await {
            Ok(true) => log::info!("[{}] released {}", workflow.ext_group_id, internal_id),
            Ok(false) => log::warn!(
                "[{}] mapping for {} already gone",
                workflow.ext_group_id,
                internal_id
            ),
            Err(e) => log::error!(
                "[{}] failed to release {}: {}",
                workflow.ext_group_id,
                internal_id,
                e
            ),
        }
    }

    /// Provision a new group: validate members, allocate the internal id,
    /// store the group in the UDR. A UDR failure releases the allocated id.
    pub async fn create_group(
        &self,
        ext_group_id: &str,
        config: &GroupConfiguration,
    ) -> Result<(), VnGroupError> {
        let mut workflow = CreateWorkflow::new(ext_group_id);
        log::info!(
            "[{}] VN group create ({} member(s))",
            ext_group_id,
            config.members.len()
        );

        if let Err(e) = self.validator.validate_members(&config.members).await {
            return Err(workflow.reject(e));
        }

        workflow.transition(CreateState::Allocating);
        let internal_id = match self
            .allocator
            .allocate(
                ext_group_id,
                config.members.first().map(String::as_str),
                config.app_descriptors(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => return Err(workflow.reject(e)),
        };

        workflow.transition(CreateState::CreatingRemote);
        let mut submitted = config.clone();
        if let Some(requested) = submitted.internal_group_identifier.as_deref() {
            log::debug!("[{}] ignoring requested internal id {}", ext_group_id, requested);
        }
        submitted.internal_group_identifier = Some(internal_id.clone());

        let err = match self.repository.put_group(ext_group_id, &submitted).await {
            Ok(stored) if stored.members.len() == submitted.members.len() => {
                workflow.transition(CreateState::Committed);
                log::info!("[{}] VN group created as {}", ext_group_id, internal_id);
                return Ok(());
            }
            Ok(stored) => VnGroupError::RemoteInconsistency {
                submitted: submitted.members.len(),
                stored: stored.members.len(),
            },
            Err(e) => VnGroupError::create_rejected(e),
        };

        self.roll_back(&mut workflow, &internal_id).await;
        Err(workflow.reject(err))
    }

    pub async fn get_group(&self, ext_group_id: &str) -> Result<GroupConfiguration, VnGroupError> {
        log::debug!("[{}] VN group get", ext_group_id);
        Ok(self.repository.get_group(ext_group_id).await?)
    }

    /// Apply a full replacement configuration as a minimal patch.
    pub async fn modify_group(
        &self,
        ext_group_id: &str,
        requested: &GroupConfiguration,
        supported_features: Option<&str>,
    ) -> Result<ModifyOutcome, VnGroupError> {
        log::info!("[{}] VN group modify", ext_group_id);

        self.validator.validate_members(&requested.members).await?;
        let current = self.repository.get_group(ext_group_id).await?;

        let mut requested = requested.clone();
        if requested.internal_group_identifier.is_none() {
            requested
                .internal_group_identifier
                .clone_from(&current.internal_group_identifier);
        }
        if requested == current {
            log::debug!("[{}] configuration unchanged", ext_group_id);
            return Ok(ModifyOutcome::Unchanged);
        }

        let changes = diff(&current, &requested);
        if !changes.forbidden.is_empty() {
            for item in &changes.forbidden {
                log::warn!("[{}] forbidden change of {}", ext_group_id, item.path);
            }
            return Err(VnGroupError::ForbiddenChange(changes.forbidden));
        }
        if changes.repo_patches.is_empty() {
            log::debug!("[{}] no patch to apply", ext_group_id);
            return Ok(ModifyOutcome::Unchanged);
        }

        let outcome = self
            .repository
            .patch_group(ext_group_id, &changes.repo_patches, supported_features)
            .await?;
        log::info!(
            "[{}] {} patch item(s) applied ({})",
            ext_group_id,
            changes.repo_patches.len(),
            outcome.status
        );

        let accepted = outcome.status == status::OK || outcome.status == status::NO_CONTENT;
        if changes.multicast_changed && accepted && !changes.notify_patches.is_empty() {
            match current.internal_group_identifier.as_deref() {
                Some(group_id) => self.announce(ext_group_id, group_id, &changes.notify_patches).await,
                None => log::warn!("[{}] no internal group id, notification skipped", ext_group_id),
            }
        }

        Ok(ModifyOutcome::Patched(outcome.result))
    }

    async fn announce(&self, ext_group_id: &str, group_id: &str, patches: &[PatchItem]) {
        let resource_id = group_resource_uri(ext_group_id);
        match self.dispatcher.notify(group_id, &resource_id, patches).await {
            Ok(NotifyOutcome::Delivered { callback_uri, changes }) => {
                log::info!("[{}] {} change(s) notified to {}", group_id, changes, callback_uri)
            }
            Ok(outcome) => log::debug!("[{}] notification: {:?}", group_id, outcome),
            Err(e) => log::error!("[{}] notification failed: {}", group_id, e),
        }
    }

    pub async fn delete_group(
        &self,
        ext_group_id: &str,
        mtc_provider_info: Option<&str>,
        af_id: Option<&str>,
    ) -> Result<(), VnGroupError> {
        log::info!(
            "[{}] VN group delete (mtc-provider-info {}, af-id {})",
            ext_group_id,
            mtc_provider_info.unwrap_or("-"),
            af_id.unwrap_or("-")
        );
        self.repository.delete_group(ext_group_id).await?;

        if self.options.remove_mapping_on_delete {
            match self.allocator.store().delete_by_external_id(ext_group_id).await {
                Ok(true) => log::info!("[{}] id mapping removed", ext_group_id),
                Ok(false) => log::debug!("[{}] no id mapping to remove", ext_group_id),
                Err(e) => log::error!("[{}] failed to remove id mapping: {}", ext_group_id, e),
            }
        }
        Ok(())
    }

    /// Register `subscription` for changes of internal group `group_id`
    pub async fn subscribe(
        &self,
        group_id: &str,
        mut subscription: VnGroupSubscription,
    ) -> Result<SubscriptionCreated, VnGroupError> {
        if subscription.notification_uri.is_empty() {
            return Err(VnGroupError::InvalidRequest("notificationUri is missing".to_string()));
        }

        let mapping = self
            .find_mapping(&GroupIdKey::Internal(group_id.to_string()))
            .await?
            .ok_or_else(|| VnGroupError::UnknownGroup(group_id.to_string()))?;
        log::info!(
            "[{}] subscription from {} (external {})",
            group_id,
            subscription.notification_uri,
            mapping.external_group_id
        );

        subscription.external_group_id = Some(mapping.external_group_id);
        let location = self
            .dispatcher
            .registry()
            .subscribe(group_id, subscription.clone())
            .await;
        Ok(SubscriptionCreated {
            location,
            subscription,
        })
    }

    /// Resolve one group identifier to its counterpart, optionally with members.
    pub async fn group_identifiers(
        &self,
        query: &GroupIdentifiersQuery,
    ) -> Result<GroupIdentifiers, VnGroupError> {
        let mapping = self.find_mapping(&query.key).await?.ok_or_else(|| {
            let id = match &query.key {
                GroupIdKey::External(id) | GroupIdKey::Internal(id) => id.clone(),
            };
            VnGroupError::UnknownGroup(id)
        })?;
        log::debug!(
            "[{}] group identifiers lookup (af-id {}) -> {}",
            mapping.external_group_id,
            query.af_id.as_deref().unwrap_or("-"),
            mapping.internal_group_id
        );

        let ue_id_list = if query.ue_id_ind {
            self.repository
                .get_group(&mapping.external_group_id)
                .await?
                .members
                .iter()
                .map(|member| UeId::from_member(member))
                .collect()
        } else {
            Vec::new()
        };

        Ok(GroupIdentifiers {
            ext_group_id: Some(mapping.external_group_id),
            int_group_id: Some(mapping.internal_group_id),
            ue_id_list,
        })
    }

    /// PP data provisioned by one AF instance. Only `anyUE` is served;
    /// UDR failures are returned as received.
    pub async fn get_pp_data_entry(
        &self,
        ue_id: &str,
        af_instance_id: &str,
        supported_features: Option<&str>,
    ) -> Result<PpDataEntry, VnGroupError> {
        if ue_id != ANY_UE {
            log::warn!("[{}] PP data entry get for unsupported ueId", ue_id);
            return Err(VnGroupError::InvalidRequest(format!(
                "ueId {} is not supported, expected {}",
                ue_id, ANY_UE
            )));
        }
        log::debug!("[{}] PP data entry get (af {})", ue_id, af_instance_id);
        Ok(self
            .repository
            .get_pp_data_entry(ue_id, af_instance_id, supported_features)
            .await?)
    }
}
