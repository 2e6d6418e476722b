//! Internal group identifier allocation
//!
//! An internal group id has the form `<serviceId>-<MCC>-<MNC>-<hex suffix>`,
//! e.g. `AAA00001-208-93-aF3c09bE71`. Allocation reserves the id together with
//! its external group id in the group id map; the store's insert-if-absent is
//! atomic over both keys so two allocations for the same external id can never
//! both persist.

use std::sync::Arc;

use ogs_dbi::{GroupIdMapStore, GroupIdMapping, InsertOutcome};
use rand::Rng;

use crate::context::UdmPpContext;
use crate::error::VnGroupError;
use crate::model::AppDescriptor;

pub const MAX_ALLOCATION_ATTEMPTS: usize = 10;
pub const DEFAULT_SUFFIX_LEN: usize = 10;
pub const MAX_SUFFIX_LEN: usize = 10;

const SUFFIX_ALPHABET: &[u8] = b"abcdefABCDEF0123456789";

/// Source of candidate suffixes
pub trait SuffixSource: Send + Sync {
    fn next_suffix(&self, len: usize) -> String;
}

/// Uniform draw from the hex alphabet
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self, len: usize) -> String {
        let mut rng = rand::rng();
        (0..len)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect()
    }
}

/// Whether a suffix length yields ids matching the internal group id pattern
pub fn is_valid_suffix_len(len: usize) -> bool {
    (2..=MAX_SUFFIX_LEN).contains(&len) && len % 2 == 0
}

/// `^[A-Fa-f0-9]{8}-[0-9]{3}-[0-9]{2,3}-([A-Fa-f0-9][A-Fa-f0-9]){1,10}$`
pub fn is_valid_internal_group_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split('-').collect();
    let [service, mcc, mnc, suffix] = *parts.as_slice() else {
        return false;
    };

    let hex = |s: &str| s.chars().all(|c| c.is_ascii_hexdigit());
    let dec = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    service.len() == 8
        && hex(service)
        && mcc.len() == 3
        && dec(mcc)
        && (2..=3).contains(&mnc.len())
        && dec(mnc)
        && (2..=20).contains(&suffix.len())
        && suffix.len() % 2 == 0
        && hex(suffix)
}

pub struct IdentifierAllocator {
    context: Arc<UdmPpContext>,
    store: Arc<dyn GroupIdMapStore>,
    suffix_len: usize,
    suffix_source: Arc<dyn SuffixSource>,
}

impl IdentifierAllocator {
    pub fn new(context: Arc<UdmPpContext>, store: Arc<dyn GroupIdMapStore>) -> Self {
        Self {
            context,
            store,
            suffix_len: DEFAULT_SUFFIX_LEN,
            suffix_source: Arc::new(RandomSuffix),
        }
    }

    /// Ignored unless [`is_valid_suffix_len`]
    pub fn with_suffix_len(mut self, len: usize) -> Self {
        if is_valid_suffix_len(len) {
            self.suffix_len = len;
        } else {
            log::warn!("Invalid internal group id suffix length {}, keeping {}", len, self.suffix_len);
        }
        self
    }

    pub fn with_suffix_source(mut self, source: Arc<dyn SuffixSource>) -> Self {
        self.suffix_source = source;
        self
    }

    pub fn store(&self) -> &Arc<dyn GroupIdMapStore> {
        &self.store
    }

    fn candidate(&self, service_id: &str) -> String {
        let plmn_id = &self.context.plmn_id;
        format!(
            "{}-{}-{}-{}",
            service_id,
            plmn_id.mcc,
            plmn_id.mnc,
            self.suffix_source.next_suffix(self.suffix_len)
        )
    }

    /// Reserve a fresh internal group id for `external_id`.
    pub async fn allocate(
        &self,
        external_id: &str,
        seed_member: Option<&str>,
        app_descriptors: &[AppDescriptor],
    ) -> Result<String, VnGroupError> {
        let service_id = self.context.service_id_for(app_descriptors);
        log::debug!(
            "[{}] allocating internal group id (service {}, seed member {})",
            external_id,
            service_id,
            seed_member.unwrap_or("-")
        );

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let existing = self
                .store
                .find_by_external_id(external_id)
                .await
                .map_err(|e| VnGroupError::AllocationFailure(e.to_string()))?;
            if let Some(mapping) = existing {
                log::warn!(
                    "[{}] External ID duplicated (mapped to {})",
                    external_id,
                    mapping.internal_group_id
                );
                return Err(VnGroupError::DuplicateExternalId(external_id.to_string()));
            }

            let internal_id = self.candidate(service_id);
            let mapping = GroupIdMapping::new(external_id, internal_id.clone());
            let outcome = self
                .store
                .insert_if_absent(&mapping)
                .await
                .map_err(|e| VnGroupError::AllocationFailure(e.to_string()))?;

            match outcome {
                InsertOutcome::Inserted => {
                    log::info!("[{}] internal group id {}", external_id, internal_id);
                    return Ok(internal_id);
                }
                InsertOutcome::InternalIdTaken => {
                    log::debug!(
                        "[{}] IntGroupID duplicated: {} (attempt {}/{})",
                        external_id,
                        internal_id,
                        attempt,
                        MAX_ALLOCATION_ATTEMPTS
                    );
                }
                InsertOutcome::ExternalIdTaken => {
                    log::warn!("[{}] External ID duplicated by a concurrent request", external_id);
                    return Err(VnGroupError::DuplicateExternalId(external_id.to_string()));
                }
            }
        }

        log::error!(
            "[{}] no free internal group id after {} attempts",
            external_id,
            MAX_ALLOCATION_ATTEMPTS
        );
        Err(VnGroupError::AllocationFailure(format!(
            "ExtIntGroupIDMap random generator error after {} attempts",
            MAX_ALLOCATION_ATTEMPTS
        )))
    }

    /// Remove the mapping of `internal_id`; returns whether one existed
    pub async fn release(&self, internal_id: &str) -> Result<bool, VnGroupError> {
        self.store
            .delete_by_internal_id(internal_id)
            .await
            .map_err(|e| VnGroupError::SystemFailure(e.to_string()))
    }
}
