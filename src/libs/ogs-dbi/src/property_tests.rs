//! Property-Based Tests for Database Interface
//!
//! The mapping store must stay a bijection whatever sequence of inserts and
//! deletes it sees, and logged URIs must never leak credentials.

use proptest::prelude::*;

use crate::group_id_map::{GroupIdMapStore, GroupIdMapping, InsertOutcome, MemoryGroupIdMapStore};
use crate::mongoc::masked_db_uri;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u8),
    DeleteInternal(u8),
    DeleteExternal(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..8, 0u8..8).prop_map(|(e, i)| Op::Insert(e, i)),
        1 => (0u8..8).prop_map(Op::DeleteInternal),
        1 => (0u8..8).prop_map(Op::DeleteExternal),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_memory_store_stays_bijective(ops in proptest::collection::vec(op_strategy(), 1..64)) {
        let rt = runtime();
        rt.block_on(async {
            let store = MemoryGroupIdMapStore::new();
            let mut model: Vec<(String, String)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(e, i) => {
                        let mapping = GroupIdMapping::new(format!("ext-{e}"), format!("int-{i}"));
                        let outcome = store.insert_if_absent(&mapping).await.unwrap();
                        let internal_taken = model.iter().any(|(_, int)| *int == mapping.internal_group_id);
                        let external_taken = model.iter().any(|(ext, _)| *ext == mapping.external_group_id);
                        match outcome {
                            InsertOutcome::Inserted => {
                                prop_assert!(!internal_taken && !external_taken);
                                model.push((mapping.external_group_id, mapping.internal_group_id));
                            }
                            InsertOutcome::InternalIdTaken => prop_assert!(internal_taken),
                            InsertOutcome::ExternalIdTaken => prop_assert!(external_taken),
                        }
                    }
                    Op::DeleteInternal(i) => {
                        let id = format!("int-{i}");
                        let removed = store.delete_by_internal_id(&id).await.unwrap();
                        let before = model.len();
                        model.retain(|(_, int)| *int != id);
                        prop_assert_eq!(removed, before != model.len());
                    }
                    Op::DeleteExternal(e) => {
                        let id = format!("ext-{e}");
                        let removed = store.delete_by_external_id(&id).await.unwrap();
                        let before = model.len();
                        model.retain(|(ext, _)| *ext != id);
                        prop_assert_eq!(removed, before != model.len());
                    }
                }
            }

            prop_assert_eq!(store.len().await, model.len());
            for (ext, int) in &model {
                let by_ext = store.find_by_external_id(ext).await.unwrap();
                prop_assert_eq!(by_ext.map(|m| m.internal_group_id), Some(int.clone()));
                let by_int = store.find_by_internal_id(int).await.unwrap();
                prop_assert_eq!(by_int.map(|m| m.external_group_id), Some(ext.clone()));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_masked_uri_hides_password(
        user in "[a-z]{1,8}",
        password in "[A-Za-z0-9]{6,16}",
        host in "[a-z]{1,10}",
    ) {
        let uri = format!("mongodb://{user}:{password}@{host}:27017/nextgcore");
        let masked = masked_db_uri(&uri);
        let password_segment = format!(":{password}@");
        let host_suffix = format!("@{host}:27017/nextgcore");
        prop_assert!(!masked.contains(&password_segment));
        prop_assert!(masked.ends_with(&host_suffix));
    }
}
