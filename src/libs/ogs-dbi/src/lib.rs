//! NextGCore Database Interface Library
//!
//! MongoDB connection handling and the UDM's external/internal group
//! identifier map.

pub mod group_id_map;
pub mod mongoc;

#[cfg(test)]
mod property_tests;

// Re-export the mongodb crate for consumers that need direct collection access
pub use mongodb;

pub use group_id_map::{
    GroupIdMapStore, GroupIdMapping, InsertOutcome, MemoryGroupIdMapStore, MongoGroupIdMapStore,
    EXT_INT_GROUP_ID_MAP,
};
pub use mongoc::{masked_db_uri, DbiError, DbiResult, OgsMongoc};
