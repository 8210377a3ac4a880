//! # Off-Ledger Metadata Store
//!
//! Caller-supplied metadata keyed by condition id. Purely descriptive,
//! never authoritative, and not durable: records live in process memory
//! and are lost on restart. The trait is the swap point for a persistent
//! backend; request handlers only see the trait.

use chrono::Utc;
use dashmap::DashMap;
use escrow_ledger::ConditionId;
use serde::Serialize;
use serde_json::Value;

/// A stored metadata record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub condition_id: ConditionId,
    /// Free-form caller-supplied metadata.
    pub metadata: Value,
    /// RFC 3339 timestamp of the write.
    pub created_at: String,
}

/// Key-value store for off-ledger condition metadata.
pub trait MetadataStore: Send + Sync {
    /// Stores (replacing any previous record) and returns the record.
    fn put(&self, id: ConditionId, metadata: Value) -> MetadataRecord;

    /// Fetches the record for a condition, if any.
    fn get(&self, id: ConditionId) -> Option<MetadataRecord>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// True when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store with atomic replace-or-insert semantics.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: DashMap<ConditionId, MetadataRecord>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn put(&self, id: ConditionId, metadata: Value) -> MetadataRecord {
        let record = MetadataRecord {
            condition_id: id,
            metadata,
            created_at: Utc::now().to_rfc3339(),
        };
        self.records.insert(id, record.clone());
        record
    }

    fn get(&self, id: ConditionId) -> Option<MetadataRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
