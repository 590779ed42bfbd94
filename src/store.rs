//! Report persistence boundary
//!
//! Fused results are stored per owner. Only the in-memory store lives in this
//! crate; a database-backed store implements the same trait.

use crate::fusion::FusedResult;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Owner used when the caller does not identify itself
pub const ANONYMOUS_OWNER: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub report_id: Uuid,
    pub owner: Uuid,
    pub fused: FusedResult,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl StoredReport {
    pub fn new(owner: Uuid, fused: FusedResult) -> Self {
        let fingerprint = fused.fingerprint();
        Self {
            report_id: Uuid::new_v4(),
            owner,
            fused,
            fingerprint,
            created_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, owner: Uuid, record: StoredReport) -> Result<Uuid>;
    async fn latest(&self, owner: Uuid) -> Result<Option<StoredReport>>;
}

/// In-memory report store for development and tests
pub struct InMemoryReportStore {
    reports_by_owner: Arc<RwLock<HashMap<Uuid, Vec<StoredReport>>>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports_by_owner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn count(&self, owner: Uuid) -> usize {
        let reports = self.reports_by_owner.read().await;
        reports.get(&owner).map(Vec::len).unwrap_or(0)
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReportStore for InMemoryReportStore {
    async fn save(&self, owner: Uuid, mut record: StoredReport) -> Result<Uuid> {
        record.owner = owner;
        let report_id = record.report_id;

        let mut reports = self.reports_by_owner.write().await;
        reports.entry(owner).or_default().push(record);

        Ok(report_id)
    }

    async fn latest(&self, owner: Uuid) -> Result<Option<StoredReport>> {
        let reports = self.reports_by_owner.read().await;

        Ok(reports.get(&owner).and_then(|history| {
            history
                .iter()
                .enumerate()
                .max_by_key(|(position, report)| (report.created_at, *position))
                .map(|(_, report)| report.clone())
        }))
    }
}

/// Resolve a caller-supplied owner token to a stable id.
/// UUIDs are used as-is; any other token hashes to the same id every time.
pub fn owner_id(token: Option<&str>) -> Uuid {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Uuid::parse_str(t).unwrap_or_else(|_| stable_uuid_from_string(t)),
        None => stable_uuid_from_string(ANONYMOUS_OWNER),
    }
}

fn stable_uuid_from_string(input: &str) -> Uuid {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}
