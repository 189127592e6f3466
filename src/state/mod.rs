//! Plan persistence layer
//!
//! One snapshot per user, replaced wholesale on save and read back verbatim.
//! In-memory by default; Postgres when a database is configured.

use crate::models::FinancialData;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod postgres;
pub use postgres::PostgresPlanStore;

/// Stored snapshot of a user's plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlan {
    pub user_id: Uuid,
    pub data: FinancialData,
    pub input_text: String,
    pub last_update_prompt: Option<String>,
    /// SHA-256 of `data`, hex encoded
    pub content_hash: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredPlan {
    pub fn new(
        user_id: Uuid,
        data: FinancialData,
        input_text: String,
        last_update_prompt: Option<String>,
    ) -> Self {
        let content_hash = compute_content_hash(&data);
        Self {
            user_id,
            data,
            input_text,
            last_update_prompt,
            content_hash,
            saved_at: Utc::now(),
        }
    }
}

/// Trait for plan persistence
#[async_trait::async_trait]
pub trait PlanStore: Send + Sync {
    async fn save(&self, plan: &StoredPlan) -> Result<()>;
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredPlan>>;
}

/// In-memory plan store for development
pub struct InMemoryPlanStore {
    plans: Arc<RwLock<HashMap<Uuid, StoredPlan>>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self {
            plans: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPlanStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn save(&self, plan: &StoredPlan) -> Result<()> {
        let mut plans = self.plans.write().await;
        plans.insert(plan.user_id, plan.clone());
        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<StoredPlan>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&user_id).cloned())
    }
}

/// Map an opaque user key to a stable UUID. Keys that already are UUIDs are
/// used as-is.
pub fn user_id_for_key(user_key: &str) -> Uuid {
    let key = user_key.trim();
    if let Ok(id) = Uuid::parse_str(key) {
        return id;
    }

    let hash = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// SHA-256 of the serialized plan, streamed straight into the hasher
pub fn compute_content_hash(data: &FinancialData) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), data).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
