pub mod memory;
pub mod sqlite;

pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

use crate::error::Result;
use crate::registry::ConstructorArg;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One confirmed deployment. Never mutated; a redeploy appends a newer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub address: String,
    pub constructor_args: Vec<ConstructorArg>,
    pub timestamp: DateTime<Utc>,
    pub run_id: Option<String>,
}

impl DeploymentRecord {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        constructor_args: Vec<ConstructorArg>,
        run_id: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            constructor_args,
            timestamp: Utc::now().trunc_subsecs(3),
            run_id,
        }
    }
}

/// Durable name -> latest record mapping, plus a single-holder run lock.
///
/// Only one orchestration run may write at a time; writers take the lock first.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Most recent record for `name`.
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>>;

    /// Append a record, superseding any earlier one with the same name.
    async fn put(&self, record: &DeploymentRecord) -> Result<()>;

    /// Current record of every artifact, ordered by name.
    async fn all(&self) -> Result<Vec<DeploymentRecord>>;

    /// Every record ever written for `name`, newest first.
    async fn history(&self, name: &str) -> Result<Vec<DeploymentRecord>>;

    /// Take the run lock, failing with `StoreLocked` if another run holds it.
    async fn acquire_lock(&self, run_id: &str) -> Result<()>;

    /// Release the run lock if `run_id` holds it.
    async fn release_lock(&self, run_id: &str) -> Result<()>;

    /// Clear the lock regardless of holder, returning the previous holder.
    async fn break_lock(&self) -> Result<Option<String>>;
}
