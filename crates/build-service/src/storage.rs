//! In-memory storage for build status records

use crate::models::BuildStatusRecord;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// How long records live and how many are kept
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Age after which finished records are dropped
    pub ttl: Duration,

    /// Maximum number of records
    pub max_entries: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            max_entries: 10_000,
        }
    }
}

/// Status records keyed by task identifier
pub struct StatusStore {
    records: RwLock<HashMap<String, BuildStatusRecord>>,
    policy: RetentionPolicy,
}

impl StatusStore {
    /// Create a new storage instance
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Insert a record, replacing any previous record for the same task
    pub async fn insert(&self, record: BuildStatusRecord) {
        let mut records = self.records.write().await;
        let task = record.task.clone();

        debug!("Storing record for task: {} build: {}", task, record.build_id);
        records.insert(task.clone(), record);

        evict(&mut records, &self.policy, &task);
    }

    /// Get the record for a task
    pub async fn get(&self, task: &str) -> Option<BuildStatusRecord> {
        self.records.read().await.get(task).cloned()
    }

    /// Apply `f` to the record for `task` if it still belongs to `build_id`.
    ///
    /// Returns false when the record is gone or owned by a newer submission.
    pub async fn update<F>(&self, task: &str, build_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut BuildStatusRecord),
    {
        let mut records = self.records.write().await;

        match records.get_mut(task) {
            Some(record) if record.build_id == build_id => {
                f(record);
                debug!("Updated task: {} status: {:?}", task, record.status);
                true
            }
            _ => false,
        }
    }

    /// Whether the task's record still belongs to `build_id`
    pub async fn is_current(&self, task: &str, build_id: &str) -> bool {
        self.records
            .read()
            .await
            .get(task)
            .is_some_and(|record| record.build_id == build_id)
    }
}

/// Drop expired finished records, then the oldest records while over capacity.
/// The record for `keep` is never dropped.
fn evict(records: &mut HashMap<String, BuildStatusRecord>, policy: &RetentionPolicy, keep: &str) {
    let now = Utc::now();
    let ttl = chrono::Duration::from_std(policy.ttl)
        .unwrap_or_else(|_| chrono::Duration::days(365_000));

    let before = records.len();
    records.retain(|task, record| {
        task == keep || !record.status.is_terminal() || now - record.updated_at <= ttl
    });

    while records.len() > policy.max_entries {
        let oldest = oldest_where(records, keep, |r| r.status.is_terminal())
            .or_else(|| oldest_where(records, keep, |_| true));

        match oldest {
            Some(task) => {
                records.remove(&task);
            }
            None => break,
        }
    }

    let evicted = before.saturating_sub(records.len());
    if evicted > 0 {
        debug!("Evicted {} status records", evicted);
    }
}

fn oldest_where<P>(
    records: &HashMap<String, BuildStatusRecord>,
    keep: &str,
    predicate: P,
) -> Option<String>
where
    P: Fn(&BuildStatusRecord) -> bool,
{
    records
        .iter()
        .filter(|(task, record)| task.as_str() != keep && predicate(record))
        .min_by_key(|(_, record)| record.updated_at)
        .map(|(task, _)| task.clone())
}
