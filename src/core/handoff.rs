use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Key/value store that carries data between the tasks of a single DAG run.
///
/// Values are addressed by the id of the task that pushed them plus a key.
#[derive(Debug, Clone, Default)]
pub struct HandoffStore {
    values: HashMap<(String, String), serde_json::Value>,
}

impl HandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `(task_id, key)`, replacing any earlier value.
    pub fn push(&mut self, task_id: &str, key: &str, value: serde_json::Value) {
        self.values
            .insert((task_id.to_string(), key.to_string()), value);
    }

    pub fn pull(&self, task_id: &str, key: &str) -> Option<&serde_json::Value> {
        self.values.get(&(task_id.to_string(), key.to_string()))
    }

    /// Looks `key` up once per task id, keeping the order of `task_ids`.
    pub fn pull_many(&self, key: &str, task_ids: &[&str]) -> Vec<Option<&serde_json::Value>> {
        task_ids
            .iter()
            .map(|task_id| self.pull(task_id, key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What a running task sees: its own identity, the run it belongs to and the handoff store.
#[derive(Debug)]
pub struct TaskContext<'a> {
    pub task_id: String,
    pub run_id: String,
    pub logical_date: DateTime<Utc>,
    store: &'a mut HandoffStore,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        task_id: String,
        run_id: String,
        logical_date: DateTime<Utc>,
        store: &'a mut HandoffStore,
    ) -> Self {
        Self {
            task_id,
            run_id,
            logical_date,
            store,
        }
    }

    /// Pushes a raw value under this task's id.
    pub fn push(&mut self, key: &str, value: serde_json::Value) {
        tracing::debug!("{} pushed '{}'", self.task_id, key);
        self.store.push(&self.task_id, key, value);
    }

    pub fn push_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.push(key, value);
        Ok(())
    }

    pub fn pull(&self, task_id: &str, key: &str) -> Result<&serde_json::Value> {
        self.store
            .pull(task_id, key)
            .ok_or_else(|| EtlError::HandoffMissing {
                task_id: task_id.to_string(),
                key: key.to_string(),
            })
    }

    pub fn pull_json<T: DeserializeOwned>(&self, task_id: &str, key: &str) -> Result<T> {
        let value = self.pull(task_id, key)?;
        Ok(serde_json::from_value(value.clone())?)
    }
}
