use crate::core::schedule::Schedule;
use crate::domain::ports::Task;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_DAG_ID: &str = "users_etl";
pub const DEFAULT_DESCRIPTION: &str = "ETL pipeline for processing users";

/// Identity and trigger of a DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagSettings {
    pub dag_id: String,
    pub description: String,
    pub schedule: Schedule,
    pub start_date: NaiveDate,
}

impl DagSettings {
    /// `start_date` at midnight UTC.
    pub fn start_datetime(&self) -> DateTime<Utc> {
        self.start_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

impl Default for DagSettings {
    fn default() -> Self {
        Self {
            dag_id: DEFAULT_DAG_ID.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            schedule: Schedule::Daily,
            start_date: NaiveDate::from_ymd_opt(2021, 5, 12).unwrap_or_default(),
        }
    }
}

/// A set of tasks plus the ordering constraints between them.
pub struct Dag {
    settings: DagSettings,
    tasks: Vec<Box<dyn Task>>,
    edges: Vec<(String, String)>,
}

impl Dag {
    pub fn new(settings: DagSettings) -> Self {
        Self {
            settings,
            tasks: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn settings(&self) -> &DagSettings {
        &self.settings
    }

    pub fn dag_id(&self) -> &str {
        &self.settings.dag_id
    }

    pub fn add_task(&mut self, task: Box<dyn Task>) {
        self.tasks.push(task);
    }

    /// `downstream` may only start once `upstream` has completed.
    pub fn set_downstream(&mut self, upstream: &str, downstream: &str) {
        self.edges
            .push((upstream.to_string(), downstream.to_string()));
    }

    /// Links each task id to the next one: `a >> b >> c`.
    pub fn chain(&mut self, task_ids: &[&str]) {
        for pair in task_ids.windows(2) {
            self.set_downstream(pair[0], pair[1]);
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&dyn Task> {
        self.tasks
            .iter()
            .find(|t| t.task_id() == task_id)
            .map(|t| t.as_ref())
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.task_id()).collect()
    }

    pub fn upstream_of(&self, task_id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, down)| down == task_id)
            .map(|(up, _)| up.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty_string("dag_id", &self.settings.dag_id)?;

        if self.tasks.is_empty() {
            return Err(EtlError::DagDefinitionError {
                message: format!("DAG '{}' has no tasks", self.settings.dag_id),
            });
        }

        let mut seen = HashSet::new();
        for task_id in self.task_ids() {
            if !seen.insert(task_id) {
                return Err(EtlError::DagDefinitionError {
                    message: format!("Duplicate task id '{}'", task_id),
                });
            }
        }

        for (up, down) in &self.edges {
            for end in [up, down] {
                if !seen.contains(end.as_str()) {
                    return Err(EtlError::DagDefinitionError {
                        message: format!("Dependency refers to unknown task '{}'", end),
                    });
                }
            }
            if up == down {
                return Err(EtlError::DagDefinitionError {
                    message: format!("Task '{}' depends on itself", up),
                });
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Task ids in a valid execution order. Ties keep registration order.
    pub fn execution_order(&self) -> Result<Vec<&str>> {
        self.validate()?;
        self.topological_order()
    }

    // Kahn's algorithm over task indices
    fn topological_order(&self) -> Result<Vec<&str>> {
        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.task_id(), i))
            .collect();

        let mut in_degree = vec![0usize; self.tasks.len()];
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (up, down) in &self.edges {
            let (Some(&u), Some(&d)) = (index.get(up.as_str()), index.get(down.as_str())) else {
                continue;
            };
            adjacency[u].push(d);
            in_degree[d] += 1;
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(node) = ready.pop_first() {
            order.push(self.tasks[node].task_id());
            for &next in &adjacency[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck: Vec<&str> = self
                .tasks
                .iter()
                .map(|t| t.task_id())
                .filter(|id| !order.contains(id))
                .collect();
            return Err(EtlError::DagDefinitionError {
                message: format!("Cycle detected between tasks: {}", stuck.join(", ")),
            });
        }

        Ok(order)
    }
}

impl std::fmt::Debug for Dag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dag")
            .field("settings", &self.settings)
            .field("tasks", &self.task_ids())
            .field("edges", &self.edges)
            .finish()
    }
}
