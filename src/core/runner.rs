use crate::core::dag::Dag;
use crate::core::handoff::{HandoffStore, TaskContext};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::{ResourceMonitor, RunResourceUsage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Manual,
    Scheduled,
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunType::Manual => f.write_str("manual"),
            RunType::Scheduled => f.write_str("scheduled"),
        }
    }
}

pub fn run_id(run_type: RunType, logical_date: DateTime<Utc>) -> String {
    format!("{}__{}", run_type, logical_date.to_rfc3339())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Success,
    Failed,
    UpstreamFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DagRunState {
    Success,
    Failed,
}

#[derive(Debug)]
pub struct TaskInstance {
    pub task_id: String,
    pub state: TaskState,
    pub duration: Duration,
    pub error: Option<EtlError>,
}

/// Outcome of one run of a DAG.
#[derive(Debug)]
pub struct DagRunReport {
    pub run_id: String,
    pub dag_id: String,
    pub logical_date: DateTime<Utc>,
    pub state: DagRunState,
    pub task_instances: Vec<TaskInstance>,
    /// Present when the run was monitored.
    pub resource_usage: Option<RunResourceUsage>,
}

impl DagRunReport {
    pub fn is_success(&self) -> bool {
        self.state == DagRunState::Success
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskInstance> {
        self.task_instances.iter().find(|t| t.task_id == task_id)
    }

    pub fn executed_task_ids(&self) -> Vec<&str> {
        self.task_instances
            .iter()
            .filter(|t| t.state != TaskState::UpstreamFailed)
            .map(|t| t.task_id.as_str())
            .collect()
    }

    /// Turns a failed run into the error of the task that failed.
    pub fn into_result(mut self) -> Result<Self> {
        let failed = self
            .task_instances
            .iter_mut()
            .find(|t| t.state == TaskState::Failed);

        match failed {
            Some(instance) => {
                let source = instance.error.take().unwrap_or(EtlError::ProcessingError {
                    message: "task failed without an error".to_string(),
                });
                Err(EtlError::TaskFailed {
                    task_id: instance.task_id.clone(),
                    source: Box::new(source),
                })
            }
            None => Ok(self),
        }
    }

    pub fn summary(&self) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let count = |state: TaskState| {
            self.task_instances
                .iter()
                .filter(|t| t.state == state)
                .count()
        };
        let total_duration: Duration = self.task_instances.iter().map(|t| t.duration).sum();

        summary.insert("dag_id".to_string(), serde_json::Value::String(self.dag_id.clone()));
        summary.insert("run_id".to_string(), serde_json::Value::String(self.run_id.clone()));
        summary.insert(
            "total_tasks".to_string(),
            serde_json::Value::Number(self.task_instances.len().into()),
        );
        summary.insert(
            "succeeded_tasks".to_string(),
            serde_json::Value::Number(count(TaskState::Success).into()),
        );
        summary.insert(
            "failed_tasks".to_string(),
            serde_json::Value::Number(count(TaskState::Failed).into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let executed: Vec<serde_json::Value> = self
            .executed_task_ids()
            .into_iter()
            .map(|id| serde_json::Value::String(id.to_string()))
            .collect();
        summary.insert("executed_tasks".to_string(), serde_json::Value::Array(executed));

        summary
    }
}

/// Runs the tasks of a DAG one after another in dependency order.
pub struct DagRunner {
    dag: Dag,
    monitor: Option<ResourceMonitor>,
}

impl DagRunner {
    pub fn new(dag: Dag) -> Self {
        Self { dag, monitor: None }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(ResourceMonitor::new);
        self
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Executes one run. Only an invalid DAG is returned as `Err`; task
    /// failures are recorded in the report.
    pub async fn run(&self, logical_date: DateTime<Utc>, run_type: RunType) -> Result<DagRunReport> {
        let order = self.dag.execution_order()?;
        let run_id = run_id(run_type, logical_date);
        let mut store = HandoffStore::new();
        let mut task_instances = Vec::with_capacity(order.len());
        let mut task_usage = Vec::new();
        let mut failed = false;

        tracing::info!("🚀 Starting DAG run {} ({})", self.dag.dag_id(), run_id);
        if let Some(monitor) = &self.monitor {
            monitor.begin_run(&run_id);
        }

        for task_id in order {
            if failed {
                tracing::warn!("⏭️ Skipping task {} (upstream failed)", task_id);
                task_instances.push(TaskInstance {
                    task_id: task_id.to_string(),
                    state: TaskState::UpstreamFailed,
                    duration: Duration::ZERO,
                    error: None,
                });
                continue;
            }

            let Some(task) = self.dag.task(task_id) else {
                return Err(EtlError::DagDefinitionError {
                    message: format!("Task '{}' disappeared from the DAG", task_id),
                });
            };

            tracing::info!("▶️ Running task {}", task_id);
            let start_time = Instant::now();
            let mut context =
                TaskContext::new(task_id.to_string(), run_id.clone(), logical_date, &mut store);
            let outcome = task.execute(&mut context).await;
            let duration = start_time.elapsed();

            if let Some(monitor) = &self.monitor {
                task_usage.push(monitor.record_task(&run_id, task_id, duration));
            }

            match outcome {
                Ok(()) => {
                    tracing::info!("✅ Task {} succeeded (duration: {:?})", task_id, duration);
                    task_instances.push(TaskInstance {
                        task_id: task_id.to_string(),
                        state: TaskState::Success,
                        duration,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!("❌ Task {} failed: {}", task_id, e);
                    failed = true;
                    task_instances.push(TaskInstance {
                        task_id: task_id.to_string(),
                        state: TaskState::Failed,
                        duration,
                        error: Some(e),
                    });
                }
            }
        }

        let resource_usage = self
            .monitor
            .as_ref()
            .map(|monitor| monitor.finish_run(&run_id, task_usage));

        let state = if failed {
            DagRunState::Failed
        } else {
            DagRunState::Success
        };
        tracing::info!("🏁 DAG run {} finished: {:?}", run_id, state);

        Ok(DagRunReport {
            run_id,
            dag_id: self.dag.dag_id().to_string(),
            logical_date,
            state,
            task_instances,
            resource_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dag::DagSettings;
    use crate::domain::ports::Task;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    struct RecordingTask {
        id: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Task for RecordingTask {
        fn task_id(&self) -> &str {
            self.id
        }

        async fn execute(&self, context: &mut TaskContext<'_>) -> Result<()> {
            self.log.lock().unwrap().push(self.id.to_string());
            if self.fail {
                return Err(EtlError::ProcessingError {
                    message: format!("{} blew up", self.id),
                });
            }
            context.push("done", serde_json::Value::Bool(true));
            Ok(())
        }
    }

    fn build(failing: Option<&'static str>) -> (DagRunner, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dag = Dag::new(DagSettings::default());
        for id in ["load", "transform", "extract"] {
            dag.add_task(Box::new(RecordingTask {
                id,
                log: log.clone(),
                fail: failing == Some(id),
            }));
        }
        dag.chain(&["extract", "transform", "load"]);
        (DagRunner::new(dag), log)
    }

    fn logical_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 12, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_run_id_format() {
        assert_eq!(
            run_id(RunType::Scheduled, logical_date()),
            "scheduled__2021-05-12T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_tasks_run_in_dependency_order() {
        let (runner, log) = build(None);

        let report = runner.run(logical_date(), RunType::Manual).await.unwrap();

        assert!(report.is_success());
        assert_eq!(*log.lock().unwrap(), vec!["extract", "transform", "load"]);
        assert_eq!(report.executed_task_ids(), vec!["extract", "transform", "load"]);
        assert_eq!(report.run_id, "manual__2021-05-12T00:00:00+00:00");
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_failure_stops_downstream_tasks() {
        let (runner, log) = build(Some("transform"));

        let report = runner.run(logical_date(), RunType::Manual).await.unwrap();

        assert_eq!(report.state, DagRunState::Failed);
        assert_eq!(*log.lock().unwrap(), vec!["extract", "transform"]);
        assert_eq!(report.task("extract").unwrap().state, TaskState::Success);
        assert_eq!(report.task("transform").unwrap().state, TaskState::Failed);
        assert_eq!(report.task("load").unwrap().state, TaskState::UpstreamFailed);

        let err = report.into_result().unwrap_err();
        match err {
            EtlError::TaskFailed { task_id, source } => {
                assert_eq!(task_id, "transform");
                assert!(matches!(*source, EtlError::ProcessingError { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_dag_is_an_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dag = Dag::new(DagSettings::default());
        dag.add_task(Box::new(RecordingTask {
            id: "a",
            log: log.clone(),
            fail: false,
        }));
        dag.set_downstream("a", "b");

        let result = DagRunner::new(dag).run(logical_date(), RunType::Manual).await;
        assert!(matches!(result, Err(EtlError::DagDefinitionError { .. })));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_monitored_run_records_each_executed_task() {
        let (runner, _) = build(Some("transform"));
        let runner = runner.with_monitoring(true);

        let report = runner.run(logical_date(), RunType::Scheduled).await.unwrap();

        let usage = report.resource_usage.as_ref().unwrap();
        assert_eq!(usage.run_id, report.run_id);
        let task_ids: Vec<&str> = usage.tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(task_ids, vec!["extract", "transform"]);
        assert!(usage.tasks.iter().all(|t| t.run_id == report.run_id));
        assert_eq!(usage.tasks[1].duration, report.task("transform").unwrap().duration);
    }

    #[tokio::test]
    async fn test_unmonitored_run_has_no_usage() {
        let (runner, _) = build(None);
        let report = runner.run(logical_date(), RunType::Manual).await.unwrap();
        assert!(report.resource_usage.is_none());
    }

    #[tokio::test]
    async fn test_summary() {
        let (runner, _) = build(Some("load"));
        let report = runner.run(logical_date(), RunType::Scheduled).await.unwrap();

        let summary = report.summary();
        assert_eq!(summary["dag_id"], serde_json::json!("users_etl"));
        assert_eq!(summary["total_tasks"], serde_json::json!(3));
        assert_eq!(summary["succeeded_tasks"], serde_json::json!(2));
        assert_eq!(summary["failed_tasks"], serde_json::json!(1));
        assert_eq!(
            summary["executed_tasks"],
            serde_json::json!(["extract", "transform", "load"])
        );
    }
}
