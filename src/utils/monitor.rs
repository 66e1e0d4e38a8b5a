use std::time::Duration;

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// Process resources sampled right after one task of a DAG run finished.
///
/// `cpu_percent` and `memory_mb` are `None` when the process could not be
/// sampled (or when the crate is built without the `cli` feature).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResourceUsage {
    pub run_id: String,
    pub task_id: String,
    pub duration: Duration,
    pub cpu_percent: Option<f32>,
    pub memory_mb: Option<u64>,
}

/// Per-task usage of one DAG run, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResourceUsage {
    pub run_id: String,
    pub tasks: Vec<TaskResourceUsage>,
}

impl RunResourceUsage {
    pub fn total_duration(&self) -> Duration {
        self.tasks.iter().map(|t| t.duration).sum()
    }

    pub fn peak_memory_mb(&self) -> Option<u64> {
        self.tasks.iter().filter_map(|t| t.memory_mb).max()
    }

    /// The task that held the most memory when it finished.
    pub fn heaviest_task(&self) -> Option<&TaskResourceUsage> {
        self.tasks
            .iter()
            .filter(|t| t.memory_mb.is_some())
            .max_by_key(|t| t.memory_mb)
    }
}

/// Attributes CPU and memory of the current process to DAG tasks.
pub struct ResourceMonitor {
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
}

impl ResourceMonitor {
    #[cfg(feature = "cli")]
    pub fn new() -> Self {
        let system = System::new_with_specifics(RefreshKind::nothing());
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("System monitoring unavailable: {}", e);
                None
            }
        };

        Self {
            system: Mutex::new(system),
            pid,
        }
    }

    #[cfg(not(feature = "cli"))]
    pub fn new() -> Self {
        tracing::warn!("System monitoring unavailable: built without the `cli` feature");
        Self {}
    }

    #[cfg(feature = "cli")]
    fn sample(&self) -> Option<(f32, u64)> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let process = system.process(pid)?;
        Some((process.cpu_usage(), process.memory() / 1024 / 1024))
    }

    #[cfg(not(feature = "cli"))]
    fn sample(&self) -> Option<(f32, u64)> {
        None
    }

    /// Takes the baseline sample so the first task's CPU figure has a reference point.
    pub fn begin_run(&self, run_id: &str) {
        if self.sample().is_none() {
            tracing::debug!(run_id, "No process sample available for this run");
        }
    }

    pub fn record_task(&self, run_id: &str, task_id: &str, duration: Duration) -> TaskResourceUsage {
        let sample = self.sample();
        let usage = TaskResourceUsage {
            run_id: run_id.to_string(),
            task_id: task_id.to_string(),
            duration,
            cpu_percent: sample.map(|(cpu, _)| cpu),
            memory_mb: sample.map(|(_, memory)| memory),
        };

        tracing::info!(
            run_id,
            task_id,
            duration_ms = duration.as_millis() as u64,
            cpu_percent = usage.cpu_percent,
            memory_mb = usage.memory_mb,
            "📊 Task resources"
        );
        usage
    }

    pub fn finish_run(&self, run_id: &str, tasks: Vec<TaskResourceUsage>) -> RunResourceUsage {
        let usage = RunResourceUsage {
            run_id: run_id.to_string(),
            tasks,
        };

        tracing::info!(
            run_id,
            tasks = usage.tasks.len(),
            total_ms = usage.total_duration().as_millis() as u64,
            peak_memory_mb = usage.peak_memory_mb(),
            heaviest_task = usage.heaviest_task().map(|t| t.task_id.as_str()),
            "📊 Run resources"
        );
        usage
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
