use crate::core::dag::DagSettings;
use crate::core::handoff::TaskContext;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;

    /// Whether the load step writes the CSV to `output_path`.
    fn persist_output(&self) -> bool {
        false
    }

    fn request_timeout(&self) -> Option<Duration> {
        None
    }

    fn dag_settings(&self) -> DagSettings {
        DagSettings::default()
    }
}

/// One step of a DAG.
#[async_trait]
pub trait Task: Send + Sync {
    fn task_id(&self) -> &str;

    async fn execute(&self, context: &mut TaskContext<'_>) -> Result<()>;
}
