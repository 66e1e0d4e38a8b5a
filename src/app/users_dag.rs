use crate::app::tasks::{extract, load, transform};
use crate::app::tasks::{ExtractUsersTask, LoadUsersTask, OutputSink, TransformUsersTask};
use crate::core::dag::Dag;
use crate::core::{ConfigProvider, Storage};

/// The users DAG: `extract_users >> transform_users >> load_users`.
pub fn build_users_dag<C, S>(config: &C, storage: S) -> Dag
where
    C: ConfigProvider + ?Sized,
    S: Storage + 'static,
{
    build_users_dag_with_sink(config, storage, OutputSink::Stdout)
}

pub fn build_users_dag_with_sink<C, S>(config: &C, storage: S, sink: OutputSink) -> Dag
where
    C: ConfigProvider + ?Sized,
    S: Storage + 'static,
{
    let mut dag = Dag::new(config.dag_settings());

    dag.add_task(Box::new(
        ExtractUsersTask::new(config.api_endpoint()).with_timeout(config.request_timeout()),
    ));
    dag.add_task(Box::new(TransformUsersTask::new()));
    dag.add_task(Box::new(
        LoadUsersTask::new(storage, config.output_path())
            .with_persistence(config.persist_output())
            .with_sink(sink),
    ));

    dag.chain(&[extract::TASK_ID, transform::TASK_ID, load::TASK_ID]);
    dag
}
