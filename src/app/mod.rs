pub mod tasks;
pub mod users_dag;

pub use users_dag::{build_users_dag, build_users_dag_with_sink};
