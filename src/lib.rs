pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::storage::LocalStorage;
pub use crate::app::{build_users_dag, build_users_dag_with_sink};
pub use crate::config::TomlConfig;
pub use crate::core::dag::{Dag, DagSettings};
pub use crate::core::runner::{DagRunReport, DagRunner, RunType};
pub use crate::domain::ports::{ConfigProvider, Storage, Task};
pub use crate::utils::error::{EtlError, Result};
