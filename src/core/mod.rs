pub mod dag;
pub mod frame;
pub mod handoff;
pub mod runner;
pub mod schedule;

pub use crate::domain::model::{TransformedUser, User};
pub use crate::domain::ports::{ConfigProvider, Storage, Task};
pub use crate::utils::error::Result;
