pub mod extract;
pub mod load;
pub mod transform;

pub use extract::ExtractUsersTask;
pub use load::{LoadUsersTask, OutputSink};
pub use transform::TransformUsersTask;
