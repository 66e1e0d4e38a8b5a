use crate::app::tasks::extract::{self, EXTRACTED_USERS_KEY};
use crate::core::handoff::TaskContext;
use crate::core::{Task, TransformedUser, User};
use crate::utils::error::Result;

pub const TASK_ID: &str = "transform_users";
pub const TRANSFORMED_USERS_KEY: &str = "transformed_users";

/// Re-keys every extracted user into the flat output shape.
pub fn transform_users(users: Vec<User>) -> Vec<TransformedUser> {
    users.into_iter().map(TransformedUser::from).collect()
}

#[derive(Debug, Default)]
pub struct TransformUsersTask;

impl TransformUsersTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Task for TransformUsersTask {
    fn task_id(&self) -> &str {
        TASK_ID
    }

    async fn execute(&self, context: &mut TaskContext<'_>) -> Result<()> {
        let users: Vec<User> = context.pull_json(extract::TASK_ID, EXTRACTED_USERS_KEY)?;
        let transformed = transform_users(users);

        tracing::info!("🔄 Transformed {} users", transformed.len());
        context.push_json(TRANSFORMED_USERS_KEY, &transformed)?;
        Ok(())
    }
}
