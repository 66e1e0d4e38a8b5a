use crate::core::handoff::TaskContext;
use crate::core::Task;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;

pub const TASK_ID: &str = "extract_users";
pub const EXTRACTED_USERS_KEY: &str = "extracted_users";

/// Fetches the user list and hands the JSON body on unchanged.
pub struct ExtractUsersTask {
    url: String,
    timeout: Option<Duration>,
    client: Client,
}

impl ExtractUsersTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch(&self) -> Result<serde_json::Value> {
        tracing::debug!("Making API request to: {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(EtlError::HttpStatusError {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl Task for ExtractUsersTask {
    fn task_id(&self) -> &str {
        TASK_ID
    }

    async fn execute(&self, context: &mut TaskContext<'_>) -> Result<()> {
        let users = self.fetch().await?;

        match users.as_array() {
            Some(items) => tracing::info!("📥 Extracted {} users", items.len()),
            None => tracing::warn!("API response is not a JSON array"),
        }

        context.push(EXTRACTED_USERS_KEY, users);
        Ok(())
    }
}
