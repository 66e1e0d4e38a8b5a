use crate::app::tasks::transform::{self, TRANSFORMED_USERS_KEY};
use crate::core::frame::Frame;
use crate::core::handoff::TaskContext;
use crate::core::{Storage, Task, TransformedUser};
use crate::utils::error::Result;
use std::io::Write;
use std::sync::{Arc, Mutex};

pub const TASK_ID: &str = "load_users";

/// Where the rendered table goes.
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl OutputSink {
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (OutputSink::Buffer(buffer.clone()), buffer)
    }

    fn write_line(&self, text: &str) -> Result<()> {
        match self {
            OutputSink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            OutputSink::Buffer(buffer) => {
                let mut buffer = buffer.lock().map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::Other, "output buffer poisoned")
                })?;
                writeln!(buffer, "{}", text)?;
            }
        }
        Ok(())
    }
}

/// Builds the table from the transformed users and prints it.
///
/// The CSV file at `path` is only written when persistence is switched on.
pub struct LoadUsersTask<S: Storage> {
    storage: S,
    path: String,
    persist: bool,
    sink: OutputSink,
}

impl<S: Storage> LoadUsersTask<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            persist: false,
            sink: OutputSink::Stdout,
        }
    }

    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }
}

#[async_trait::async_trait]
impl<S: Storage + 'static> Task for LoadUsersTask<S> {
    fn task_id(&self) -> &str {
        TASK_ID
    }

    async fn execute(&self, context: &mut TaskContext<'_>) -> Result<()> {
        let users: Vec<TransformedUser> =
            context.pull_json(transform::TASK_ID, TRANSFORMED_USERS_KEY)?;
        let frame = Frame::from_users(&users);

        self.sink.write_line(&frame.render())?;
        tracing::info!("💾 Loaded {} users", frame.len());

        if self.persist {
            let csv = frame.to_csv()?;
            self.storage.write_file(&self.path, &csv).await?;
            tracing::info!("📁 Output saved to: {}", self.path);
        } else {
            tracing::debug!("Persistence disabled, not writing {}", self.path);
        }

        Ok(())
    }
}
