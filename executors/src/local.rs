use common::{
    executor::Executor,
    util::{DEFAULT_SHELL, command_with_output},
};
use eyre::{Result, WrapErr};
use tempfile::TempDir;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const NAME: &str = "local";

/// Runs commands on the host, each executor instance in its own scratch directory
#[derive(Debug)]
pub struct LocalExecutor {
    dir: TempDir,
}

impl LocalExecutor {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("fio-bench-")
            .tempdir()
            .wrap_err("Creating scratch directory")?;
        debug!("Local executor working in {}", dir.path().display());
        Ok(Self { dir })
    }
}

#[async_trait::async_trait]
impl Executor for LocalExecutor {
    fn name(&self) -> &str {
        NAME
    }

    async fn run(&mut self, command: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        debug!("local: {command}");
        command_with_output(
            Command::new(DEFAULT_SHELL)
                .args(["-c", command])
                .current_dir(self.dir.path()),
            cancel,
        )
        .await
        .wrap_err_with(|| format!("Running {command:?} on {NAME} executor"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let path = self.dir.path().to_owned();
        self.dir
            .close()
            .wrap_err_with(|| format!("Removing {}", path.display()))
    }
}
