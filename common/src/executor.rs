use core::fmt::Debug;

use eyre::Result;
use futures::{FutureExt, future::BoxFuture};
use tokio_util::sync::CancellationToken;

#[async_trait::async_trait]
pub trait Executor: Debug + Send {
    /// Name of the executor, for identification
    fn name(&self) -> &str;
    /// Runs a shell command inside the executor's environment
    ///
    /// Arguments:
    /// * `command` - Passed verbatim to `sh -c`
    /// * `cancel` - Kills the in-flight command once cancelled
    ///
    /// Returns the captured standard output, or an error if the command could not be
    /// started, exited unsuccessfully or was cancelled
    async fn run(&mut self, command: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;
    /// Releases every resource held by the executor
    async fn close(self: Box<Self>) -> Result<()>;
}

pub type ExecutorFactory =
    Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<Box<dyn Executor>>> + Send + Sync>;

/// A named way of creating a fresh [`Executor`], called once per matrix cell
pub struct ExecutorInitializer {
    pub name: String,
    factory: ExecutorFactory,
}

impl ExecutorInitializer {
    pub fn new<F, Fut, E>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<E>> + Send + 'static,
        E: Executor + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move |cancel| {
                factory(cancel)
                    .map(|executor| executor.map(|e| Box::new(e) as Box<dyn Executor>))
                    .boxed()
            }),
        }
    }

    pub async fn init(&self, cancel: &CancellationToken) -> Result<Box<dyn Executor>> {
        (self.factory)(cancel.clone()).await
    }
}

impl Debug for ExecutorInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorInitializer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
