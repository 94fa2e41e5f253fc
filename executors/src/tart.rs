use std::{process::Stdio, time::Duration};

use chrono::Local;
use common::{executor::Executor, util::command_with_output};
use eyre::{Result, WrapErr, bail};
use tokio::{
    process::{Child, Command},
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const NAME: &str = "tart";

const TART: &str = "tart";
const BOOT_ATTEMPTS: u32 = 120;
const BOOT_POLL: Duration = Duration::from_secs(1);
/// Prepended to every command, `tart exec` does not go through a login shell
const ENV_PREFIX: &str =
    "export PATH=/opt/homebrew/bin:/usr/local/bin:$PATH HOMEBREW_NO_AUTO_UPDATE=1;";

/// A throwaway macOS VM cloned from an image
#[derive(Debug)]
pub struct TartExecutor {
    vm: String,
    vm_process: Child,
}

impl TartExecutor {
    /// Clones `image` into a fresh VM and waits until it accepts commands
    pub async fn new(image: String, cancel: CancellationToken) -> Result<Self> {
        let vm = format!("fio-bench-{}", Local::now().format("%Y%m%d-%H%M%S-%3f"));

        info!("Cloning {image} into VM {vm}");
        command_with_output(Command::new(TART).args(["clone", &image, &vm]), &cancel)
            .await
            .wrap_err_with(|| format!("Cloning image {image}"))?;

        let vm_process = match Command::new(TART)
            .args(["run", "--no-graphics", &vm])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                delete_vm(&vm).await;
                return Err(err).wrap_err_with(|| format!("Starting VM {vm}"));
            }
        };

        let mut executor = Self { vm, vm_process };
        let booted = executor.wait_for_boot(&cancel).await;
        if let Err(err) = booted {
            if let Err(close_err) = Box::new(executor).close().await {
                warn!("Failed to clean up VM after boot failure: {close_err:#}");
            }
            return Err(err);
        }
        Ok(executor)
    }

    async fn wait_for_boot(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("Waiting for VM {} to boot", self.vm);
        for attempt in 1..=BOOT_ATTEMPTS {
            if let Some(status) = self.vm_process.try_wait()? {
                bail!("VM {} exited during boot with {status}", self.vm);
            }

            match command_with_output(Command::new(TART).args(["exec", &self.vm, "true"]), cancel)
                .await
            {
                Ok(_) => {
                    debug!("VM {} ready after {attempt} attempts", self.vm);
                    return Ok(());
                }
                Err(err) if cancel.is_cancelled() => return Err(err),
                Err(err) => debug!("VM {} not ready yet: {err:#}", self.vm),
            }

            tokio::select! {
                () = cancel.cancelled() => bail!("Cancelled"),
                () = sleep(BOOT_POLL) => {}
            }
        }
        bail!("VM {} did not boot after {BOOT_ATTEMPTS} attempts", self.vm)
    }
}

#[async_trait::async_trait]
impl Executor for TartExecutor {
    fn name(&self) -> &str {
        NAME
    }

    async fn run(&mut self, command: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        debug!("{}: {command}", self.vm);
        command_with_output(
            Command::new(TART).args([
                "exec",
                &self.vm,
                "/bin/sh",
                "-c",
                &format!("{ENV_PREFIX} {command}"),
            ]),
            cancel,
        )
        .await
        .wrap_err_with(|| format!("Running {command:?} on {NAME} executor"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = self;
        info!("Stopping VM {}", this.vm);
        let stopped = command_with_output(
            Command::new(TART).args(["stop", &this.vm]),
            &CancellationToken::new(),
        )
        .await;
        if stopped.is_err() {
            _ = this.vm_process.start_kill();
        }
        _ = this.vm_process.wait().await;

        let deleted = command_with_output(
            Command::new(TART).args(["delete", &this.vm]),
            &CancellationToken::new(),
        )
        .await;

        stopped.wrap_err_with(|| format!("Stopping VM {}", this.vm))?;
        deleted.wrap_err_with(|| format!("Deleting VM {}", this.vm))?;
        Ok(())
    }
}

async fn delete_vm(vm: &str) {
    if let Err(err) =
        command_with_output(Command::new(TART).args(["delete", vm]), &CancellationToken::new()).await
    {
        warn!("Failed to delete VM {vm}: {err:#}");
    }
}
