use common::{
    config::{Benchmark, Config},
    executor::{Executor, ExecutorInitializer},
    util::{command_with_logged_output, shell},
};
use eyre::{Result, WrapErr};
use fio::Metrics;
use itertools::iproduct;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::report::{Report, ReportRow};

/// Runs every benchmark on every executor, benchmark-major, stopping at the first error
pub async fn run_benchmarks(
    config: &Config,
    initializers: &[ExecutorInitializer],
    cancel: &CancellationToken,
) -> Result<Report> {
    let mut report = Report::new();

    for (benchmark, initializer) in iproduct!(&config.benchmarks, initializers) {
        if let Some(prepare) = &config.prepare {
            run_prepare(prepare, cancel).await?;
        }

        info!("initializing executor {}", initializer.name);
        let executor = initializer
            .init(cancel)
            .await
            .wrap_err_with(|| format!("failed to initialize executor {}", initializer.name))?;

        let metrics = run_on(executor, &initializer.name, benchmark, &config.install, cancel).await?;
        report.add_row(ReportRow {
            benchmark: benchmark.name.clone(),
            executor: initializer.name.clone(),
            metrics,
        });
    }

    debug!("Collected {} results", report.rows().len());
    Ok(report)
}

async fn run_prepare(prepare: &str, cancel: &CancellationToken) -> Result<()> {
    let shell = shell();
    info!("running prepare command {prepare:?} using shell {shell:?}");
    command_with_logged_output(Command::new(&shell).args(["-c", prepare]), cancel)
        .await
        .wrap_err_with(|| format!("failed to run prepare command {prepare:?}"))
}

/// Measures `benchmark` on `executor`, which is closed whether or not the measurement succeeds
async fn run_on(
    mut executor: Box<dyn Executor>,
    name: &str,
    benchmark: &Benchmark,
    install: &str,
    cancel: &CancellationToken,
) -> Result<Metrics> {
    let measured = measure(executor.as_mut(), name, benchmark, install, cancel).await;
    let closed = executor
        .close()
        .await
        .wrap_err_with(|| format!("failed to close executor {name}"));

    match (measured, closed) {
        (Ok(metrics), Ok(())) => Ok(metrics),
        (Ok(_), Err(err)) | (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!("{close_err:#}");
            Err(err)
        }
    }
}

async fn measure(
    executor: &mut dyn Executor,
    name: &str,
    benchmark: &Benchmark,
    install: &str,
    cancel: &CancellationToken,
) -> Result<Metrics> {
    info!("installing Flexible I/O tester (fio) on executor {name}");
    executor
        .run(install, cancel)
        .await
        .wrap_err_with(|| format!("failed to install fio on executor {name}"))?;

    info!("running benchmark {:?} on {name} executor", benchmark.name);
    let stdout = executor
        .run(&benchmark.command, cancel)
        .await
        .wrap_err_with(|| format!("benchmark {:?} failed on executor {name}", benchmark.name))?;

    let job = fio::parse(&stdout).wrap_err_with(|| {
        format!(
            "invalid output of benchmark {:?} on executor {name}",
            benchmark.name
        )
    })?;

    let metrics = Metrics::from_job(&job);
    metrics.log();
    Ok(metrics)
}
