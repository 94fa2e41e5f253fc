use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use common::config::{
    Benchmark, Catalogue, Config, DEFAULT_IMAGE, DEFAULT_INSTALL, validate_benchmarks,
};
use eyre::{Result, WrapErr};
use tokio::fs::read_to_string;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod bench;
mod report;

const MODULES: &[&str] = &["fio_bench", "common", "executors", "fio"];

#[derive(Parser)]
#[command(version, about = "Compare storage performance across executors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Extra log filter directives, e.g. `executors=trace`
    #[arg(short, long)]
    log: Vec<String>,
    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Flexible I/O tester (fio) benchmarks
    Fio(FioArgs),
}

#[derive(Args)]
struct FioArgs {
    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Image to use for testing
    #[arg(long, default_value = DEFAULT_IMAGE)]
    image: String,
    /// Command to run before running each benchmark
    #[arg(long, default_value = "")]
    prepare: String,
    /// Command installing fio on each executor
    #[arg(long, default_value = DEFAULT_INSTALL)]
    install: String,
    /// YAML file replacing the built-in benchmark catalogue
    #[arg(long)]
    benchmarks: Option<PathBuf>,
    /// Only run on these executors
    #[arg(long = "executor")]
    executors: Vec<String>,
}

impl FioArgs {
    async fn into_config(self) -> Result<Config> {
        let benchmarks = match &self.benchmarks {
            Some(path) => load_benchmarks(path).await?,
            None => fio::benchmarks(),
        };
        let config = Config {
            benchmarks,
            image: self.image,
            prepare: Some(self.prepare).filter(|prepare| !prepare.is_empty()),
            install: self.install,
            executors: self.executors,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let Commands::Fio(fio_args) = args.command;
    let _guard = init_logging(fio_args.debug, &args.log, args.log_file.as_deref())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling running commands");
                cancel.cancel();
            }
        }
    });

    if let Err(err) = run(fio_args, &cancel).await {
        error!("{err:#}");
        return Err(err);
    }
    Ok(())
}

async fn run(args: FioArgs, cancel: &CancellationToken) -> Result<()> {
    let config = args.into_config().await?;
    let initializers = executors::select(
        executors::default_initializers(&config.image),
        &config.executors,
    )?;

    let report = bench::run_benchmarks(&config, &initializers, cancel).await?;
    println!("{}", report.render());
    Ok(())
}

fn init_logging(
    debug: bool,
    directives: &[String],
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let log_level = if debug {
        "debug".to_owned()
    } else {
        std::env::var("RUST_LOG").unwrap_or("info".to_owned())
    };

    let mut env_filter = EnvFilter::new("warn");
    for module in MODULES {
        if !directives.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }
    for directive in directives {
        env_filter = env_filter.add_directive(directive.parse()?);
    }

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (
                Some(layer().with_writer(non_blocking).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

async fn load_benchmarks(path: &Path) -> Result<Vec<Benchmark>> {
    let contents = read_to_string(path)
        .await
        .wrap_err_with(|| format!("Reading benchmark catalogue {}", path.display()))?;
    let catalogue: Catalogue = serde_yml::from_str(&contents)
        .wrap_err_with(|| format!("Parsing benchmark catalogue {}", path.display()))?;
    validate_benchmarks(&catalogue.benchmarks)
        .wrap_err_with(|| format!("Invalid benchmark catalogue {}", path.display()))?;
    Ok(catalogue.benchmarks)
}
