use common::executor::ExecutorInitializer;
use eyre::{Result, bail};

pub mod local;
pub mod tart;

pub use local::LocalExecutor;
pub use tart::TartExecutor;

/// Every known executor, in the order they are benchmarked
pub fn default_initializers(image: &str) -> Vec<ExecutorInitializer> {
    let image = image.to_owned();
    vec![
        ExecutorInitializer::new(local::NAME, |_| LocalExecutor::new()),
        ExecutorInitializer::new(tart::NAME, move |cancel| {
            TartExecutor::new(image.clone(), cancel)
        }),
    ]
}

/// Keeps the initializers named in `names`, preserving their original order
///
/// An empty `names` keeps everything. Unknown names are an error.
pub fn select(
    initializers: Vec<ExecutorInitializer>,
    names: &[String],
) -> Result<Vec<ExecutorInitializer>> {
    if names.is_empty() {
        return Ok(initializers);
    }

    for name in names {
        if !initializers.iter().any(|init| init.name.eq(name)) {
            let known = initializers
                .iter()
                .map(|init| init.name.as_str())
                .collect::<Vec<_>>();
            bail!("Unknown executor {name:?}, expected one of {known:?}");
        }
    }

    Ok(initializers
        .into_iter()
        .filter(|init| names.contains(&init.name))
        .collect())
}
