use std::any::Any;
use tracing_subscriber::{
  EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
  #[error("Failed to create trace file: {0}")]
  TraceFile(#[from] std::io::Error),
  #[error("Failed to install the global subscriber: {0}")]
  Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber. `RUST_LOG` picks the filter, `info` when unset.
///
/// The returned guards flush the profiler backends when dropped, keep them alive until exit.
#[must_use = "dropping the guards stops the profiler backends"]
pub fn enable_tracing() -> Result<Vec<Box<dyn Any>>, TracingError> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let subscriber = Registry::default().with(filter).with(fmt::layer());

  #[allow(unused_mut)]
  let mut guards: Vec<Box<dyn Any>> = Vec::new();

  #[cfg(feature = "tracing-tracy")]
  let subscriber = {
    use tracing_tracy::{TracyLayer, client::Client};

    let (tracy_layer, tracy_client) = (TracyLayer::default(), Client::start());

    guards.push(Box::new(tracy_client));
    subscriber.with(tracy_layer)
  };

  #[cfg(feature = "tracing-chrome")]
  let subscriber = {
    use chrono::prelude::*;
    use std::fs::File;
    use tracing_chrome::ChromeLayerBuilder;

    let output_file = format!(
      "target/trace-{variant}.json",
      variant = Local::now().format("%Y%m%d-%H%M%S")
    );

    println!("Saving results to {output_file}");

    let (chrome_layer, chrome_guard) = ChromeLayerBuilder::new()
      .writer(File::create(output_file)?)
      .build();

    guards.push(Box::new(chrome_guard));
    subscriber.with(chrome_layer)
  };

  subscriber.try_init()?;

  Ok(guards)
}
