/* src/cli/core/src/logging.rs */

// Diagnostics go to stderr so rendered HTML on stdout stays pipeable.
// `RUST_LOG` wins over the verbosity flag when set.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn default_directive(verbose: bool) -> &'static str {
  if verbose { "debug" } else { "warn" }
}

pub fn init_logging(verbose: bool) {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

  let terminal_layer = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(verbose)
    .compact();

  // try_init: a second call (tests) keeps the first subscriber
  let _ = tracing_subscriber::registry().with(env_filter).with(terminal_layer).try_init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verbosity_picks_level() {
    assert_eq!(default_directive(false), "warn");
    assert_eq!(default_directive(true), "debug");
  }

  #[test]
  fn init_twice_is_harmless() {
    init_logging(false);
    init_logging(true);
  }
}
