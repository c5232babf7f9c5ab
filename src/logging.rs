use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INIT: Once = Once::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,fitlog=debug";

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter;
/// calling this more than once is a no-op.
pub fn init_logging() {
  LOGGER_INIT.call_once(|| {
    let env_filter = EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    // Another subscriber may already be installed (e.g. by a host app)
    let _ = tracing_subscriber::registry()
      .with(env_filter)
      .with(fmt::layer().with_target(true))
      .try_init();
  });
}
