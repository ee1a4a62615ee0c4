use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Env;

const DEFAULT_FILTER: &str = "user_management_service=debug,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Production emits one JSON object
/// per line; other environments use the human-readable format.
pub fn init(env: Env) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Prod => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        Env::Local | Env::Dev => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
