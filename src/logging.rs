use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber for the command-line binary.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or
/// everything down to `debug` with `verbose`.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "fnr=debug" } else { "fnr=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
    );

    if subscriber.try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
