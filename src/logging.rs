use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "smartfarm=info";

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` raises the crate to `debug` when `RUST_LOG` is unset.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "smartfarm=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
