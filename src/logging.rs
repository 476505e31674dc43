use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "filesync=info";

/// Initialize a tracing subscriber writing to stderr.
///
/// Uses `RUST_LOG` when set, `filesync=info` otherwise (`filesync=debug` with `verbose`).
/// Stdout is left for command output.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let default = if verbose { "filesync=debug" } else { DEFAULT_FILTER };
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
