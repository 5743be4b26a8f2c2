//! Tracing subscriber setup for processes that host a material server.

use ember_common::{EmberError, EmberResult};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` plus `default_directive`.
///
/// A subscriber that is already installed is kept.
pub fn init(default_directive: &str) -> EmberResult<()> {
    let directive = default_directive
        .parse()
        .map_err(|e| EmberError::Init(format!("invalid log directive '{default_directive}': {e}")))?;

    let installed = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive))
        .try_init();

    if installed.is_err() {
        debug!("Tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_ok() {
        assert!(init("ember=debug").is_ok());
        assert!(init("ember=info").is_ok());
    }

    #[test]
    fn test_invalid_directive() {
        let err = init("ember=notalevel").expect_err("bad level");
        assert!(matches!(err, EmberError::Init(_)));
    }
}
