//! Subscriber setup for the command-line front end.
//!
//! The library only emits events; installing a subscriber is left to
//! binaries.

use tracing_subscriber::EnvFilter;

use crate::errors::{Result, SegmenterError};

/// Level for this crate's events at a given `-v` count.
pub const fn verbosity_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install a global fmt subscriber. `RUST_LOG`, when set, wins over
/// `verbosity`.
pub fn init_tracing(verbosity: u8) -> Result<()> {
    let level = verbosity_level(verbosity);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,image_segmenter_rs={level},image_segmenter={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| SegmenterError::Configuration {
            message: format!("failed to install tracing subscriber: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_level(0), "info");
        assert_eq!(verbosity_level(1), "debug");
        assert_eq!(verbosity_level(5), "trace");
    }
}
