// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration.
//!
//! Reads runtime configuration from environment variables:
//!
//! - `HRCL_INTRA_PROCESS`: enable intra-process routing for nodes that do not
//!   set it explicitly ("1" or "true"; default: disabled)
//! - `HRCL_DEFAULT_DEPTH`: history depth of the QoS profile handed out by
//!   `Context::default_qos` (1-4096; default: 10)
//! - `HRCL_LOG_DISPATCH`: log every dispatched executable at debug level
//!   ("1" or "true"; default: disabled)

use std::env;

use crate::qos::DEFAULT_HISTORY_DEPTH;

/// Environment variable names
pub const ENV_INTRA_PROCESS: &str = "HRCL_INTRA_PROCESS";
pub const ENV_DEFAULT_DEPTH: &str = "HRCL_DEFAULT_DEPTH";
pub const ENV_LOG_DISPATCH: &str = "HRCL_LOG_DISPATCH";

/// Upper bound accepted for `HRCL_DEFAULT_DEPTH`.
const MAX_DEFAULT_DEPTH: usize = 4096;

/// Runtime configuration from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Default for `NodeBuilder::use_intra_process` when unset.
    pub intra_process: bool,

    /// History depth used by [`Context::default_qos`](crate::context::Context::default_qos).
    pub default_depth: usize,

    /// Log each dispatched executable at debug level.
    pub log_dispatch: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            intra_process: false,
            default_depth: DEFAULT_HISTORY_DEPTH,
            log_dispatch: false,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables.
    ///
    /// Invalid values are replaced by their defaults with a warning rather
    /// than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        let intra_process = env::var(ENV_INTRA_PROCESS)
            .ok()
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let default_depth = match env::var(ENV_DEFAULT_DEPTH) {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=MAX_DEFAULT_DEPTH).contains(&n) => n,
                Ok(n) => {
                    log::warn!(
                        "[config] {}={} out of range (1-{}), using {}",
                        ENV_DEFAULT_DEPTH,
                        n,
                        MAX_DEFAULT_DEPTH,
                        DEFAULT_HISTORY_DEPTH
                    );
                    DEFAULT_HISTORY_DEPTH
                }
                Err(_) => {
                    log::warn!(
                        "[config] {}={:?} is not a number, using {}",
                        ENV_DEFAULT_DEPTH,
                        raw,
                        DEFAULT_HISTORY_DEPTH
                    );
                    DEFAULT_HISTORY_DEPTH
                }
            },
            Err(_) => DEFAULT_HISTORY_DEPTH,
        };

        let log_dispatch = env::var(ENV_LOG_DISPATCH)
            .ok()
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            intra_process,
            default_depth,
            log_dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvConfig::default();
        assert!(!config.intra_process);
        assert_eq!(config.default_depth, DEFAULT_HISTORY_DEPTH);
        assert!(!config.log_dispatch);
    }
}
