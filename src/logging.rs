//=============================================
// src/logging.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing setup for the Tether driver
// Objective: Install one env-filtered subscriber and decide whether
//            instruction tracing is requested
//=============================================

use std::env;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Environment switch for per-instruction tracing.
pub const TRACE_ENV: &str = "TETHER_TRACE";

/// Install the global subscriber once. `RUST_LOG` wins; otherwise only
/// warnings are shown. `verbose` raises Tether's own targets to info and
/// `trace` lets the VM's instruction events through.
pub fn init(verbose: bool, trace: bool) {
    INIT.get_or_init(|| {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let mut directives = Vec::new();
        if verbose {
            directives.extend(["tether=info", "tether_core=info"]);
        }
        if trace {
            directives.push("tether_core::vm=trace");
        }
        for directive in directives {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .try_init();
    });
}

/// Whether `TETHER_TRACE` asks for instruction tracing.
pub fn trace_from_env() -> bool {
    env::var(TRACE_ENV).is_ok_and(|value| is_truthy(&value))
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_of_switch_values() {
        for value in ["1", "yes", "on", "TRUE"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["", "0", "false", "OFF", " off "] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
