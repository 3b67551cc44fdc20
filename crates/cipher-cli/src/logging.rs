//! Console logging for the `cipher` binary.
//!
//! Library crates only emit through `log`; this is the single place a
//! backend is installed. Dependencies stay at `warn` so `--debug` shows
//! the workspace's own chatter without HTTP and runtime noise.

const CIPHER_TARGETS: &[&str] = &[
    "cipher",
    "cipher_core",
    "cipher_session",
    "cipher_storage",
    "cipher_llm",
    "cipher_tools",
    "cipher_workspace",
];

/// Filter used when `RUST_LOG` is unset.
fn default_filter(debug: bool) -> String {
    if !debug {
        return "warn".to_string();
    }
    let mut filter = String::from("warn");
    for target in CIPHER_TARGETS {
        filter.push_str(&format!(",{}=debug", target));
    }
    filter
}

/// Install env_logger on stderr; `RUST_LOG` overrides the default filter.
pub fn init_logging(debug: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter(debug)))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}] {:<5} {} - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(default_filter(false), "warn");
    }

    #[test]
    fn debug_raises_only_workspace_crates() {
        let filter = default_filter(true);
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("cipher_workspace=debug"));
        assert!(filter.contains("cipher_storage=debug"));
        assert!(!filter.contains("reqwest"));
        assert_eq!(filter.matches("=debug").count(), CIPHER_TARGETS.len());
    }
}
