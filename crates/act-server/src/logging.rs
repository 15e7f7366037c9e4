//! Logging controls and filter-spec computation, mirroring the precedence
//! rule this corpus uses elsewhere: an explicit filter string wins, then
//! trace/debug/level flags, then `RUST_LOG`, then a crate-scoped default.
use clap::Args;
use tracing_subscriber::EnvFilter;

const OUR_CRATES: &[&str] = &["act_server", "act_bridge", "act_tools", "act_testkit", "act_protocol"];

/// Logging controls for the `act-server` CLI.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set the log level to trace for this crate family.
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set the log level to debug for this crate family.
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single log level for this crate family (error|warn|info|debug|trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive, overriding every other flag.
    #[arg(long)]
    pub log_filter: Option<String>,
}

fn crate_specs(level: &str) -> Vec<String> {
    let level = level.to_ascii_lowercase();
    OUR_CRATES.iter().map(|target| format!("{target}={level}")).collect()
}

/// Build a filter directive setting `level` for every crate in this workspace.
pub fn level_spec_for(level: &str) -> String {
    crate_specs(level).join(",")
}

/// Compute the final filter spec, in precedence order: `log_filter` >
/// `trace`/`debug`/`log_level` > `RUST_LOG` > crate-scoped `info`.
pub fn compute_spec(trace: bool, debug: bool, log_level: Option<&str>, log_filter: Option<&str>) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(level) = log_level {
        return level_spec_for(level);
    }
    if let Ok(spec) = std::env::var("RUST_LOG") {
        return spec;
    }
    level_spec_for("info")
}

/// Build an [`EnvFilter`] from a computed spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_everything() {
        let spec = compute_spec(true, true, Some("warn"), Some("act_bridge=debug"));
        assert_eq!(spec, "act_bridge=debug");
    }

    #[test]
    fn trace_flag_scopes_to_our_crates() {
        let spec = compute_spec(true, false, None, None);
        assert!(spec.contains("act_bridge=trace"));
        assert!(spec.contains("act_server=trace"));
    }
}
