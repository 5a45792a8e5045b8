//! Process-level configuration (§6, §9 design notes).
//!
//! `RuntimeConfig` is an explicit, read-mostly object passed by reference through the
//! planner, router, and coordinator — there is no hidden singleton. It is built once
//! from the environment at process start and may only be replaced at process restart.

use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwoPcMode {
    /// Always run prepare on every enlisted adapter, even for a single participant.
    Strict,
    /// Skip prepare and commit directly when exactly one adapter is enlisted.
    OnePhaseOptimization,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Whether catalog name lookups fold case before comparing.
    pub case_sensitive: bool,
    pub two_pc_mode: TwoPcMode,
    pub query_timeout: Duration,
    pub unique_constraint_enforcement: bool,
    pub foreign_key_enforcement: bool,
    pub joined_table_scan_cache: bool,
    pub joined_table_scan_cache_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            two_pc_mode: TwoPcMode::Strict,
            query_timeout: Duration::from_secs(30),
            unique_constraint_enforcement: true,
            foreign_key_enforcement: true,
            joined_table_scan_cache: true,
            joined_table_scan_cache_size: 256,
        }
    }
}

impl RuntimeConfig {
    /// Read the environment variables listed in §6, falling back to the defaults
    /// above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let case_sensitive = read_bool("CASE_SENSITIVE", defaults.case_sensitive);
        let two_pc_mode = match std::env::var("TWO_PC_MODE").ok().as_deref() {
            Some("one_phase") => TwoPcMode::OnePhaseOptimization,
            Some("strict") | None => defaults.two_pc_mode.clone(),
            Some(other) => {
                debug!(value = other, "unrecognized TWO_PC_MODE, using default");
                defaults.two_pc_mode.clone()
            }
        };
        let query_timeout = std::env::var("QUERY_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.query_timeout);
        let unique_constraint_enforcement = read_bool(
            "UNIQUE_CONSTRAINT_ENFORCEMENT",
            defaults.unique_constraint_enforcement,
        );
        let foreign_key_enforcement = read_bool(
            "FOREIGN_KEY_ENFORCEMENT",
            defaults.foreign_key_enforcement,
        );
        let joined_table_scan_cache =
            read_bool("JOINED_TABLE_SCAN_CACHE", defaults.joined_table_scan_cache);
        let joined_table_scan_cache_size = std::env::var("JOINED_TABLE_SCAN_CACHE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.joined_table_scan_cache_size);

        let resolved = Self {
            case_sensitive,
            two_pc_mode,
            query_timeout,
            unique_constraint_enforcement,
            foreign_key_enforcement,
            joined_table_scan_cache,
            joined_table_scan_cache_size,
        };
        debug!(?resolved, "resolved runtime configuration");
        resolved
    }
}

fn read_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("1") | Some("true") | Some("TRUE") => true,
        Some("0") | Some("false") | Some("FALSE") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let config = RuntimeConfig::default();
        assert!(config.case_sensitive);
        assert!(config.unique_constraint_enforcement);
        assert!(config.foreign_key_enforcement);
        assert_eq!(config.two_pc_mode, TwoPcMode::Strict);
    }

    #[test]
    fn read_bool_falls_back_on_unset() {
        assert!(read_bool("POLYPLANE_TEST_UNSET_FLAG", true));
        assert!(!read_bool("POLYPLANE_TEST_UNSET_FLAG", false));
    }
}
