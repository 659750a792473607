//! Configuration of satisfiability checks.
use std::fmt::Write;
use std::time::Duration;

use serde::Deserialize;

use crate::cnf::{Strategy, DEFAULT_MAX_DEPTH};
use crate::solver::UnknownVariablePolicy;

/// Configurable parameters used for satisfiability checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SatConfig {
    /// CNF conversion of presence conditions, "replacing" or "distributive". (Default: "replacing")
    pub strategy: Strategy,

    /// Handling of variables missing in the feature model, "fail", "open" or "closed".
    /// (Default: "fail")
    pub unknown_variables: UnknownVariablePolicy,

    /// Prefix prepended to the variable names of DIMACS models. (Default: "CONFIG_")
    pub name_prefix: String,

    /// Time limit of a single check in milliseconds, 0 for no limit. (Default: 0)
    pub timeout_ms: u64,

    /// Maximal nesting depth of converted formulas. (Default: 1000)
    pub max_depth: usize,
}

impl Default for SatConfig {
    fn default() -> SatConfig {
        SatConfig {
            strategy: Strategy::Replacing,
            unknown_variables: UnknownVariablePolicy::Fail,
            name_prefix: "CONFIG_".to_owned(),
            timeout_ms: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SatConfig {
    /// The time limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Description of all options and their defaults.
    pub fn help() -> String {
        let defaults = SatConfig::default();
        let options = [
            (
                "strategy",
                format!("{:?}", defaults.strategy.name()),
                "CNF conversion of presence conditions, \"replacing\" or \"distributive\".",
            ),
            (
                "unknown_variables",
                format!("{:?}", defaults.unknown_variables.name()),
                "Handling of variables missing in the feature model, \"fail\", \"open\" or \
                 \"closed\".",
            ),
            (
                "name_prefix",
                format!("{:?}", defaults.name_prefix),
                "Prefix prepended to the variable names of DIMACS models.",
            ),
            (
                "timeout_ms",
                defaults.timeout_ms.to_string(),
                "Time limit of a single check in milliseconds, 0 for no limit.",
            ),
            (
                "max_depth",
                defaults.max_depth.to_string(),
                "Maximal nesting depth of converted formulas.",
            ),
        ];

        let mut help = String::new();
        for (name, default, doc) in options.iter() {
            let _ = writeln!(help, "{} = {}", name, default);
            let _ = writeln!(help, "    {}", doc);
        }
        help
    }
}

/// Partial configuration, e.g. read from a TOML file or command line options.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SatConfigUpdate {
    pub strategy: Option<Strategy>,
    pub unknown_variables: Option<UnknownVariablePolicy>,
    pub name_prefix: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_depth: Option<usize>,
}

impl SatConfigUpdate {
    pub fn new() -> SatConfigUpdate {
        SatConfigUpdate::default()
    }

    /// Takes all values set in `other`, overriding values set in `self`.
    pub fn merge(&mut self, other: SatConfigUpdate) {
        if other.strategy.is_some() {
            self.strategy = other.strategy;
        }
        if other.unknown_variables.is_some() {
            self.unknown_variables = other.unknown_variables;
        }
        if other.name_prefix.is_some() {
            self.name_prefix = other.name_prefix;
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }
    }

    /// Overrides the values of `config` that are set in this update.
    pub fn apply(&self, config: &mut SatConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(policy) = self.unknown_variables {
            config.unknown_variables = policy;
        }
        if let Some(prefix) = &self.name_prefix {
            config.name_prefix = prefix.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
    }
}
