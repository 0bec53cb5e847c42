// SPDX-License-Identifier: MIT

//! Engine configuration loaded from the environment

use std::env;
use std::str::FromStr;

use super::error::FlowError;

/// Ceiling on node executions per run unless a graph overrides it
pub const DEFAULT_MAX_STEPS: usize = 100;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl EngineConfig {
    /// Read `QUANTUMFLOW_HOST`, `QUANTUMFLOW_PORT` and `QUANTUMFLOW_MAX_STEPS`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_steps = parse_var(&lookup, "QUANTUMFLOW_MAX_STEPS")?.unwrap_or(defaults.max_steps);
        if max_steps == 0 {
            return Err(FlowError::config("QUANTUMFLOW_MAX_STEPS must be at least 1"));
        }

        Ok(Self {
            host: lookup("QUANTUMFLOW_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "QUANTUMFLOW_PORT")?.unwrap_or(defaults.port),
            max_steps,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, FlowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FlowError::config(format!("invalid {}='{}': {}", key, raw, e))),
    }
}
