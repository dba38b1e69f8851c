// Copyright (c) 2025 knix
// All rights reserved.

use log::warn;

pub const COMPILE_METHODS_VAR: &str = "JITCLASS_COMPILE_METHODS";
pub const EAGER_COMPILE_VAR: &str = "JITCLASS_EAGER_COMPILE";
pub const MAX_NESTING_DEPTH_VAR: &str = "JITCLASS_MAX_NESTING_DEPTH";
pub const MAX_CALL_DEPTH_VAR: &str = "JITCLASS_MAX_CALL_DEPTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether bound methods are compiled unless their class or method says otherwise
    pub compile_methods: bool,
    /// Lower compiled methods as soon as their specialization is published,
    /// instead of on first call
    pub eager_compile: bool,
    /// How many specializations may be in progress at once before a nested
    /// request is treated as unbounded
    pub max_nesting_depth: u32,
    /// Method invocations deeper than this fail with a runtime error. Every
    /// level costs several interpreter frames of native stack, and the default
    /// leaves headroom on a 2 MiB thread.
    pub max_call_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            compile_methods: true,
            eager_compile: false,
            max_nesting_depth: 64,
            max_call_depth: 48,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by any `JITCLASS_*` variables that are set
    pub fn from_env() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var(COMPILE_METHODS_VAR).and_then(|v| parse_flag(COMPILE_METHODS_VAR, &v)) {
            self.compile_methods = value;
        }
        if let Some(value) = var(EAGER_COMPILE_VAR).and_then(|v| parse_flag(EAGER_COMPILE_VAR, &v)) {
            self.eager_compile = value;
        }
        if let Some(depth) = var(MAX_NESTING_DEPTH_VAR).and_then(|v| parse_depth(MAX_NESTING_DEPTH_VAR, &v)) {
            self.max_nesting_depth = depth;
        }
        if let Some(depth) = var(MAX_CALL_DEPTH_VAR).and_then(|v| parse_depth(MAX_CALL_DEPTH_VAR, &v)) {
            self.max_call_depth = depth;
        }
    }
}

fn parse_depth(name: &str, value: &str) -> Option<u32> {
    match value.trim().parse::<u32>() {
        Ok(depth) if depth > 0 => Some(depth),
        _ => {
            warn!("Ignoring {name}={value}: expected a positive integer");
            None
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring {name}={value}: expected a boolean");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|name| match name {
            COMPILE_METHODS_VAR => Some("0".to_string()),
            EAGER_COMPILE_VAR => Some("True".to_string()),
            MAX_NESTING_DEPTH_VAR => Some(" 8 ".to_string()),
            MAX_CALL_DEPTH_VAR => Some("32".to_string()),
            _ => None,
        });
        assert_eq!(
            config,
            EngineConfig {
                compile_methods: false,
                eager_compile: true,
                max_nesting_depth: 8,
                max_call_depth: 32
            }
        );
    }

    #[test]
    fn bad_values_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|name| match name {
            COMPILE_METHODS_VAR => Some("maybe".to_string()),
            MAX_NESTING_DEPTH_VAR => Some("0".to_string()),
            MAX_CALL_DEPTH_VAR => Some("deep".to_string()),
            _ => None,
        });
        assert_eq!(config, EngineConfig::default());
    }
}
