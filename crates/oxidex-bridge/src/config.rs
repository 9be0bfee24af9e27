//! Bridge configuration.
//!
//! Everything has a working default. [`BridgeConfig::from_env`] reads the
//! following variables:
//!
//! - `OXIDEX_BRIDGE_STRICT` - `1`/`true`/`yes`/`on` disables the
//!   last-character fallback of the type mapper
//! - `OXIDEX_BRIDGE_QUALIFIERS` - `iterative` (default) or `once`
//! - `OXIDEX_BRIDGE_SELECTORS` - `local` (default), `libobjc`, or a path to
//!   an Objective-C runtime library
//!
//! Logging is configured separately through `OXIDEX_LOG`, see `oxidex_log`.

use std::path::PathBuf;

use oxidex_log::warn;

use crate::encoding::QualifierStripping;

/// Environment variable enabling strict type mapping.
pub const STRICT_ENV: &str = "OXIDEX_BRIDGE_STRICT";

/// Environment variable selecting the qualifier stripping mode.
pub const QUALIFIERS_ENV: &str = "OXIDEX_BRIDGE_QUALIFIERS";

/// Environment variable selecting the selector runtime.
pub const SELECTORS_ENV: &str = "OXIDEX_BRIDGE_SELECTORS";

/// Options controlling how tokens are classified and mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapperOptions {
    /// Reject tokens that only match through their last character.
    pub strict: bool,
    /// How leading method qualifiers are removed.
    pub qualifiers: QualifierStripping,
}

impl MapperOptions {
    /// Sets strict mode.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the qualifier stripping mode.
    #[must_use]
    pub const fn qualifier_stripping(mut self, mode: QualifierStripping) -> Self {
        self.qualifiers = mode;
        self
    }
}

/// Which implementation answers selector registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectorBackend {
    /// The in-process selector table.
    #[default]
    Local,
    /// The Objective-C runtime library, at its default location or at the
    /// given path.
    LibObjc(Option<PathBuf>),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BridgeConfig {
    /// Type mapper options.
    pub mapper: MapperOptions,
    /// Selector runtime selection.
    pub selectors: SelectorBackend,
}

impl BridgeConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Unparsable values are logged and replaced by defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BridgeConfig::default();

        if let Some(value) = lookup(STRICT_ENV) {
            match parse_flag(&value) {
                Some(strict) => config.mapper.strict = strict,
                None => warn!("ignoring {STRICT_ENV}={value:?}: expected a boolean"),
            }
        }

        if let Some(value) = lookup(QUALIFIERS_ENV) {
            match value.trim().to_ascii_lowercase().as_str() {
                "iterative" => config.mapper.qualifiers = QualifierStripping::Iterative,
                "once" => config.mapper.qualifiers = QualifierStripping::Once,
                _ => warn!("ignoring {QUALIFIERS_ENV}={value:?}: expected iterative or once"),
            }
        }

        if let Some(value) = lookup(SELECTORS_ENV) {
            let value = value.trim();
            config.selectors = match value.to_ascii_lowercase().as_str() {
                "" | "local" => SelectorBackend::Local,
                "libobjc" | "objc" => SelectorBackend::LibObjc(None),
                _ => SelectorBackend::LibObjc(Some(PathBuf::from(value))),
            };
        }

        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> BridgeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BridgeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, BridgeConfig::default());
        assert!(!config.mapper.strict);
        assert_eq!(config.mapper.qualifiers, QualifierStripping::Iterative);
        assert_eq!(config.selectors, SelectorBackend::Local);
    }

    #[test]
    fn test_reads_every_variable() {
        let config = config_from(&[
            (STRICT_ENV, "Yes"),
            (QUALIFIERS_ENV, "once"),
            (SELECTORS_ENV, "libobjc"),
        ]);
        assert!(config.mapper.strict);
        assert_eq!(config.mapper.qualifiers, QualifierStripping::Once);
        assert_eq!(config.selectors, SelectorBackend::LibObjc(None));
    }

    #[test]
    fn test_selector_library_path() {
        let config = config_from(&[(SELECTORS_ENV, "/opt/gnustep/lib/libobjc.so.4")]);
        assert_eq!(
            config.selectors,
            SelectorBackend::LibObjc(Some(PathBuf::from("/opt/gnustep/lib/libobjc.so.4")))
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[(STRICT_ENV, "maybe"), (QUALIFIERS_ENV, "twice")]);
        assert_eq!(config.mapper, MapperOptions::default());
    }
}
