//! Binder configuration.
//!
//! ```rust
//! use hamsta_core::Config;
//!
//! let config = Config::from_json(r#"{ "prefix": "x-" }"#).unwrap();
//! assert_eq!(config.prefix, "x-");
//! assert_eq!(config.event_prefix, "on-");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Prefix that marks an attribute as a directive.
    pub prefix: String,
    /// Prefix, after `prefix`, that marks an event directive (`h-on-click`).
    pub event_prefix: String,
    /// Maximum nesting of function calls inside compiled code. Effects
    /// that re-run themselves by writing a signal they read count too, one
    /// level per re-run.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "h-".to_string(),
            event_prefix: "on-".to_string(),
            max_call_depth: 32,
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.event_prefix.is_empty() {
            return Err(ConfigError::EmptyEventPrefix);
        }
        Ok(())
    }

    /// Full attribute name of a built-in directive, e.g. `h-text`.
    pub fn attribute(&self, directive: &str) -> String {
        format!("{}{}", self.prefix, directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.attribute("signals"), "h-signals");
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert!(matches!(
            Config::from_json(r#"{ "prefix": "" }"#),
            Err(ConfigError::EmptyPrefix)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
