//! Config for the movement factory
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! None of these settings changes the generated movements: they only affect logging, memoization
//! and how much the command line tool prints.
//!
//! # Environment Variables
//!
//! All values are optional and case-insensitive. Set the value to `"true"` to enable a flag.
//!
//! - `MOVEMENT_LOG`: log to a timestamped file in the working directory (default: `false`)
//! - `MOVEMENT_CACHE`: keep built movements in memory (default: `true`)
//! - `MOVEMENT_VERBOSE`: also print the hands in play each round (default: `false`)

/// Configuration for the movement factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) log: bool,
    pub(crate) cache: bool,
    pub(crate) verbose: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Logging to file is disabled.
    /// - Built movements are cached.
    /// - Output is not verbose.
    pub fn new() -> Self {
        Self {
            log: false,
            cache: true,
            verbose: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// The following environment variables are recognized:
    /// - `MOVEMENT_LOG`: if set to `"true"`, enables logging to file (default: `false`)
    /// - `MOVEMENT_CACHE`: if set to `"true"`, enables the movement cache (default: `true`)
    /// - `MOVEMENT_VERBOSE`: if set to `"true"`, enables verbose output (default: `false`)
    ///
    /// Any other value disables the flag; unset variables keep the default.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.trim().eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        Self {
            log: get_env_flag("MOVEMENT_LOG", false),
            cache: get_env_flag("MOVEMENT_CACHE", true),
            verbose: get_env_flag("MOVEMENT_VERBOSE", false),
        }
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable the movement cache.
    pub fn with_cache(mut self, value: bool) -> Self {
        self.cache = value;
        self
    }

    /// Enable or disable verbose output.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Whether output should include the hands in play each round.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod configuration_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert!(!config.log);
        assert!(config.cache);
        assert!(!config.is_verbose());
    }

    #[test]
    fn test_setters() {
        let config = Configuration::new()
            .with_log(true)
            .with_cache(false)
            .with_verbose(true);
        assert_eq!(
            config,
            Configuration {
                log: true,
                cache: false,
                verbose: true,
            }
        );
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("MOVEMENT_CACHE", "FALSE");
        std::env::set_var("MOVEMENT_VERBOSE", "True");
        std::env::remove_var("MOVEMENT_LOG");
        let config = Configuration::from_env();
        assert!(!config.cache);
        assert!(config.verbose);
        assert!(!config.log);
        std::env::remove_var("MOVEMENT_CACHE");
        std::env::remove_var("MOVEMENT_VERBOSE");
    }
}
