//! The driver option bag passed from a `DatabaseConfig` down to
//! `Driver::connect`.

use std::collections::HashMap;

/// Free-form key/value options threaded from configuration down to a
/// driver's `connect` call (pool size hints, TLS flags, backend-specific
/// knobs). Unknown keys are ignored by drivers that don't recognize them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    options: HashMap<String, String>,
}

impl ConnectionOptions {
    /// An empty option bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, overwriting any previous value.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(key, value);
        self
    }

    /// Sets `key` to `value`, overwriting any previous value, in place.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// The value for `key`, or `default` if absent.
    #[must_use]
    pub fn get_option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options.get(key).map_or(default, String::as_str)
    }

    /// `true` if `key` has been set.
    #[must_use]
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// All options, in insertion-unordered form.
    #[must_use]
    pub fn all_options(&self) -> &HashMap<String, String> {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_option_returns_default() {
        let opts = ConnectionOptions::new();
        assert_eq!(opts.get_option("tls", "off"), "off");
        assert!(!opts.has_option("tls"));
    }

    #[test]
    fn builder_sets_override_previous_value() {
        let opts = ConnectionOptions::new()
            .with_option("tls", "off")
            .with_option("tls", "on");
        assert_eq!(opts.get_option("tls", ""), "on");
    }
}
