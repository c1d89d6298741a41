//! Deserializer configuration.

/// Tunable behavior of the [`EventDeserializer`](crate::EventDeserializer).
#[derive(Debug, Clone)]
pub struct DeserializerConfig {
    /// Accept the strings `"true"` and `"false"` for boolean columns in
    /// addition to real boolean tokens. Kept on by default for clients
    /// that historically sent string-encoded booleans.
    pub boolean_from_string: bool,
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            boolean_from_string: true,
        }
    }
}

impl DeserializerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether string-encoded booleans are accepted.
    #[must_use]
    pub fn with_boolean_from_string(mut self, enabled: bool) -> Self {
        self.boolean_from_string = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(DeserializerConfig::new().boolean_from_string);
    }

    #[test]
    fn test_builder() {
        let config = DeserializerConfig::new().with_boolean_from_string(false);
        assert!(!config.boolean_from_string);
    }
}
