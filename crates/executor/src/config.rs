//! Batch options via TOML
//!
//! `BatchOptions` can be built in code or loaded from a small TOML file:
//! every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use txbatch_core::{Error, Result};

/// Conventional file name for batch options.
pub const CONFIG_FILE_NAME: &str = "txbatch.toml";

/// Options recognized by a batch run.
///
/// # Example
///
/// ```toml
/// # Dispatch every operation at once instead of one after another
/// parallel = false
///
/// # Settle once the last operation succeeds, without waiting for commit
/// resolve_early = false
///
/// # Stores to add to a transaction opened by the batch
/// extra_stores = ["audit"]
///
/// # Check unique indexes before writing, for engines that do not
/// emulate_unique_indexes = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Dispatch every request immediately rather than strictly in order.
    #[serde(default)]
    pub parallel: bool,
    /// Settle when the last operation succeeds instead of on commit.
    #[serde(default)]
    pub resolve_early: bool,
    /// Extra stores to scope a freshly opened transaction to.
    #[serde(default)]
    pub extra_stores: Vec<String>,
    /// Run the emulated unique-index check before each add/put.
    #[serde(default)]
    pub emulate_unique_indexes: bool,
}

impl BatchOptions {
    /// Switch to parallel dispatch.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Settle as soon as the last operation succeeds.
    pub fn resolve_early(mut self) -> Self {
        self.resolve_early = true;
        self
    }

    /// Add a store to the scope of a transaction opened by the batch.
    pub fn extra_store(mut self, name: impl Into<String>) -> Self {
        self.extra_stores.push(name.into());
        self
    }

    /// Turn on the emulated unique-index check.
    pub fn emulate_unique_indexes(mut self) -> Self {
        self.emulate_unique_indexes = true;
        self
    }

    /// Returns the default options file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# txbatch options
#
# Dispatch mode (default: false)
#   false = one request at a time, groups and stores in order
#   true  = every request dispatched at once
parallel = false

# Settle when the last operation succeeds rather than when the
# transaction commits (default: false)
resolve_early = false

# Stores added to a transaction the batch opens itself (default: [])
extra_stores = []

# Look up unique indexes before every add/put and refuse writes that
# would duplicate a value owned by another record (default: false).
# Only needed for engines that do not enforce unique indexes natively.
emulate_unique_indexes = false
"#
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the text is not valid TOML or
    /// a field has the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::invalid_argument(format!("Failed to parse batch options: {}", e)))
    }

    /// Read and parse options from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::internal(format!(
                "Failed to read options file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::invalid_argument(format!(
                "Failed to parse options file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize these options to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize batch options: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::internal(format!(
                "Failed to write options file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let parsed = BatchOptions::from_toml_str(BatchOptions::default_toml()).unwrap();
        assert_eq!(parsed, BatchOptions::default());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let parsed = BatchOptions::from_toml_str("parallel = true").unwrap();
        assert!(parsed.parallel);
        assert!(!parsed.resolve_early);
        assert!(parsed.extra_stores.is_empty());
    }

    #[test]
    fn test_wrong_type_is_argument_error() {
        let err = BatchOptions::from_toml_str("parallel = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.is_type_error());
    }

    #[test]
    fn test_builder_setters() {
        let opts = BatchOptions::default()
            .parallel()
            .resolve_early()
            .extra_store("audit")
            .emulate_unique_indexes();
        assert!(opts.parallel && opts.resolve_early && opts.emulate_unique_indexes);
        assert_eq!(opts.extra_stores, vec!["audit".to_string()]);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let opts = BatchOptions::default().parallel().extra_store("audit");
        opts.write_to_file(&path).unwrap();
        assert_eq!(BatchOptions::from_file(&path).unwrap(), opts);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = BatchOptions::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(Error::Internal { .. })));
    }
}
