//! In-memory configuration source.

use toml::Value;

use super::section::KEY_DELIMITER;
use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// A source of `("Section:Key", "value")` pairs held in memory.
///
/// Values are kept as strings; binding converts them to whatever the
/// options type declares.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pairs: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemorySource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MemorySource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        self.pairs
            .iter()
            .map(|(key, value)| {
                let path: Vec<String> = key.split(KEY_DELIMITER).map(str::to_string).collect();
                if path.iter().any(String::is_empty) {
                    return Err(ConfigError::InvalidKey(key.clone()));
                }
                Ok(ConfigEntry::at_path(path, Value::String(value.clone())))
            })
            .collect()
    }

    fn name(&self) -> String {
        format!("memory({} keys)", self.pairs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_splits_keys_and_keeps_text() {
        let source = MemorySource::new()
            .with("Sample:StringVal", "Orange")
            .with("Sample:IntVal", "999")
            .with("Sample:BoolVal", "true")
            .with("Sample:Zip", "01234");

        let entries = source.entries().unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].path, vec!["Sample", "StringVal"]);
        assert_eq!(entries[0].value, Value::String("Orange".into()));
        assert_eq!(entries[1].value, Value::String("999".into()));
        assert_eq!(entries[2].value, Value::String("true".into()));
        assert_eq!(entries[3].value, Value::String("01234".into()));
    }

    #[test]
    fn test_memory_source_from_iterator() {
        let source: MemorySource = [("a", "1"), ("b:c", "x")].into_iter().collect();

        assert_eq!(source.len(), 2);
        assert_eq!(source.name(), "memory(2 keys)");
    }

    #[test]
    fn test_memory_source_rejects_empty_segments() {
        let source = MemorySource::new().with("Sample::IntVal", "1");

        assert!(matches!(
            source.entries(),
            Err(ConfigError::InvalidKey(key)) if key == "Sample::IntVal"
        ));
    }
}
