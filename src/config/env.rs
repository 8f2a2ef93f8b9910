use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Reads `PREFIX<sep>Section<sep>Key` environment variables as `Section:Key`.
///
/// Segment case is kept as written; lookups are case-insensitive anyway.
/// Values stay strings until an options type asks for something else.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in std::env::vars() {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(str::to_string)
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }
            entries.push(ConfigEntry::at_path(path, Value::String(value)));
        }

        Ok(entries)
    }

    fn name(&self) -> String {
        format!("env:{}{}*", self.prefix, self.separator)
    }
}
