use std::path::Path;

use tracing::debug;

use super::env::EnvSource;
use super::file::FileSource;
use super::memory::MemorySource;
use super::resolve::resolve_references;
use super::source::{merge_at_path, ConfigSource};
use super::{ConfigError, Configuration, LiveConfiguration};

/// Builder for a configuration tree assembled from several sources.
///
/// Sources are merged in registration order, later ones overriding earlier
/// ones. Nested tables are merged recursively with keys matched
/// case-insensitively; other values (including arrays) are replaced entirely.
///
/// ## Variable References
///
/// String values can reference other values using `${Section:Key}` syntax:
///
/// ```toml
/// [Server]
/// Host = "localhost"
/// Port = 8080
/// Url = "http://${Server:Host}:${Server:Port}/api"
/// ```
///
/// Use `$$` to escape a literal `$`.
///
/// ## Example
///
/// ```no_run
/// use dragon_options::{Config, MemorySource};
///
/// let live = Config::builder()
///     .with_file("config/default.toml", true)
///     .with_env("MYAPP", "__")
///     .with_memory(MemorySource::new().with("Sample:IntVal", "7"))
///     .build_live()?;
///
/// assert!(live.snapshot().get_section("Sample").exists());
/// # Ok::<(), dragon_options::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Config {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a TOML file.
    ///
    /// If `required` is `true`, loading fails when the file doesn't exist.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds environment variables named `PREFIX<separator>Section<separator>Key`.
    ///
    /// Values are read as strings.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds in-memory `Section:Key` pairs.
    pub fn with_memory(self, source: MemorySource) -> Self {
        self.with_source(source)
    }

    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads, merges and resolves every source into a fixed snapshot.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        load_sources(&self.sources)
    }

    /// Like [`build`](Self::build), but keeps the sources so the tree can be
    /// reloaded later.
    pub fn build_live(self) -> Result<LiveConfiguration, ConfigError> {
        LiveConfiguration::from_sources(self.sources)
    }
}

pub(crate) fn load_sources(sources: &[Box<dyn ConfigSource>]) -> Result<Configuration, ConfigError> {
    let mut merged = toml::Table::new();

    for source in sources {
        let entries = source.entries()?;
        debug!(source = %source.name(), entries = entries.len(), "merging configuration source");
        for entry in entries {
            merge_at_path(&mut merged, &entry.path, entry.value);
        }
    }

    resolve_references(&mut merged)?;

    Ok(Configuration::new(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_later_sources_override_earlier() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sample]\nstringval = \"file\"\nintval = 1").unwrap();

        let config = Config::builder()
            .with_file(file.path(), true)
            .with_memory(MemorySource::new().with("Sample:StringVal", "memory"))
            .build()
            .unwrap();

        assert_eq!(config.get("Sample:StringVal").unwrap().as_str(), Some("memory"));
        assert_eq!(config.get("Sample:IntVal").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_references_resolve_after_merge() {
        let config = Config::builder()
            .with_memory(
                MemorySource::new()
                    .with("Server:Host", "localhost")
                    .with("Server:Url", "http://${server:host}/api"),
            )
            .build()
            .unwrap();

        assert_eq!(
            config.get("Server:Url").unwrap().as_str(),
            Some("http://localhost/api")
        );
    }

    #[test]
    fn test_optional_missing_file_is_skipped() {
        let config = Config::builder()
            .with_file("/nonexistent/dragon-options.toml", false)
            .build()
            .unwrap();

        assert!(config.is_empty());
    }

    #[test]
    fn test_source_error_propagates() {
        let result = Config::builder()
            .with_file("/nonexistent/dragon-options.toml", true)
            .build();

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
