//! File-based configuration source.

use std::path::{Path, PathBuf};

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// A configuration source that loads a TOML file.
///
/// Required files that don't exist cause an error; optional files that don't
/// exist contribute nothing, which lets a reload pick them up once created.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl ConfigSource for FileSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        match load_config_file(&self.path, self.required)? {
            Some(table) => Ok(vec![ConfigEntry::root(table)]),
            None => Ok(vec![]),
        }
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_source_loads_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[Sample]\nStringVal = \"Orange\"").unwrap();

        let source = FileSource::new(file.path(), true);
        let entries = source.entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        assert_eq!(
            entries[0].value["Sample"]["StringVal"].as_str(),
            Some("Orange")
        );
    }

    #[test]
    fn test_file_source_required_missing() {
        let source = FileSource::new("/nonexistent/path/config.toml", true);

        assert!(matches!(source.entries(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let source = FileSource::new("/nonexistent/path/config.toml", false);

        assert!(source.entries().unwrap().is_empty());
    }

    #[test]
    fn test_file_source_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();

        let source = FileSource::new(file.path(), false);
        assert!(matches!(
            source.entries(),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_file_source_name() {
        let source = FileSource::new("conf/app.toml", true);
        assert_eq!(source.name(), "file:conf/app.toml");
    }
}
