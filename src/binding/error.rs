use std::fmt;

use thiserror::Error;

/// Failure to populate a target from a section that was found.
///
/// A section that does not exist is not an error; see
/// [`Configuration::try_bind`](crate::Configuration::try_bind).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    #[error("cannot bind section '{section}': target is not representable: {source}")]
    Snapshot {
        section: String,
        source: toml::ser::Error,
    },

    #[error("cannot bind section '{section}': {source}")]
    Convert {
        section: String,
        source: ConvertError,
    },
}

/// A value in a section that the target could not take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    path: Vec<String>,
    message: String,
}

impl ConvertError {
    /// Keys leading from the section to the offending value, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn at(mut self, key: &str) -> Self {
        self.path.insert(0, key.to_string());
        self
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path.join(":"), self.message)
        }
    }
}

impl std::error::Error for ConvertError {}

impl serde::de::Error for ConvertError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            path: Vec::new(),
            message: msg.to_string(),
        }
    }
}
