use thiserror::Error;

/// An options type that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("options type '{type_name}' has an invalid section key '{key}'")]
    InvalidKey { type_name: &'static str, key: String },
}
