use crate::binding::BindError;
use crate::config::ConfigError;
use crate::options::RegistrationError;
use thiserror::Error;

/// Top-level error type for the dragon-options library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("binding error: {0}")]
    Bind(#[from] BindError),

    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("application context requires a configuration")]
    MissingConfig,

    #[error("options type '{0}' is not registered")]
    NotRegistered(&'static str),
}
