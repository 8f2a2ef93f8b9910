//! Convention-based binding of strongly typed options to configuration.
//!
//! An options type is located in the configuration tree by its name: for
//! `SampleOptions` the sections `SampleOptions` and `Sample` are tried in
//! that order, for `Sample` the sections `Sample` and `SampleOptions`. Types
//! can declare their own section keys instead, and callers can override
//! both at registration time. The first section that exists wins.
//!
//! Registered types live in an [`AppContext`] and can be read as a
//! singleton, as a fresh snapshot, or through an [`OptionsMonitor`] that
//! rebinds whenever the [`LiveConfiguration`] reloads.

pub mod binding;
mod change;
pub mod config;
pub mod context;
mod error;
pub mod options;

pub use binding::{generate_keys, BindError, CandidateKeys, ConvertError, DEFAULT_SUFFIX};
pub use change::Subscription;
pub use config::{Config, ConfigError, Configuration, LiveConfiguration, MemorySource, Section};
pub use context::{AppContext, Catalog, RegistrationReport};
pub use error::Error;
pub use options::{Binder, OptionsMonitor, OptionsType, RegistrationError};
