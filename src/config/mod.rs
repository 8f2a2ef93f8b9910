//! Configuration loading and the tree that options bind against.

mod builder;
mod env;
mod error;
mod file;
mod live;
mod memory;
mod resolve;
mod section;
mod source;

pub use builder::Config;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use live::LiveConfiguration;
pub(crate) use live::Published;
pub use memory::MemorySource;
pub use section::{Configuration, Section, KEY_DELIMITER};
pub use source::{ConfigEntry, ConfigSource};

