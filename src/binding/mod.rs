//! Convention-based section lookup and binding.
//!
//! [`generate_keys`] derives the section names an options type may live
//! under, and [`Configuration::try_bind`](crate::Configuration::try_bind)
//! probes them in order and populates the target from the first one found.

mod bind;
mod de;
mod error;
mod keys;

pub use error::{BindError, ConvertError};
pub use keys::{generate_keys, CandidateKeys, DEFAULT_SUFFIX};
