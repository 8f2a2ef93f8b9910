//! Options types and the machinery that keeps them bound.

mod binder;
mod error;
mod monitor;

pub use binder::Binder;
pub use error::RegistrationError;
pub use monitor::OptionsMonitor;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A settings record that can be bound from configuration.
///
/// Implementing the trait is the binding declaration: leave
/// [`BIND_KEYS`](Self::BIND_KEYS) as `None` to locate the section by naming
/// convention, or list the section keys to try instead. An empty list also
/// means convention.
///
/// ```
/// use dragon_options::OptionsType;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct CacheOptions {
///     capacity: usize,
/// }
///
/// impl OptionsType for CacheOptions {
///     const BIND_KEYS: Option<&'static [&'static str]> = Some(&["Cache", "Storage:Cache"]);
/// }
///
/// assert_eq!(CacheOptions::type_name(), "CacheOptions");
/// ```
pub trait OptionsType: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Section keys to probe instead of the conventional ones.
    const BIND_KEYS: Option<&'static [&'static str]> = None;

    /// Name the conventional keys are derived from.
    ///
    /// Defaults to the unqualified Rust type name, without generic arguments.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strips the module path and generic arguments from a type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Implements [`OptionsType`] for a type, optionally declaring its section keys.
///
/// ```
/// use dragon_options::{options_type, OptionsType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct MailOptions {
///     relay: String,
/// }
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Branding {
///     title: String,
/// }
///
/// options_type!(MailOptions);
/// options_type!(Branding => "Ui:Branding", "Branding");
///
/// assert_eq!(MailOptions::BIND_KEYS, None);
/// assert_eq!(Branding::BIND_KEYS, Some(&["Ui:Branding", "Branding"][..]));
/// ```
#[macro_export]
macro_rules! options_type {
    ($ty:ty => $($key:expr),+ $(,)?) => {
        impl $crate::OptionsType for $ty {
            const BIND_KEYS: ::core::option::Option<&'static [&'static str]> =
                ::core::option::Option::Some(&[$($key),+]);
        }
    };
    ($ty:ty) => {
        impl $crate::OptionsType for $ty {}
    };
}
