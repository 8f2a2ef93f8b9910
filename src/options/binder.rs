use std::fmt;
use std::marker::PhantomData;

use super::{OptionsType, RegistrationError};
use crate::binding::{BindError, CandidateKeys};
use crate::config::{Configuration, Section, KEY_DELIMITER};

/// The configure step for an options type: binds it against whichever
/// configuration it is handed, using a fixed list of candidate keys.
pub struct Binder<T> {
    keys: CandidateKeys,
    _marker: PhantomData<fn() -> T>,
}

impl<T: OptionsType> Binder<T> {
    pub fn new(keys: impl Into<CandidateKeys>) -> Self {
        Self {
            keys: keys.into(),
            _marker: PhantomData,
        }
    }

    /// Resolves the effective keys for `T`.
    ///
    /// Keys passed by the caller win over keys declared in
    /// [`OptionsType::BIND_KEYS`], which win over keys generated from
    /// [`OptionsType::type_name`] with `suffix`. An empty list at either of
    /// the first two levels counts as not given.
    pub fn resolve(explicit: Option<&[String]>, suffix: &str) -> Self {
        let keys = match (explicit, T::BIND_KEYS) {
            (Some(keys), _) if !keys.is_empty() => CandidateKeys::new(keys.iter().cloned()),
            (_, Some(declared)) if !declared.is_empty() => CandidateKeys::new(declared.iter().copied()),
            _ => CandidateKeys::generated(T::type_name(), suffix),
        };
        Self::new(keys)
    }

    pub fn keys(&self) -> &CandidateKeys {
        &self.keys
    }

    /// Rejects empty keys and keys with an empty `:` segment.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        match self.keys.iter().find(|key| !is_valid_key(key)) {
            Some(key) => Err(RegistrationError::InvalidKey {
                type_name: T::type_name(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Binds `target` against `configuration`; see [`Configuration::try_bind`].
    pub fn configure(
        &self,
        configuration: &Configuration,
        target: &mut T,
    ) -> Result<Option<Section>, BindError> {
        configuration.try_bind(target, &self.keys)
    }

    /// Binds a fresh `T::default()`.
    pub fn build(&self, configuration: &Configuration) -> Result<T, BindError> {
        let mut options = T::default();
        self.configure(configuration, &mut options)?;
        Ok(options)
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty() && key.split(KEY_DELIMITER).all(|segment| !segment.trim().is_empty())
}

impl<T> fmt::Debug for Binder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder").field("keys", &self.keys).finish()
    }
}
