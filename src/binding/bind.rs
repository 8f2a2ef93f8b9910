//! Section probing and field population.
//!
//! Population deserializes the section laid over the target's serialized
//! form, so fields the section does not mention keep their values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use toml::Value;
use tracing::{debug, trace};

use super::de::Layered;
use super::keys::CandidateKeys;
use super::BindError;
use crate::config::{Configuration, Section};

impl Configuration {
    /// Binds `target` to the first candidate section that exists.
    ///
    /// Candidates are probed in order and probing stops at the first section
    /// that exists, even if binding it then fails. Returns `Ok(None)` when no
    /// candidate exists, which includes an absent or empty key list; `target`
    /// is left untouched in that case.
    ///
    /// ```
    /// use dragon_options::{Config, MemorySource};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Default, Serialize, Deserialize)]
    /// struct Limits {
    ///     max_connections: u32,
    /// }
    ///
    /// let config = Config::builder()
    ///     .with_memory(MemorySource::new().with("Limits:MaxConnections", "64"))
    ///     .build()?;
    ///
    /// let mut limits = Limits::default();
    /// let section = config.try_bind(&mut limits, ["LimitsOptions", "Limits"])?;
    ///
    /// assert_eq!(section.map(|s| s.path().to_string()), Some("Limits".into()));
    /// assert_eq!(limits.max_connections, 64);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_bind<T>(
        &self,
        target: &mut T,
        keys: impl Into<CandidateKeys>,
    ) -> Result<Option<Section>, BindError>
    where
        T: Serialize + DeserializeOwned,
    {
        let keys = keys.into();
        if keys.is_absent() {
            trace!("no candidate keys supplied");
            return Ok(None);
        }

        for key in keys.iter() {
            let section = self.get_section(key);
            if !section.exists() {
                trace!(key, "section not found");
                continue;
            }
            populate(&section, target)?;
            debug!(section = section.path(), "bound options section");
            return Ok(Some(section));
        }

        debug!(candidates = keys.len(), "no candidate section exists");
        Ok(None)
    }

    /// Populates `target` from the section at `key`, if it exists.
    ///
    /// Returns whether the section existed.
    pub fn bind<T>(&self, key: &str, target: &mut T) -> Result<bool, BindError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.try_bind(target, key).map(|section| section.is_some())
    }
}

fn populate<T>(section: &Section, target: &mut T) -> Result<(), BindError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(incoming) = section.value() else {
        return Ok(());
    };

    let current = Value::try_from(&*target).map_err(|source| BindError::Snapshot {
        section: section.path().to_string(),
        source,
    })?;

    *target = T::deserialize(Layered::new(Some(&current), Some(incoming))).map_err(|source| {
        BindError::Convert {
            section: section.path().to_string(),
            source,
        }
    })?;
    Ok(())
}
