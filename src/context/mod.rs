//! Application context: the registry of bound options types.

mod catalog;

pub use catalog::{Catalog, RegistrationReport};

use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::binding::{CandidateKeys, DEFAULT_SUFFIX};
use crate::config::LiveConfiguration;
use crate::options::{Binder, OptionsMonitor, OptionsType, RegistrationError};
use crate::Error;

/// Central application context holding the configuration and the options
/// types bound from it.
///
/// Each registered type gets a configure step (its [`Binder`]), a change
/// source (the context's [`LiveConfiguration`]) and three ways to read it:
///
/// - [`monitor`](Self::monitor): a change-tracked [`OptionsMonitor`];
/// - [`get`](Self::get): a singleton, bound once at first resolution;
/// - [`snapshot`](Self::snapshot): a fresh value bound on every call.
///
/// ## Example
///
/// ```
/// use dragon_options::{options_type, AppContext, Config, MemorySource};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct SampleOptions {
///     string_val: String,
///     int_val: i32,
/// }
/// options_type!(SampleOptions);
///
/// let ctx = AppContext::builder()
///     .with_configuration(
///         Config::builder()
///             .with_memory(
///                 MemorySource::new()
///                     .with("Sample:StringVal", "Orange")
///                     .with("Sample:IntVal", "999"),
///             )
///             .build_live()?,
///     )
///     .build()?;
///
/// ctx.register::<SampleOptions>()?;
///
/// let options = ctx.get::<SampleOptions>()?;
/// assert_eq!(options.string_val, "Orange");
/// assert_eq!(options.int_val, 999);
/// # Ok::<(), dragon_options::Error>(())
/// ```
pub struct AppContext {
    configuration: LiveConfiguration,
    suffix: String,
    registry: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl AppContext {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder {
            configuration: None,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn configuration(&self) -> &LiveConfiguration {
        &self.configuration
    }

    /// The suffix used to generate conventional keys.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Registers `T` under its declared or conventional keys.
    ///
    /// Returns `Ok(false)` without changing anything if `T` is already
    /// registered.
    pub fn register<T: OptionsType>(&self) -> Result<bool, RegistrationError> {
        self.register_keys::<T>(None)
    }

    /// Registers `T` under `keys`, which take precedence over any declared
    /// in [`OptionsType::BIND_KEYS`]. An empty list falls back to those.
    pub fn register_with_keys<T, I, S>(&self, keys: I) -> Result<bool, RegistrationError>
    where
        T: OptionsType,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.register_keys::<T>(Some(&keys))
    }

    fn register_keys<T: OptionsType>(&self, explicit: Option<&[String]>) -> Result<bool, RegistrationError> {
        let mut registry = self.registry.write();
        match registry.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                debug!(options = T::type_name(), "options already registered");
                Ok(false)
            }
            Entry::Vacant(slot) => {
                let binder = Binder::<T>::resolve(explicit, &self.suffix);
                binder.validate()?;
                info!(options = T::type_name(), keys = ?binder.keys(), "registered options");
                slot.insert(Arc::new(Registration::new(binder, self.configuration.clone())));
                Ok(true)
            }
        }
    }

    /// Registers every type in `catalog`, each independently of the others.
    pub fn register_catalog(&self, catalog: &Catalog) -> RegistrationReport {
        self.register_all([catalog])
    }

    /// Registers the types of several catalogs; see [`register_catalog`](Self::register_catalog).
    pub fn register_all<'a, I>(&self, catalogs: I) -> RegistrationReport
    where
        I: IntoIterator<Item = &'a Catalog>,
    {
        let mut report = RegistrationReport::default();
        for entry in catalogs.into_iter().flat_map(Catalog::entries) {
            match entry.register(self) {
                Ok(true) => report.registered.push(entry.type_name()),
                Ok(false) => report.skipped.push(entry.type_name()),
                Err(e) => {
                    warn!(options = entry.type_name(), error = %e, "skipping options type");
                    report.failed.push((entry.type_name(), e));
                }
            }
        }
        report
    }

    pub fn is_registered<T: OptionsType>(&self) -> bool {
        self.registry.read().contains_key(&TypeId::of::<T>())
    }

    /// The keys `T` was registered with.
    pub fn keys_for<T: OptionsType>(&self) -> Option<CandidateKeys> {
        self.registration::<T>().ok().map(|r| r.keys.clone())
    }

    /// Returns the change-tracked value of `T`, creating it on first use.
    pub fn monitor<T: OptionsType>(&self) -> Result<OptionsMonitor<T>, Error> {
        self.registration::<T>()?.monitor()
    }

    /// Returns the singleton value of `T`.
    ///
    /// The value is taken from the monitor on first resolution and does not
    /// follow later configuration changes; use [`monitor`](Self::monitor)
    /// for that.
    pub fn get<T: OptionsType>(&self) -> Result<Arc<T>, Error> {
        let registration = self.registration::<T>()?;
        registration
            .value
            .get_or_try_init(|| -> Result<Arc<T>, Error> { Ok(registration.monitor()?.current()) })
            .cloned()
    }

    /// Binds a fresh `T` against the current configuration.
    pub fn snapshot<T: OptionsType>(&self) -> Result<T, Error> {
        let registration = self.registration::<T>()?;
        let binder = Binder::<T>::new(&registration.keys);
        Ok(binder.build(&self.configuration.snapshot())?)
    }

    /// Reloads the configuration; monitors rebind as a result.
    pub fn reload(&self) -> Result<(), Error> {
        Ok(self.configuration.reload()?)
    }

    fn registration<T: OptionsType>(&self) -> Result<Arc<Registration<T>>, Error> {
        let entry = self
            .registry
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(Error::NotRegistered(T::type_name()))?;
        entry
            .downcast::<Registration<T>>()
            .map_err(|_| Error::NotRegistered(T::type_name()))
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("configuration", &self.configuration)
            .field("suffix", &self.suffix)
            .field("registered", &self.registry.read().len())
            .finish()
    }
}

/// Everything registered for one options type.
struct Registration<T> {
    keys: CandidateKeys,
    source: LiveConfiguration,
    monitor: OnceCell<OptionsMonitor<T>>,
    value: OnceCell<Arc<T>>,
}

impl<T: OptionsType> Registration<T> {
    fn new(binder: Binder<T>, source: LiveConfiguration) -> Self {
        Self {
            keys: binder.keys().clone(),
            source,
            monitor: OnceCell::new(),
            value: OnceCell::new(),
        }
    }

    fn monitor(&self) -> Result<OptionsMonitor<T>, Error> {
        self.monitor
            .get_or_try_init(|| OptionsMonitor::attach(Binder::new(&self.keys), &self.source))
            .cloned()
            .map_err(Error::from)
    }
}

/// Builder for constructing an [`AppContext`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder {
    configuration: Option<LiveConfiguration>,
    suffix: String,
}

impl AppContextBuilder {
    /// Attaches the configuration options are bound against.
    ///
    /// A fixed [`Configuration`](crate::Configuration) is accepted too; it
    /// then only changes through [`LiveConfiguration::replace`].
    pub fn with_configuration(mut self, configuration: impl Into<LiveConfiguration>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Sets the suffix conventional keys are generated with (default `"Options"`).
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Builds the `AppContext`.
    ///
    /// Returns an error if no configuration was provided.
    pub fn build(self) -> Result<AppContext, Error> {
        Ok(AppContext {
            configuration: self.configuration.ok_or(Error::MissingConfig)?,
            suffix: self.suffix,
            registry: RwLock::new(HashMap::new()),
        })
    }
}
