use std::any::TypeId;
use std::fmt;

use super::AppContext;
use crate::options::{OptionsType, RegistrationError};

/// An explicit list of options types to register together.
///
/// Stands in for scanning a module: each entry captures the concrete type,
/// so [`AppContext::register_catalog`] can register it without knowing it.
///
/// ```
/// use dragon_options::{options_type, AppContext, Catalog, Configuration};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct CacheOptions { capacity: usize }
/// #[derive(Default, Serialize, Deserialize)]
/// struct Branding { title: String }
///
/// options_type!(CacheOptions);
/// options_type!(Branding);
///
/// let catalog = Catalog::new().with::<CacheOptions>().with::<Branding>();
/// let ctx = AppContext::builder().with_configuration(Configuration::empty()).build()?;
///
/// let report = ctx.register_catalog(&catalog.retain_suffixed("Options"));
/// assert_eq!(report.registered, ["CacheOptions"]);
/// # Ok::<(), dragon_options::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Clone, Copy)]
pub(crate) struct CatalogEntry {
    type_id: TypeId,
    type_name: &'static str,
    register: fn(&AppContext) -> Result<bool, RegistrationError>,
}

impl CatalogEntry {
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn register(&self, ctx: &AppContext) -> Result<bool, RegistrationError> {
        (self.register)(ctx)
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<T: OptionsType>(mut self) -> Self {
        self.add::<T>();
        self
    }

    /// Adds `T` unless it is already listed.
    pub fn add<T: OptionsType>(&mut self) {
        let type_id = TypeId::of::<T>();
        if self.entries.iter().any(|e| e.type_id == type_id) {
            return;
        }
        self.entries.push(CatalogEntry {
            type_id,
            type_name: T::type_name(),
            register: AppContext::register::<T>,
        });
    }

    /// Appends the types of `other` not listed yet.
    pub fn extend(&mut self, other: &Catalog) {
        for entry in &other.entries {
            if !self.entries.iter().any(|e| e.type_id == entry.type_id) {
                self.entries.push(*entry);
            }
        }
    }

    /// Keeps only the types whose name ends with `suffix`.
    #[must_use]
    pub fn retain_suffixed(mut self, suffix: &str) -> Self {
        self.entries.retain(|e| e.type_name.ends_with(suffix));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.type_name)
    }

    pub(crate) fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

/// Outcome of registering a catalog, per type.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub registered: Vec<&'static str>,
    /// Types that were already registered.
    pub skipped: Vec<&'static str>,
    pub failed: Vec<(&'static str, RegistrationError)>,
}

impl RegistrationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MemorySource};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct AlphaOptions {
        name: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct BrokenOptions {
        name: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Gamma {
        name: Option<String>,
    }

    crate::options_type!(AlphaOptions);
    crate::options_type!(BrokenOptions => "Broken::Key");
    crate::options_type!(Gamma => "G");

    fn context() -> AppContext {
        AppContext::builder()
            .with_configuration(
                Config::builder()
                    .with_memory(
                        MemorySource::new()
                            .with("Alpha:Name", "alpha")
                            .with("G:Name", "gamma"),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_failures_are_isolated_per_type() {
        let ctx = context();
        let catalog = Catalog::new()
            .with::<AlphaOptions>()
            .with::<BrokenOptions>()
            .with::<Gamma>();

        let report = ctx.register_catalog(&catalog);

        assert_eq!(report.registered, vec!["AlphaOptions", "Gamma"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "BrokenOptions");
        assert!(!report.is_success());

        assert_eq!(ctx.get::<AlphaOptions>().unwrap().name.as_deref(), Some("alpha"));
        assert_eq!(ctx.get::<Gamma>().unwrap().name.as_deref(), Some("gamma"));
        assert!(!ctx.is_registered::<BrokenOptions>());
    }

    #[test]
    fn test_already_registered_types_are_skipped() {
        let ctx = context();
        ctx.register_with_keys::<Gamma, _, _>(["Alpha"]).unwrap();

        let first = Catalog::new().with::<AlphaOptions>();
        let second = Catalog::new().with::<Gamma>().with::<AlphaOptions>();
        let report = ctx.register_all([&first, &second]);

        assert_eq!(report.registered, vec!["AlphaOptions"]);
        assert_eq!(report.skipped, vec!["Gamma", "AlphaOptions"]);
        assert!(report.is_success());
        assert_eq!(ctx.get::<Gamma>().unwrap().name.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_catalog_deduplicates_and_filters() {
        let mut catalog = Catalog::new().with::<AlphaOptions>().with::<AlphaOptions>();
        catalog.extend(&Catalog::new().with::<Gamma>().with::<AlphaOptions>());

        assert_eq!(catalog.type_names().collect::<Vec<_>>(), vec!["AlphaOptions", "Gamma"]);

        let suffixed = catalog.clone().retain_suffixed("Options");
        assert_eq!(suffixed.len(), 1);
        assert!(Catalog::new().is_empty());
    }
}
