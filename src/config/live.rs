//! Reloadable configuration with change notification.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::builder::load_sources;
use super::source::ConfigSource;
use super::{ConfigError, Configuration};
use crate::change::{Listeners, Subscription};

/// A configuration tree that can be reloaded while readers hold snapshots.
///
/// Cloning is cheap and every clone observes the same tree. Each successful
/// [`reload`](Self::reload) or [`replace`](Self::replace) publishes a new
/// snapshot, bumps [`version`](Self::version) and calls every callback
/// registered with [`on_change`](Self::on_change).
#[derive(Clone)]
pub struct LiveConfiguration {
    inner: Arc<Inner>,
}

struct Inner {
    sources: Vec<Box<dyn ConfigSource>>,
    current: ArcSwap<Published>,
    publishing: Mutex<()>,
    listeners: Listeners<Published>,
}

/// A snapshot together with the version it was published as.
#[derive(Debug)]
pub(crate) struct Published {
    pub(crate) version: u64,
    pub(crate) configuration: Arc<Configuration>,
}

impl LiveConfiguration {
    pub(crate) fn from_sources(sources: Vec<Box<dyn ConfigSource>>) -> Result<Self, ConfigError> {
        let initial = load_sources(&sources)?;
        Ok(Self::with_parts(sources, initial))
    }

    /// Wraps a fixed tree. Without sources, [`reload`](Self::reload) re-publishes
    /// the current snapshot.
    pub fn new(configuration: Configuration) -> Self {
        Self::with_parts(Vec::new(), configuration)
    }

    fn with_parts(sources: Vec<Box<dyn ConfigSource>>, initial: Configuration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                current: ArcSwap::from_pointee(Published {
                    version: 0,
                    configuration: Arc::new(initial),
                }),
                publishing: Mutex::new(()),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Returns the current tree. The snapshot never changes once taken.
    pub fn snapshot(&self) -> Arc<Configuration> {
        Arc::clone(&self.inner.current.load().configuration)
    }

    /// Number of snapshots published since creation.
    pub fn version(&self) -> u64 {
        self.inner.current.load().version
    }

    pub(crate) fn published(&self) -> Arc<Published> {
        self.inner.current.load_full()
    }

    /// Re-reads every source and publishes the result.
    ///
    /// On error the current snapshot stays in place and nobody is notified.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let next = if self.inner.sources.is_empty() {
            Configuration::clone(&self.snapshot())
        } else {
            load_sources(&self.inner.sources)?
        };
        info!(sources = self.inner.sources.len(), "configuration reloaded");
        self.publish(next);
        Ok(())
    }

    /// Publishes `configuration` as the new tree.
    pub fn replace(&self, configuration: Configuration) {
        self.publish(configuration);
    }

    /// Registers `callback` to run with every newly published snapshot.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Configuration) + Send + Sync + 'static,
    {
        self.on_publish(move |published| callback(&published.configuration))
    }

    /// Like [`on_change`](Self::on_change), with the version of each snapshot.
    ///
    /// Concurrent publishers may deliver snapshots out of order; the version
    /// tells a late one apart.
    pub(crate) fn on_publish<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Published) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .subscribe(Arc::downgrade(&self.inner), |inner| &inner.listeners, callback)
    }

    fn publish(&self, configuration: Configuration) {
        let published = {
            let _guard = self.inner.publishing.lock();
            let published = Arc::new(Published {
                version: self.inner.current.load().version + 1,
                configuration: Arc::new(configuration),
            });
            self.inner.current.store(Arc::clone(&published));
            published
        };
        debug!(
            version = published.version,
            listeners = self.inner.listeners.len(),
            "publishing configuration"
        );
        self.inner.listeners.notify(&published);
    }
}

impl From<Configuration> for LiveConfiguration {
    fn from(configuration: Configuration) -> Self {
        Self::new(configuration)
    }
}

impl fmt::Debug for LiveConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfiguration")
            .field("sources", &self.inner.sources)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MemorySource};
    use parking_lot::Mutex;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tree(toml_str: &str) -> Configuration {
        Configuration::new(toml::from_str(toml_str).unwrap())
    }

    #[test]
    fn test_replace_publishes_and_notifies() {
        let live = LiveConfiguration::new(tree("a = 1"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _subscription = live.on_change(move |config| {
            sink.lock().push(config.get("a").and_then(|v| v.as_integer()));
        });

        let before = live.snapshot();
        live.replace(tree("a = 2"));

        assert_eq!(live.version(), 1);
        assert_eq!(before.get("a").unwrap().as_integer(), Some(1));
        assert_eq!(live.snapshot().get("a").unwrap().as_integer(), Some(2));
        assert_eq!(*seen.lock(), vec![Some(2)]);
    }

    #[test]
    fn test_dropped_subscription_is_not_called() {
        let live = LiveConfiguration::new(Configuration::empty());
        let seen = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&seen);
        let subscription = live.on_change(move |_| *sink.lock() += 1);
        live.replace(Configuration::empty());
        drop(subscription);
        live.replace(Configuration::empty());

        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_reload_rereads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[Sample]\nIntVal = 1").unwrap();

        let live = Config::builder()
            .with_file(file.path(), true)
            .build_live()
            .unwrap();
        assert_eq!(live.snapshot().get("Sample:IntVal").unwrap().as_integer(), Some(1));

        std::fs::write(file.path(), "[Sample]\nIntVal = 2\n").unwrap();
        live.reload().unwrap();

        assert_eq!(live.snapshot().get("Sample:IntVal").unwrap().as_integer(), Some(2));
        assert_eq!(live.version(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a = 1").unwrap();

        let live = Config::builder()
            .with_file(file.path(), true)
            .build_live()
            .unwrap();
        std::fs::write(file.path(), "a = = broken").unwrap();

        assert!(matches!(live.reload(), Err(ConfigError::ParseError { .. })));
        assert_eq!(live.version(), 0);
        assert_eq!(live.snapshot().get("a").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_reload_without_sources_republishes() {
        let live: LiveConfiguration = Config::builder()
            .with_memory(MemorySource::new().with("a", "1"))
            .build()
            .unwrap()
            .into();
        live.reload().unwrap();

        assert_eq!(live.version(), 1);
        assert_eq!(live.snapshot().get("a").unwrap().as_str(), Some("1"));
    }
}
