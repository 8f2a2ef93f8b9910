use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{Binder, OptionsType};
use crate::binding::BindError;
use crate::change::{Listeners, Subscription};
use crate::config::{LiveConfiguration, Published};

/// A change-tracked options value.
///
/// Holds the value bound from the latest configuration snapshot. Whenever
/// the [`LiveConfiguration`] it follows publishes a new tree, a fresh
/// `T::default()` is bound against it and becomes [`current`](Self::current).
/// If that rebind fails the previous value is kept, and a snapshot older
/// than the one last applied is ignored.
///
/// Cloning is cheap; clones share the value and the listeners.
pub struct OptionsMonitor<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    binder: Binder<T>,
    current: ArcSwap<T>,
    /// Version of the configuration `current` was bound from, or last tried.
    applied: Mutex<u64>,
    listeners: Listeners<T>,
    _source: Mutex<Option<Subscription>>,
}

impl<T: OptionsType> OptionsMonitor<T> {
    /// Binds the initial value from `configuration` and follows its changes.
    pub fn attach(binder: Binder<T>, configuration: &LiveConfiguration) -> Result<Self, BindError> {
        let published = configuration.published();
        let initial = binder.build(&published.configuration)?;
        let inner = Arc::new(Inner {
            binder,
            current: ArcSwap::from_pointee(initial),
            applied: Mutex::new(published.version),
            listeners: Listeners::new(),
            _source: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = configuration.on_publish(move |published| {
            if let Some(inner) = weak.upgrade() {
                inner.refresh(published);
            }
        });
        *inner._source.lock() = Some(subscription);

        // Catch a publish that landed before the subscription did.
        inner.refresh(&configuration.published());

        Ok(Self { inner })
    }

    /// The value bound from the most recent configuration.
    pub fn current(&self) -> Arc<T> {
        self.inner.current.load_full()
    }

    /// Registers `callback` to run with each newly bound value.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .subscribe(Arc::downgrade(&self.inner), |inner| &inner.listeners, callback)
    }

    pub fn binder(&self) -> &Binder<T> {
        &self.inner.binder
    }
}

impl<T: OptionsType> Inner<T> {
    fn refresh(&self, published: &Published) {
        let rebound = {
            let mut applied = self.applied.lock();
            if published.version <= *applied {
                trace!(
                    options = T::type_name(),
                    version = published.version,
                    applied = *applied,
                    "skipping stale configuration"
                );
                return;
            }
            *applied = published.version;

            match self.binder.build(&published.configuration) {
                Ok(options) => {
                    let options = Arc::new(options);
                    self.current.store(Arc::clone(&options));
                    options
                }
                Err(e) => {
                    warn!(
                        options = T::type_name(),
                        version = published.version,
                        error = %e,
                        "failed to rebind options, keeping previous value"
                    );
                    return;
                }
            }
        };

        debug!(options = T::type_name(), version = published.version, "options rebound");
        self.listeners.notify(&rebound);
    }
}

impl<T> Clone for OptionsMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for OptionsMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsMonitor")
            .field("binder", &self.inner.binder)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DEFAULT_SUFFIX;
    use crate::config::{Config, Configuration, MemorySource};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct PoolOptions {
        size: u32,
        name: Option<String>,
    }

    crate::options_type!(PoolOptions);

    fn memory(pairs: &[(&str, &str)]) -> Configuration {
        Config::builder()
            .with_memory(pairs.iter().copied().collect())
            .build()
            .unwrap()
    }

    fn monitor(live: &LiveConfiguration) -> OptionsMonitor<PoolOptions> {
        OptionsMonitor::attach(Binder::resolve(None, DEFAULT_SUFFIX), live).unwrap()
    }

    #[test]
    fn test_initial_value_is_bound() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4")]));

        assert_eq!(monitor(&live).current().size, 4);
    }

    #[test]
    fn test_rebinds_on_change_and_notifies() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4")]));
        let monitor = monitor(&live);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _subscription = monitor.on_change(move |options: &PoolOptions| {
            sink.lock().push(options.size);
        });

        live.replace(memory(&[("PoolOptions:Size", "8"), ("Pool:Size", "16")]));

        assert_eq!(monitor.current().size, 8);
        assert_eq!(*seen.lock(), vec![8]);
    }

    #[test]
    fn test_rebind_starts_from_default() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4"), ("Pool:Name", "a")]));
        let monitor = monitor(&live);

        live.replace(memory(&[("Pool:Size", "5")]));

        assert_eq!(
            *monitor.current(),
            PoolOptions {
                size: 5,
                name: None
            }
        );

        live.replace(Configuration::empty());
        assert_eq!(*monitor.current(), PoolOptions::default());
    }

    #[test]
    fn test_failed_rebind_keeps_previous_value() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4")]));
        let monitor = monitor(&live);

        live.replace(memory(&[("Pool:Size", "many")]));

        assert_eq!(monitor.current().size, 4);
    }

    #[test]
    fn test_initial_bind_failure_is_reported() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "many")]));
        let result = OptionsMonitor::<PoolOptions>::attach(Binder::resolve(None, DEFAULT_SUFFIX), &live);

        assert!(matches!(result, Err(BindError::Convert { .. })));
    }

    #[test]
    fn test_dropped_monitor_stops_following() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4")]));
        let monitor = monitor(&live);
        drop(monitor);

        live.replace(memory(&[("Pool:Size", "5")]));
        assert_eq!(live.version(), 1);
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "4")]));
        let monitor = monitor(&live);
        let stale = live.published();

        live.replace(memory(&[("Pool:Size", "8")]));
        monitor.inner.refresh(&stale);
        monitor.inner.refresh(&Published {
            version: 1,
            configuration: Arc::new(memory(&[("Pool:Size", "2")])),
        });

        assert_eq!(monitor.current().size, 8);
    }

    #[test]
    fn test_concurrent_replaces_settle_on_latest() {
        let live = LiveConfiguration::new(memory(&[("Pool:Size", "0")]));
        let monitor = monitor(&live);

        std::thread::scope(|scope| {
            for size in 1..=8 {
                let live = &live;
                scope.spawn(move || {
                    let size = size.to_string();
                    live.replace(memory(&[("Pool:Size", size.as_str())]));
                });
            }
        });

        let latest = live.snapshot().get("Pool:Size").and_then(|v| v.as_str().map(str::to_string));
        assert_eq!(live.version(), 8);
        assert_eq!(Some(monitor.current().size.to_string()), latest);
    }
}
