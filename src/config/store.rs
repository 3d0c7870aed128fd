//! Live settings handle so every augmentation re-reads the current configuration.

use super::settings::Settings;
use crate::log_debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle returned by [`SettingsSource::subscribe`].
pub type SubscriptionId = u64;

type ChangeCallback = Arc<dyn Fn(&Settings) + Send + Sync + 'static>;

/// Configuration collaborator: a current value plus change notifications.
pub trait SettingsSource {
    /// Current settings. Callers must not cache this across operations.
    fn get(&self) -> Settings;
    /// Register `callback` to run after each change. Callbacks run without any
    /// store lock held, so they may read the source again.
    fn subscribe(&self, callback: Box<dyn Fn(&Settings) + Send + Sync + 'static>) -> SubscriptionId;
    /// Drop a subscription; unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

struct Inner {
    current: Settings,
    subscribers: Vec<(SubscriptionId, ChangeCallback)>,
    next_id: SubscriptionId,
}

/// In-process [`SettingsSource`]. Clones share the same state.
#[derive(Clone)]
pub struct SharedSettings {
    inner: Arc<Mutex<Inner>>,
}

impl SharedSettings {
    #[must_use]
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self, context: &str) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log_debug(&format!("settings lock poisoned in {context}; recovering"));
                poisoned.into_inner()
            }
        }
    }

    /// Replace the settings. Subscribers run only when the value actually changed.
    /// Returns whether it changed.
    pub fn set(&self, next: Settings) -> bool {
        let callbacks: Vec<ChangeCallback> = {
            let mut guard = self.lock("SharedSettings::set");
            if guard.current == next {
                return false;
            }
            guard.current = next;
            guard
                .subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in callbacks {
            callback(&next);
        }
        true
    }

    /// Apply `edit` to a copy of the current settings and store the result.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> bool {
        let mut next = self.get();
        edit(&mut next);
        self.set(next)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock("SharedSettings::subscriber_count")
            .subscribers
            .len()
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsSource for SharedSettings {
    fn get(&self) -> Settings {
        self.lock("SharedSettings::get").current
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Settings) + Send + Sync + 'static>) -> SubscriptionId {
        let mut guard = self.lock("SharedSettings::subscribe");
        guard.next_id += 1;
        let id = guard.next_id;
        guard.subscribers.push((id, Arc::from(callback)));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock("SharedSettings::unsubscribe")
            .subscribers
            .retain(|(existing, _)| *existing != id);
    }
}

impl std::fmt::Debug for SharedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSettings")
            .field("current", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
