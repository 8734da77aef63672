//! Device message listeners.
//!
//! Listeners are kept in registration order in a copy-on-write list, so
//! dispatch iterates a snapshot and never blocks registration.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::DeviceMessage;

/// Error a listener may return. Logged and otherwise ignored.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives device messages from a bridge.
pub trait DeviceMessageListener: Send + Sync {
    /// Called for every device message, on the bridge's dispatch task.
    fn on_device_message(&self, bridge: &str, message: &DeviceMessage) -> Result<(), ListenerError>;
}

impl<F> DeviceMessageListener for F
where
    F: Fn(&str, &DeviceMessage) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_device_message(
        &self,
        bridge: &str,
        message: &DeviceMessage,
    ) -> Result<(), ListenerError> {
        self(bridge, message)
    }
}

/// Ordered, duplicate free set of listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Arc<Vec<Arc<dyn DeviceMessageListener>>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Returns false if it is already registered.
    pub fn register(&self, listener: Arc<dyn DeviceMessageListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        let mut next = Vec::with_capacity(listeners.len() + 1);
        next.extend(listeners.iter().cloned());
        next.push(listener);
        *listeners = Arc::new(next);
        true
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unregister(&self, listener: &Arc<dyn DeviceMessageListener>) -> bool {
        let mut listeners = self.listeners.write();
        let Some(index) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };
        let mut next = listeners.as_ref().clone();
        next.remove(index);
        *listeners = Arc::new(next);
        true
    }

    /// Removes all listeners.
    pub fn clear(&self) {
        *self.listeners.write() = Arc::new(Vec::new());
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Delivers a message to every listener in registration order.
    ///
    /// A listener that fails or panics is logged and skipped. Returns the
    /// number of listeners that failed.
    pub fn dispatch(&self, bridge: &str, message: &DeviceMessage) -> usize {
        let snapshot = self.listeners.read().clone();
        let mut errors = 0;

        for listener in snapshot.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_device_message(bridge, message)
            }));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    errors += 1;
                    tracing::error!("listener failed on {:?} message: {}", message.packet_type, e);
                }
                Err(_) => {
                    errors += 1;
                    tracing::error!("listener panicked on {:?} message", message.packet_type);
                }
            }
        }

        errors
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::protocol::PacketType;

    fn message() -> DeviceMessage {
        DeviceMessage::new(PacketType::Lighting2, 0x00, vec![0x01, 0x23, 0x45, 0x67])
    }

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> Arc<dyn DeviceMessageListener> {
        let log = Arc::clone(log);
        Arc::new(move |_: &str, _: &DeviceMessage| -> Result<(), ListenerError> {
            log.lock().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_register_is_duplicate_free() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");

        assert!(registry.register(Arc::clone(&a)));
        assert!(!registry.register(Arc::clone(&a)));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(&a));
        assert!(!registry.unregister(&a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(recorder(&log, "a"));
        registry.register(recorder(&log, "b"));
        registry.register(recorder(&log, "c"));

        assert_eq!(registry.dispatch("rfxcom:1", &message()), 0);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register(Arc::new(|_: &str, _: &DeviceMessage| -> Result<(), ListenerError> {
            Err("unsupported subtype".into())
        }));
        registry.register(Arc::new(|_: &str, _: &DeviceMessage| -> Result<(), ListenerError> {
            panic!("listener bug")
        }));
        registry.register(recorder(&log, "last"));

        assert_eq!(registry.dispatch("rfxcom:1", &message()), 2);
        assert_eq!(*log.lock(), vec!["last"]);
    }

    #[test]
    fn test_dispatch_uses_snapshot() {
        struct SelfRemoving {
            registry: Arc<ListenerRegistry>,
            me: Mutex<Option<Arc<dyn DeviceMessageListener>>>,
            calls: AtomicUsize,
        }

        impl DeviceMessageListener for SelfRemoving {
            fn on_device_message(&self, _: &str, _: &DeviceMessage) -> Result<(), ListenerError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = self.me.lock().take() {
                    self.registry.unregister(&me);
                }
                Ok(())
            }
        }

        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = Arc::new(SelfRemoving {
            registry: Arc::clone(&registry),
            me: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let as_dyn: Arc<dyn DeviceMessageListener> = listener.clone();
        *listener.me.lock() = Some(Arc::clone(&as_dyn));

        registry.register(as_dyn);
        registry.register(recorder(&log, "after"));

        registry.dispatch("rfxcom:1", &message());
        assert_eq!(*log.lock(), vec!["after"]);
        assert_eq!(registry.len(), 1);

        registry.dispatch("rfxcom:1", &message());
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock(), vec!["after", "after"]);
    }

    #[test]
    fn test_clear() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(recorder(&log, "a"));
        registry.clear();

        assert_eq!(registry.dispatch("rfxcom:1", &message()), 0);
        assert!(log.lock().is_empty());
    }
}
