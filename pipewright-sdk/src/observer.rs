//! Configuration observers and the registries that notify them.
//!
//! Each entity kind (consumer, saga, handler) has its own registry holding
//! observers in connection order. Registries are the only part of the engine
//! that tolerates concurrent use: connect, disconnect and notify may be
//! called from any thread.
//!
//! A notification pass works on a snapshot of the observers connected when
//! the pass starts. An observer connected during a pass is first notified by
//! the next pass; an observer disconnected during a pass still receives that
//! pass's notification.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use pipewright_types::{EntityDescriptor, EntityKind, MessageType};
use tracing::{debug, trace, warn};

use crate::error::{BoxError, ObserverError};

/// Notified as consumers, sagas and handlers are configured.
///
/// Observers run synchronously on the configuring thread. Returning an
/// error aborts the notification pass and fails the configuration.
///
/// Closures taking an [`EntityDescriptor`] are observers of the entity-level
/// notification only.
pub trait ConfigurationObserver: Send + Sync {
    /// An entity was configured.
    fn entity_configured(&self, entity: &EntityDescriptor) -> Result<(), BoxError>;

    /// An entity was configured to consume `message`.
    ///
    /// Always fires after [`entity_configured`](Self::entity_configured)
    /// for the same entity.
    fn entity_message_configured(
        &self,
        _entity: &EntityDescriptor,
        _message: &MessageType,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<F> ConfigurationObserver for F
where
    F: Fn(&EntityDescriptor) -> Result<(), BoxError> + Send + Sync,
{
    fn entity_configured(&self, entity: &EntityDescriptor) -> Result<(), BoxError> {
        self(entity)
    }
}

type SharedObserver = Arc<dyn ConfigurationObserver>;

/// Thread-safe state behind a registry.
#[derive(Default)]
struct RegistryState {
    observers: RwLock<Vec<(u64, SharedObserver)>>,
    configured: RwLock<BTreeSet<MessageType>>,
    next_id: AtomicU64,
}

impl RegistryState {
    fn remove(&self, id: u64) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(entry, _)| *entry != id);
        observers.len() != before
    }
}

/// The observers of one entity kind.
pub struct ObserverRegistry {
    kind: EntityKind,
    state: Arc<RegistryState>,
}

impl ObserverRegistry {
    /// Create an empty registry for `kind`.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: Arc::new(RegistryState::default()),
        }
    }

    /// The entity kind this registry observes.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Register an observer. It stays connected until its handle is
    /// disconnected.
    pub fn connect<O>(&self, observer: O) -> ConnectHandle
    where
        O: ConfigurationObserver + 'static,
    {
        self.connect_shared(Arc::new(observer))
    }

    /// Register an already shared observer.
    pub fn connect_shared(&self, observer: Arc<dyn ConfigurationObserver>) -> ConnectHandle {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.observers.write().push((id, observer));
        debug!(kind = %self.kind, id, "configuration observer connected");

        ConnectHandle {
            id,
            kind: self.kind,
            registry: Arc::downgrade(&self.state),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Number of connected observers.
    pub fn len(&self) -> usize {
        self.state.observers.read().len()
    }

    /// Returns true if no observers are connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once `entity` has completed an entity-level pass.
    pub fn is_configured(&self, entity: &EntityDescriptor) -> bool {
        self.state.configured.read().contains(&entity.entity_type)
    }

    fn snapshot(&self) -> Vec<SharedObserver> {
        self.state
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    fn check_kind(&self, entity: &EntityDescriptor) -> Result<(), ObserverError> {
        if entity.kind == self.kind {
            Ok(())
        } else {
            Err(ObserverError::KindMismatch {
                expected: self.kind,
                actual: entity.kind,
            })
        }
    }

    /// Notify every connected observer, in connection order, that `entity`
    /// was configured.
    ///
    /// Stops at the first failing observer; observers that already ran keep
    /// their effects.
    pub fn notify_entity_configured(&self, entity: &EntityDescriptor) -> Result<(), ObserverError> {
        self.check_kind(entity)?;

        for observer in self.snapshot() {
            trace!(entity = %entity, "notifying entity configured");
            if let Err(source) = observer.entity_configured(entity) {
                warn!(entity = %entity, error = %source, "configuration observer failed");
                return Err(ObserverError::Failed {
                    entity: entity.clone(),
                    source,
                });
            }
        }

        self.state
            .configured
            .write()
            .insert(entity.entity_type.clone());
        Ok(())
    }

    /// Notify every connected observer that `entity` consumes `message`.
    ///
    /// Fails with [`ObserverError::OutOfOrder`] unless the entity-level
    /// notification for `entity` completed first.
    pub fn notify_entity_message_configured(
        &self,
        entity: &EntityDescriptor,
        message: &MessageType,
    ) -> Result<(), ObserverError> {
        self.check_kind(entity)?;
        if !self.is_configured(entity) {
            return Err(ObserverError::OutOfOrder {
                entity: entity.clone(),
                message: message.clone(),
            });
        }

        for observer in self.snapshot() {
            trace!(entity = %entity, message_type = %message, "notifying entity message configured");
            if let Err(source) = observer.entity_message_configured(entity, message) {
                warn!(
                    entity = %entity,
                    message_type = %message,
                    error = %source,
                    "configuration observer failed"
                );
                return Err(ObserverError::MessageFailed {
                    entity: entity.clone(),
                    message: message.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("kind", &self.kind)
            .field("observers", &self.len())
            .finish()
    }
}

/// Token returned by [`ObserverRegistry::connect`].
///
/// Disconnecting removes exactly the observer it was returned for. Dropping
/// the handle leaves the observer connected; use [`ConnectHandle::guard`]
/// for scope-bound registration.
pub struct ConnectHandle {
    id: u64,
    kind: EntityKind,
    registry: Weak<RegistryState>,
    disconnected: AtomicBool,
}

impl ConnectHandle {
    /// Remove the observer from its registry.
    ///
    /// Calling this more than once, or after the registry is gone, is a no-op.
    pub fn disconnect(&self) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(state) = self.registry.upgrade() {
            if state.remove(self.id) {
                debug!(kind = %self.kind, id = self.id, "configuration observer disconnected");
            }
        }
    }

    /// Returns true until [`disconnect`](Self::disconnect) is called.
    pub fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::Acquire)
    }

    /// The entity kind of the registry this handle belongs to.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Convert into a guard that disconnects when dropped.
    pub fn guard(self) -> ConnectGuard {
        ConnectGuard { handle: self }
    }
}

impl fmt::Debug for ConnectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Disconnects its observer when dropped.
#[derive(Debug)]
pub struct ConnectGuard {
    handle: ConnectHandle,
}

impl Drop for ConnectGuard {
    fn drop(&mut self) {
        self.handle.disconnect();
    }
}

/// One registry per entity kind.
#[derive(Debug)]
pub struct ObserverRegistries {
    consumer: ObserverRegistry,
    saga: ObserverRegistry,
    handler: ObserverRegistry,
}

impl ObserverRegistries {
    /// Create empty registries.
    pub fn new() -> Self {
        Self {
            consumer: ObserverRegistry::new(EntityKind::Consumer),
            saga: ObserverRegistry::new(EntityKind::Saga),
            handler: ObserverRegistry::new(EntityKind::Handler),
        }
    }

    /// The registry for `kind`.
    pub fn registry(&self, kind: EntityKind) -> &ObserverRegistry {
        match kind {
            EntityKind::Consumer => &self.consumer,
            EntityKind::Saga => &self.saga,
            EntityKind::Handler => &self.handler,
        }
    }

    /// Route an entity-level notification by the descriptor's kind.
    pub fn notify_entity_configured(&self, entity: &EntityDescriptor) -> Result<(), ObserverError> {
        self.registry(entity.kind).notify_entity_configured(entity)
    }

    /// Route a message-level notification by the descriptor's kind.
    pub fn notify_entity_message_configured(
        &self,
        entity: &EntityDescriptor,
        message: &MessageType,
    ) -> Result<(), ObserverError> {
        self.registry(entity.kind)
            .notify_entity_message_configured(entity, message)
    }
}

impl Default for ObserverRegistries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    struct OrderConsumer;
    struct SubmitOrder;

    /// Records every notification it receives, tagged with its own name.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ConfigurationObserver for Recorder {
        fn entity_configured(&self, entity: &EntityDescriptor) -> Result<(), BoxError> {
            self.log
                .lock()
                .push(format!("{}:{}", self.name, entity.entity_type.short_name()));
            Ok(())
        }

        fn entity_message_configured(
            &self,
            entity: &EntityDescriptor,
            message: &MessageType,
        ) -> Result<(), BoxError> {
            self.log.lock().push(format!(
                "{}:{}/{}",
                self.name,
                entity.entity_type.short_name(),
                message.short_name()
            ));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            log: log.clone(),
        }
    }

    #[test]
    fn observers_are_notified_in_connection_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        let _o1 = registry.connect(recorder("o1", &log));
        let _o2 = registry.connect(recorder("o2", &log));

        registry
            .notify_entity_configured(&EntityDescriptor::consumer::<OrderConsumer>())
            .unwrap();

        assert_eq!(*log.lock(), ["o1:OrderConsumer", "o2:OrderConsumer"]);
    }

    #[test]
    fn disconnected_observer_is_not_notified() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        let o1 = registry.connect(recorder("o1", &log));
        let _o2 = registry.connect(recorder("o2", &log));

        o1.disconnect();
        registry
            .notify_entity_configured(&EntityDescriptor::consumer::<OrderConsumer>())
            .unwrap();

        assert_eq!(*log.lock(), ["o2:OrderConsumer"]);
    }

    #[test]
    fn disconnect_twice_is_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Saga);
        let o1 = registry.connect(recorder("o1", &log));
        let _o2 = registry.connect(recorder("o2", &log));

        o1.disconnect();
        o1.disconnect();

        assert!(!o1.is_connected());
        assert_eq!(registry.len(), 1);
        registry
            .notify_entity_configured(&EntityDescriptor::saga::<OrderConsumer>())
            .unwrap();
        assert_eq!(*log.lock(), ["o2:OrderConsumer"]);
    }

    #[test]
    fn disconnect_after_registry_dropped_is_a_no_op() {
        let registry = ObserverRegistry::new(EntityKind::Handler);
        let handle = registry.connect(|_: &EntityDescriptor| -> Result<(), BoxError> { Ok(()) });
        drop(registry);
        handle.disconnect();
        assert!(!handle.is_connected());
    }

    #[test]
    fn guard_disconnects_on_drop() {
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        {
            let _guard = registry
                .connect(|_: &EntityDescriptor| -> Result<(), BoxError> { Ok(()) })
                .guard();
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn failing_observer_stops_the_pass() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        let _o1 = registry.connect(recorder("o1", &log));
        let _bad = registry.connect(|_: &EntityDescriptor| -> Result<(), BoxError> {
            Err("unsupported consumer".into())
        });
        let _o3 = registry.connect(recorder("o3", &log));

        let entity = EntityDescriptor::consumer::<OrderConsumer>();
        let err = registry.notify_entity_configured(&entity).unwrap_err();

        assert!(matches!(err, ObserverError::Failed { .. }));
        assert_eq!(*log.lock(), ["o1:OrderConsumer"]);
        assert!(!registry.is_configured(&entity));
        assert_eq!(registry.len(), 3);
    }

    /// Accepts entities but rejects every message type.
    struct RejectsMessages;

    impl ConfigurationObserver for RejectsMessages {
        fn entity_configured(&self, _: &EntityDescriptor) -> Result<(), BoxError> {
            Ok(())
        }

        fn entity_message_configured(
            &self,
            _: &EntityDescriptor,
            _: &MessageType,
        ) -> Result<(), BoxError> {
            Err("message not routable".into())
        }
    }

    #[test]
    fn failing_message_observer_names_the_message() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        let _bad = registry.connect(RejectsMessages);
        let _o2 = registry.connect(recorder("o2", &log));

        let entity = EntityDescriptor::consumer::<OrderConsumer>();
        let message = MessageType::of::<SubmitOrder>();
        registry.notify_entity_configured(&entity).unwrap();
        let err = registry
            .notify_entity_message_configured(&entity, &message)
            .unwrap_err();

        match &err {
            ObserverError::MessageFailed {
                entity: failed,
                message: failed_message,
                ..
            } => {
                assert_eq!(failed, &entity);
                assert_eq!(failed_message, &message);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains(&message.to_string()));
        assert!(err.to_string().contains("message not routable"));
        // The second observer only saw the entity-level pass.
        assert_eq!(*log.lock(), ["o2:OrderConsumer"]);
    }

    #[test]
    fn message_notification_requires_entity_notification_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(EntityKind::Consumer);
        let _o1 = registry.connect(recorder("o1", &log));

        let entity = EntityDescriptor::consumer::<OrderConsumer>();
        let message = MessageType::of::<SubmitOrder>();

        assert!(matches!(
            registry.notify_entity_message_configured(&entity, &message),
            Err(ObserverError::OutOfOrder { .. })
        ));

        registry.notify_entity_configured(&entity).unwrap();
        registry
            .notify_entity_message_configured(&entity, &message)
            .unwrap();

        assert_eq!(
            *log.lock(),
            ["o1:OrderConsumer", "o1:OrderConsumer/SubmitOrder"]
        );
    }

    #[test]
    fn registry_rejects_descriptor_of_other_kind() {
        let registry = ObserverRegistry::new(EntityKind::Saga);
        let err = registry
            .notify_entity_configured(&EntityDescriptor::consumer::<OrderConsumer>())
            .unwrap_err();
        assert!(matches!(
            err,
            ObserverError::KindMismatch {
                expected: EntityKind::Saga,
                actual: EntityKind::Consumer
            }
        ));
    }

    #[test]
    fn registries_dispatch_on_entity_kind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registries = ObserverRegistries::new();
        let _c = registries
            .registry(EntityKind::Consumer)
            .connect(recorder("consumer", &log));
        let _h = registries
            .registry(EntityKind::Handler)
            .connect(recorder("handler", &log));

        registries
            .notify_entity_configured(&EntityDescriptor::handler::<SubmitOrder>())
            .unwrap();

        assert_eq!(*log.lock(), ["handler:SubmitOrder"]);
    }

    #[test]
    fn concurrent_connect_disconnect_and_notify() {
        let registry = Arc::new(ObserverRegistry::new(EntityKind::Consumer));
        let counter = Arc::new(AtomicU64::new(0));

        let permanent = counter.clone();
        let _permanent = registry.connect(move |_: &EntityDescriptor| -> Result<(), BoxError> {
            permanent.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        let mut threads = vec![];
        for _ in 0..8 {
            let registry = registry.clone();
            threads.push(thread::spawn(move || {
                for _ in 0..100 {
                    let handle =
                        registry.connect(|_: &EntityDescriptor| -> Result<(), BoxError> { Ok(()) });
                    handle.disconnect();
                    handle.disconnect();
                }
            }));
        }
        for _ in 0..4 {
            let registry = registry.clone();
            threads.push(thread::spawn(move || {
                for _ in 0..50 {
                    registry
                        .notify_entity_configured(&EntityDescriptor::consumer::<OrderConsumer>())
                        .unwrap();
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        // The permanent observer saw every pass exactly once.
        assert_eq!(counter.load(Ordering::Relaxed), 200);
        assert_eq!(registry.len(), 1);
    }
}
