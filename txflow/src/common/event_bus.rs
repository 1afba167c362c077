use crate::common::PROPAGATION_EVENT;
use crate::errors::{ErrorKind, TxError, TxResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed wrapper over a basu event bus bound to a single topic.
///
/// Publishing without any registered listener returns immediately without
/// allocating an event.
#[derive(Clone)]
pub struct TxEventBus<E, L> {
    inner: Arc<TxEventBusInner<E, L>>,
}

impl<E, L> Default for TxEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> TxEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        TxEventBus {
            inner: Arc::new(TxEventBusInner {
                event_bus: EventBus::new(),
                phantom_data: PhantomData,
            }),
        }
    }

    /// Registers a listener and returns a handle to deregister it later.
    pub fn register(&self, listener: L) -> TxResult<Option<SubscriberRef>> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> TxResult<()> {
        self.inner.deregister(subscriber)
    }

    /// Delivers the event to every registered listener.
    pub fn publish(&self, event: E) -> TxResult<()> {
        self.inner.publish(event)
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.handler_count() > 0
    }
}

/// Handle returned by a successful registration.
pub struct SubscriberRef {
    inner: HandlerId,
}

impl SubscriberRef {
    fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct TxEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> TxEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn register(&self, listener: L) -> TxResult<Option<SubscriberRef>> {
        self.event_bus
            .subscribe(PROPAGATION_EVENT, Box::new(listener))
            .map(|id| Some(SubscriberRef::new(id)))
            .map_err(to_tx_error)
    }

    fn deregister(&self, subscriber: SubscriberRef) -> TxResult<()> {
        self.event_bus
            .unsubscribe(PROPAGATION_EVENT, &subscriber.inner)
            .map(|_| ())
            .map_err(to_tx_error)
    }

    fn publish(&self, event: E) -> TxResult<()> {
        if self.handler_count() == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(PROPAGATION_EVENT, &basu_event)
            .map(|_| ())
            .map_err(to_tx_error)
    }

    fn handler_count(&self) -> usize {
        match self.event_bus.get_handler_count(PROPAGATION_EVENT) {
            Ok(count) => count,
            Err(BasuError::EventTypeNotFOUND) => 0,
            Err(e) => {
                log::warn!("Failed to count propagation listeners: {}", e);
                0
            }
        }
    }
}

fn to_tx_error(e: BasuError) -> TxError {
    match e {
        BasuError::EventTypeNotFOUND => TxError::new(
            "Event bus error: no listener was ever registered for propagation events",
            ErrorKind::EventError,
        ),
        BasuError::MutexPoisoned => TxError::new(
            "Event bus error: internal mutex poisoned",
            ErrorKind::EventError,
        ),
        BasuError::HandlerError(e) => {
            let message = match e.downcast_ref::<TxError>() {
                Some(cause) => cause.message().to_string(),
                None => e.to_string(),
            };
            TxError::new(
                &format!("Propagation listener failed: {}", message),
                ErrorKind::EventError,
            )
        }
    }
}
