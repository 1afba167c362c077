use crate::common::ContextId;
use crate::errors::TxResult;
use crate::transaction::Xid;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Transaction lifecycle steps taken by the propagation manager.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PropagationEvents {
    Begun,
    Joined,
    Suspended,
    Resumed,
    Committed,
    RolledBack,
}

/// Details of one propagation event.
#[derive(Clone)]
pub struct PropagationEventInfo {
    inner: Arc<PropagationEventInfoInner>,
}

struct PropagationEventInfoInner {
    event: PropagationEvents,
    xid: Xid,
    context: ContextId,
    operation_id: String,
    timestamp: i64,
}

impl PropagationEventInfo {
    pub fn new(event: PropagationEvents, xid: Xid, context: ContextId, operation_id: &str) -> Self {
        PropagationEventInfo {
            inner: Arc::new(PropagationEventInfoInner {
                event,
                xid,
                context,
                operation_id: operation_id.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            }),
        }
    }

    pub fn event(&self) -> PropagationEvents {
        self.inner.event
    }

    pub fn xid(&self) -> &Xid {
        &self.inner.xid
    }

    pub fn context(&self) -> ContextId {
        self.inner.context
    }

    pub fn operation_id(&self) -> &str {
        &self.inner.operation_id
    }

    /// Milliseconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.inner.timestamp
    }
}

impl Debug for PropagationEventInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationEventInfo")
            .field("event", &self.inner.event)
            .field("xid", &self.inner.xid.to_string())
            .field("context", &self.inner.context)
            .field("operation_id", &self.inner.operation_id)
            .field("timestamp", &self.inner.timestamp)
            .finish()
    }
}

pub trait PropagationEventCallback: Send + Sync + Fn(PropagationEventInfo) -> TxResult<()> {}

impl<F> PropagationEventCallback for F where F: Send + Sync + Fn(PropagationEventInfo) -> TxResult<()> {}

/// Listener notified of every [`PropagationEvents`] step.
#[derive(Clone)]
pub struct PropagationEventListener {
    on_event: Arc<dyn PropagationEventCallback>,
}

impl PropagationEventListener {
    pub fn new(on_event: impl PropagationEventCallback + 'static) -> Self {
        PropagationEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<PropagationEventInfo> for PropagationEventListener {
    fn handle(&self, event: &Event<PropagationEventInfo>) -> Result<(), BasuError> {
        (self.on_event)(event.data.clone()).map_err(|e| BasuError::HandlerError(Error::from(e)))
    }
}

impl Debug for PropagationEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationEventListener").finish()
    }
}
