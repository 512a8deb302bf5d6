//! Host handler table: one slot per event kind, last registration wins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{EventKind, EventPayload};

/// Host callback invoked with the server name and the event payload.
///
/// Returning an error or panicking is contained by the router and logged.
pub type EventHandler = Arc<dyn Fn(&str, &EventPayload) -> anyhow::Result<()> + Send + Sync>;

/// Mapping from event kind to at most one handler.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    slots: HashMap<EventKind, EventHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handler` for `kind`, returning the handler it replaced.
    pub fn insert(&mut self, kind: EventKind, handler: EventHandler) -> Option<EventHandler> {
        self.slots.insert(kind, handler)
    }

    pub fn get(&self, kind: EventKind) -> Option<&EventHandler> {
        self.slots.get(&kind)
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}
