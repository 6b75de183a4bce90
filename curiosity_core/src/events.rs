//! Domain events emitted after each committed mutation.
//!
//! Collaborators (explorers, schedulers, visualizations) subscribe through an
//! [`EventListener`] instead of the core holding references to them.

use interest_model::{ConnectionOrigin, DreamSessionId, GenomeId};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

use crate::evolution::GenerationRecord;

/// Something observable that happened inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CuriosityEvent {
    InterestAdded { topic: String, weight: f64 },
    InterestReinforced { topic: String, weight: f64 },
    InterestEvicted { topic: String },
    ConnectionFormed {
        from: String,
        to: String,
        origin: ConnectionOrigin,
    },
    BecameCore { topic: String },
    MemoriesConsolidated { promoted: Vec<String>, clusters: usize },
    DreamCompleted {
        session: DreamSessionId,
        new_connections: usize,
        insights: usize,
    },
    NewGeneration { record: GenerationRecord },
    OutcomeRecorded { genome: GenomeId, fitness: f64 },
}

/// Receives engine events.
pub trait EventListener {
    fn on_event(&self, event: &CuriosityEvent);
}

impl<F> EventListener for F
where
    F: Fn(&CuriosityEvent),
{
    fn on_event(&self, event: &CuriosityEvent) {
        self(event)
    }
}

impl EventListener for Sender<CuriosityEvent> {
    fn on_event(&self, event: &CuriosityEvent) {
        // A dropped receiver just stops listening.
        let _ = self.send(event.clone());
    }
}

/// Fan-out to every subscribed listener, in subscription order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener + Send>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self, event: &CuriosityEvent) {
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }

    pub fn emit_all(&self, events: &[CuriosityEvent]) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
