use std::sync::mpsc::Sender;

use log::warn;

use super::NetworkKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Grow,
    Flush,
}

/// Emitted after a network changed its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthEvent {
    pub transition: Transition,
    pub network: NetworkKind,
    /// The network's current stage after the transition.
    pub stage: usize,
    pub total_stages: usize,
}

/// Gets notified of the structural changes of a network.
pub trait GrowthObserver {
    fn on_grow(&mut self, _event: &GrowthEvent) {}

    fn on_flush(&mut self, _event: &GrowthEvent) {}
}

impl GrowthObserver for Sender<GrowthEvent> {
    fn on_grow(&mut self, event: &GrowthEvent) {
        if self.send(*event).is_err() {
            warn!(network = event.network.as_str(); "growth event receiver dropped");
        }
    }

    fn on_flush(&mut self, event: &GrowthEvent) {
        if self.send(*event).is_err() {
            warn!(network = event.network.as_str(); "growth event receiver dropped");
        }
    }
}

/// The subscribed observers of a network.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Box<dyn GrowthObserver + Send>>,
}

impl Observers {
    pub fn push(&mut self, observer: Box<dyn GrowthObserver + Send>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, event: GrowthEvent) {
        for observer in &mut self.observers {
            match event.transition {
                Transition::Grow => observer.on_grow(&event),
                Transition::Flush => observer.on_flush(&event),
            }
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.observers.len())
            .finish()
    }
}
