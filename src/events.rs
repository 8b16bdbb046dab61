//! Observable dispatch events and the sinks that receive them.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::info;

use crate::types::{Floor, Request, UnitId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A request entered a unit's queue.
    Accepted { unit: UnitId, request: Request },
    /// A unit's position changed during movement.
    FloorReached { unit: UnitId, floor: Floor },
    /// A unit finished executing a request.
    Completed { unit: UnitId, request: Request },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Accepted { unit, request } => write!(
                f,
                "unit {unit} accepted request {} -> {}",
                request.source(),
                request.destination()
            ),
            Event::FloorReached { unit, floor } => write!(f, "unit {unit} reached floor {floor}"),
            Event::Completed { unit, request } => write!(
                f,
                "unit {unit} completed request {} -> {}",
                request.source(),
                request.destination()
            ),
        }
    }
}

/// Receiver of dispatch events. Called from caller and worker threads alike.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes one log line per event.
#[derive(Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event) {
        info!("[DISPATCH] {event}");
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().expect("event log mutex poisoned").clone()
    }

    /// Requests completed by `unit`, in completion order.
    pub fn completed_by(&self, unit: UnitId) -> Vec<Request> {
        let guard = self.events.lock().expect("event log mutex poisoned");
        guard
            .iter()
            .filter_map(|event| match event {
                Event::Completed { unit: u, request } if *u == unit => Some(*request),
                _ => None,
            })
            .collect()
    }

    /// Floors reached by `unit`, in movement order.
    pub fn floors_reached_by(&self, unit: UnitId) -> Vec<Floor> {
        let guard = self.events.lock().expect("event log mutex poisoned");
        guard
            .iter()
            .filter_map(|event| match event {
                Event::FloorReached { unit: u, floor } if *u == unit => Some(*floor),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .expect("event log mutex poisoned")
            .push(event);
    }
}

/// Lock-free per-kind counters for long benchmark runs.
#[derive(Default)]
pub struct EventCounts {
    accepted: AtomicUsize,
    floors_reached: AtomicUsize,
    completed: AtomicUsize,
}

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn floors_reached(&self) -> usize {
        self.floors_reached.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl EventSink for EventCounts {
    fn emit(&self, event: Event) {
        let counter = match event {
            Event::Accepted { .. } => &self.accepted,
            Event::FloorReached { .. } => &self.floors_reached,
            Event::Completed { .. } => &self.completed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forwards each event to every inner sink.
pub struct Fanout(Vec<Arc<dyn EventSink>>);

impl Fanout {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self(sinks)
    }
}

impl EventSink for Fanout {
    fn emit(&self, event: Event) {
        for sink in &self.0 {
            sink.emit(event);
        }
    }
}
