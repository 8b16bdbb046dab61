//! Unit registry and nearest-position selection.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::config::{DispatchConfig, FloorRange};
use crate::error::{DispatchError, DispatchResult};
use crate::events::EventSink;
use crate::types::{Floor, Request, UnitId, UnitStatus};
use crate::unit::Unit;

/// Index of the position closest to `source`; the earliest wins ties.
///
/// Only current positions count. Direction, queue depth and in-flight
/// requests are ignored.
pub fn select_nearest<I>(source: Floor, positions: I) -> Option<usize>
where
    I: IntoIterator<Item = Floor>,
{
    positions
        .into_iter()
        .enumerate()
        .min_by_key(|&(_, position)| source.abs_diff(position))
        .map(|(index, _)| index)
}

/// Outcome counters since the controller started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub accepted: usize,
    pub rejected_invalid: usize,
    pub rejected_full: usize,
    pub rejected_shutdown: usize,
}

impl DispatchStats {
    pub fn rejected(&self) -> usize {
        self.rejected_invalid + self.rejected_full + self.rejected_shutdown
    }
}

#[derive(Default)]
struct Counters {
    accepted: AtomicUsize,
    rejected_invalid: AtomicUsize,
    rejected_full: AtomicUsize,
    rejected_shutdown: AtomicUsize,
}

/// Collects units in registration order before any worker starts.
pub struct ControllerBuilder {
    floors: FloorRange,
    units: Vec<Unit>,
}

impl ControllerBuilder {
    /// Append a unit; its position in the registry is its tie-break rank.
    pub fn register(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Spawn one worker per registered unit.
    pub fn start(self) -> DispatchResult<Controller> {
        if self.units.is_empty() {
            return Err(DispatchError::NoUnits);
        }
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id()) {
                return Err(DispatchError::Config(format!(
                    "unit id {} registered twice",
                    unit.id()
                )));
            }
        }

        let units: Vec<Arc<Unit>> = self.units.into_iter().map(Arc::new).collect();
        let mut controller = Controller {
            floors: self.floors,
            units,
            workers: Vec::new(),
            counters: Counters::default(),
        };
        for unit in &controller.units {
            // On failure, dropping the partial controller stops and joins
            // the workers spawned so far.
            let handle = Unit::spawn_worker(Arc::clone(unit))?;
            controller.workers.push((unit.id(), handle));
        }
        info!(
            "[CONTROLLER] started units={} floors={}..={}",
            controller.units.len(),
            controller.floors.min(),
            controller.floors.max()
        );
        Ok(controller)
    }
}

/// Owns every unit and assigns incoming requests to them.
pub struct Controller {
    floors: FloorRange,
    units: Vec<Arc<Unit>>,
    workers: Vec<(UnitId, JoinHandle<()>)>,
    counters: Counters,
}

impl Controller {
    pub fn builder(floors: FloorRange) -> ControllerBuilder {
        ControllerBuilder {
            floors,
            units: Vec::new(),
        }
    }

    /// Build and start `config.units` units, numbered from 1, all at the origin floor.
    pub fn new(config: &DispatchConfig, sink: Arc<dyn EventSink>) -> DispatchResult<Self> {
        config.validate()?;
        let mut builder = Self::builder(config.floor_range()?);
        for id in 1..=config.units as UnitId {
            builder = builder.register(Unit::new(
                id,
                config.capacity,
                config.origin_floor,
                config.floor_delay,
                Arc::clone(&sink),
            ));
        }
        builder.start()
    }

    /// Assign a transport request to the nearest unit and return its id.
    ///
    /// Returns as soon as the hand-off is decided; movement happens on the
    /// unit's worker.
    pub fn request(&self, source: Floor, destination: Floor) -> DispatchResult<UnitId> {
        if let Err(err) = self
            .floors
            .check(source)
            .and_then(|()| self.floors.check(destination))
        {
            self.counters.rejected_invalid.fetch_add(1, Ordering::SeqCst);
            warn!("[CONTROLLER] rejected {source} -> {destination}: {err}");
            return Err(err);
        }

        let unit = self.select_unit(source)?;
        match unit.enqueue(Request::new(source, destination)) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::SeqCst);
                Ok(unit.id())
            }
            Err(err) => {
                let counter = match err {
                    DispatchError::ShuttingDown { .. } => &self.counters.rejected_shutdown,
                    _ => &self.counters.rejected_full,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn select_unit(&self, source: Floor) -> DispatchResult<&Arc<Unit>> {
        // Each position is read under that unit's own lock, one unit at a time.
        let index = select_nearest(source, self.units.iter().map(|unit| unit.position()))
            .ok_or(DispatchError::NoUnits)?;
        Ok(&self.units[index])
    }

    pub fn floors(&self) -> FloorRange {
        self.floors
    }

    pub fn units(&self) -> &[Arc<Unit>] {
        &self.units
    }

    pub fn statuses(&self) -> Vec<UnitStatus> {
        self.units.iter().map(|unit| unit.status()).collect()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.counters.accepted.load(Ordering::SeqCst),
            rejected_invalid: self.counters.rejected_invalid.load(Ordering::SeqCst),
            rejected_full: self.counters.rejected_full.load(Ordering::SeqCst),
            rejected_shutdown: self.counters.rejected_shutdown.load(Ordering::SeqCst),
        }
    }

    /// Stop every unit and wait for its worker to finish the queued requests.
    pub fn shutdown(mut self) -> DispatchResult<()> {
        match self.stop_and_join().first() {
            Some(&unit) => Err(DispatchError::WorkerPanicked { unit }),
            None => Ok(()),
        }
    }

    /// Returns the ids of units whose worker panicked.
    fn stop_and_join(&mut self) -> Vec<UnitId> {
        for unit in &self.units {
            unit.stop();
        }
        let mut panicked = Vec::new();
        for (id, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("[CONTROLLER] worker for unit {id} panicked");
                panicked.push(id);
            }
        }
        debug!("[CONTROLLER] all workers stopped");
        panicked
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop_and_join();
        }
    }
}
