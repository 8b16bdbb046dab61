//! A single movement unit: its bounded request queue, its position, and the
//! worker thread that executes requests one at a time.
//!
//! Pending requests, position, direction and state share the queue's lock.
//! Position and direction are written only by the unit's own worker, one
//! floor at a time, so readers never see a torn value.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::events::{Event, EventSink};
use crate::request_queue::{PushError, RequestQueue};
use crate::types::{Direction, Floor, Request, UnitId, UnitState, UnitStatus};

struct Motion {
    position: Floor,
    direction: Direction,
    state: UnitState,
}

impl Motion {
    fn begin(&mut self, request: &Request) {
        self.direction = request.direction();
        if self.direction != Direction::Idle {
            self.state = UnitState::Moving;
        }
    }
}

/// An elevator with its own queue and worker.
///
/// Only the worker may take requests off the queue or move the unit:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use std::time::Duration;
/// use lift_dispatch::{EventLog, Unit};
///
/// let unit = Unit::new(1, 1, 1, Duration::ZERO, Arc::new(EventLog::new()));
/// let _ = unit.dequeue_blocking();
/// ```
///
/// ```compile_fail
/// use std::sync::Arc;
/// use std::time::Duration;
/// use lift_dispatch::{EventLog, Unit};
///
/// let unit = Arc::new(Unit::new(1, 1, 1, Duration::ZERO, Arc::new(EventLog::new())));
/// let _ = Unit::spawn_worker(unit);
/// ```
pub struct Unit {
    id: UnitId,
    queue: RequestQueue<Motion>,
    worker_started: AtomicBool,
    floor_delay: Duration,
    sink: Arc<dyn EventSink>,
}

impl Unit {
    /// Create an idle unit at `position`. Direction starts as `Up` by convention.
    pub fn new(
        id: UnitId,
        capacity: usize,
        position: Floor,
        floor_delay: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            id,
            queue: RequestQueue::with_state(
                capacity,
                Motion {
                    position,
                    direction: Direction::Up,
                    state: UnitState::Idle,
                },
            ),
            worker_started: AtomicBool::new(false),
            floor_delay,
            sink,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Requests accepted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn position(&self) -> Floor {
        self.queue.read(|_, motion| motion.position)
    }

    pub fn direction(&self) -> Direction {
        self.queue.read(|_, motion| motion.direction)
    }

    pub fn state(&self) -> UnitState {
        self.queue.read(|_, motion| motion.state)
    }

    pub fn status(&self) -> UnitStatus {
        self.queue.read(|pending, motion| UnitStatus {
            id: self.id,
            position: motion.position,
            direction: motion.direction,
            state: motion.state,
            pending,
            capacity: self.queue.capacity(),
        })
    }

    /// Hand a request to this unit without blocking.
    ///
    /// Fails with `QueueFull` when the queue is at capacity and with
    /// `ShuttingDown` once [`Unit::stop`] has been called.
    pub fn enqueue(&self, request: Request) -> DispatchResult<()> {
        // Accepted is emitted under the queue lock, before the worker can pop.
        let pushed = self.queue.push_with(request, |request, _| {
            self.sink.emit(Event::Accepted {
                unit: self.id,
                request: *request,
            });
        });
        match pushed {
            Ok(()) => Ok(()),
            Err(PushError::Full(request)) => {
                warn!(
                    "[UNIT] unit {} rejected {} -> {}: queue full",
                    self.id,
                    request.source(),
                    request.destination()
                );
                Err(DispatchError::QueueFull {
                    unit: self.id,
                    capacity: self.queue.capacity(),
                })
            }
            Err(PushError::Closed(_)) => Err(DispatchError::ShuttingDown { unit: self.id }),
        }
    }

    /// Wait for the next request and mark the unit as moving in the same
    /// critical section. `None` means the unit was stopped and drained.
    pub(crate) fn dequeue_blocking(&self) -> Option<Request> {
        self.queue
            .pop_blocking_with(|request, motion| motion.begin(request))
    }

    /// Move floor by floor from the request's source to its destination.
    pub(crate) fn simulate_move(&self, request: &Request) {
        // Already applied by dequeue_blocking when called from the worker.
        self.queue.update(|motion| motion.begin(request));

        if request.direction() != Direction::Idle {
            for floor in request.path() {
                self.queue.update(|motion| motion.position = floor);
                self.sink.emit(Event::FloorReached {
                    unit: self.id,
                    floor,
                });
                if !self.floor_delay.is_zero() {
                    thread::sleep(self.floor_delay);
                }
            }
            self.queue.update(|motion| motion.state = UnitState::Idle);
        }

        self.sink.emit(Event::Completed {
            unit: self.id,
            request: *request,
        });
    }

    /// Worker loop: take requests in FIFO order until stopped and drained.
    pub(crate) fn run(&self) {
        debug!("[UNIT] unit {} worker started", self.id);
        while let Some(request) = self.dequeue_blocking() {
            self.simulate_move(&request);
        }
        debug!("[UNIT] unit {} worker exiting", self.id);
    }

    /// Start the worker on a thread named `unit-{id}`. A unit gets one worker.
    pub(crate) fn spawn_worker(unit: Arc<Unit>) -> DispatchResult<thread::JoinHandle<()>> {
        if unit.worker_started.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::Config(format!(
                "unit {} already has a worker",
                unit.id
            )));
        }
        let started = Arc::clone(&unit);
        match thread::Builder::new()
            .name(format!("unit-{}", unit.id))
            .spawn(move || unit.run())
        {
            Ok(handle) => Ok(handle),
            Err(err) => {
                started.worker_started.store(false, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Signal the worker to exit once its queue is empty; later enqueues are refused.
    pub fn stop(&self) {
        self.queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use std::sync::mpsc;

    fn unit_with_log(capacity: usize, position: Floor) -> (Unit, Arc<EventLog>) {
        let log = Arc::new(EventLog::new());
        let unit = Unit::new(1, capacity, position, Duration::ZERO, log.clone());
        (unit, log)
    }

    #[test]
    fn starts_idle_facing_up() {
        let (unit, _) = unit_with_log(2, 1);
        let status = unit.status();
        assert_eq!(status.position, 1);
        assert_eq!(status.direction, Direction::Up);
        assert_eq!(status.state, UnitState::Idle);
        assert_eq!(status.pending, 0);
        assert_eq!(status.capacity, 2);
    }

    #[test]
    fn moving_up_ends_at_destination() {
        let (unit, log) = unit_with_log(1, 1);
        unit.simulate_move(&Request::new(2, 9));
        assert_eq!(unit.position(), 9);
        assert_eq!(unit.direction(), Direction::Up);
        assert_eq!(unit.state(), UnitState::Idle);
        assert_eq!(log.floors_reached_by(1), (2..=9).collect::<Vec<_>>());
    }

    #[test]
    fn moving_down_sets_direction_down() {
        let (unit, log) = unit_with_log(1, 9);
        unit.simulate_move(&Request::new(9, 2));
        assert_eq!(unit.position(), 2);
        assert_eq!(unit.direction(), Direction::Down);
        assert_eq!(log.floors_reached_by(1), vec![9, 8, 7, 6, 5, 4, 3, 2]);
    }

    #[test]
    fn same_floor_request_does_not_move() {
        let (unit, log) = unit_with_log(1, 7);
        unit.simulate_move(&Request::new(4, 4));
        assert_eq!(unit.position(), 7);
        assert_eq!(unit.direction(), Direction::Idle);
        assert!(log.floors_reached_by(1).is_empty());
        assert_eq!(log.completed_by(1), vec![Request::new(4, 4)]);
    }

    #[test]
    fn full_queue_rejects_with_queue_full() {
        let (unit, log) = unit_with_log(1, 1);
        unit.enqueue(Request::new(1, 3)).expect("first enqueue");
        let result = unit.enqueue(Request::new(2, 4));
        assert!(matches!(
            result,
            Err(DispatchError::QueueFull {
                unit: 1,
                capacity: 1
            })
        ));
        assert_eq!(unit.pending(), 1);
        // Only the accepted request is reported.
        assert_eq!(log.snapshot().len(), 1);
    }

    #[test]
    fn stopped_unit_refuses_requests() {
        let (unit, _) = unit_with_log(2, 1);
        unit.stop();
        assert!(matches!(
            unit.enqueue(Request::new(1, 2)),
            Err(DispatchError::ShuttingDown { unit: 1 })
        ));
    }

    #[test]
    fn worker_services_in_fifo_order_then_exits_on_stop() {
        let log = Arc::new(EventLog::new());
        let unit = Arc::new(Unit::new(3, 4, 1, Duration::ZERO, log.clone()));
        unit.enqueue(Request::new(1, 3)).expect("enqueue");
        unit.enqueue(Request::new(3, 2)).expect("enqueue");
        unit.enqueue(Request::new(5, 5)).expect("enqueue");

        let handle = Unit::spawn_worker(Arc::clone(&unit)).expect("spawn worker");
        unit.stop();

        let (done_tx, done_rx) = mpsc::channel();
        std::thread::spawn(move || {
            let joined = handle.join().is_ok();
            done_tx.send(joined).expect("done");
        });
        let joined = done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("worker did not exit");
        assert!(joined);

        assert_eq!(
            log.completed_by(3),
            vec![Request::new(1, 3), Request::new(3, 2), Request::new(5, 5)]
        );
        assert_eq!(unit.position(), 2);
        assert_eq!(unit.pending(), 0);
    }

    #[test]
    fn second_worker_is_refused() {
        let log = Arc::new(EventLog::new());
        let unit = Arc::new(Unit::new(1, 2, 1, Duration::ZERO, log));
        let handle = Unit::spawn_worker(Arc::clone(&unit)).expect("first worker");
        assert!(matches!(
            Unit::spawn_worker(Arc::clone(&unit)),
            Err(DispatchError::Config(_))
        ));
        unit.stop();
        handle.join().expect("worker panicked");
    }

    #[test]
    fn one_request_moves_at_a_time() {
        let log = Arc::new(EventLog::new());
        let unit = Arc::new(Unit::new(1, 2, 1, Duration::from_millis(2), log.clone()));
        let handle = Unit::spawn_worker(Arc::clone(&unit)).expect("worker");
        let _ = Unit::spawn_worker(Arc::clone(&unit));
        unit.enqueue(Request::new(1, 5)).expect("enqueue");
        unit.enqueue(Request::new(10, 6)).expect("enqueue");
        unit.stop();
        handle.join().expect("worker panicked");
        assert_eq!(log.floors_reached_by(1), vec![1, 2, 3, 4, 5, 10, 9, 8, 7, 6]);
    }

    /// Records events, stalling on every acceptance.
    struct SlowAcceptLog(EventLog);

    impl EventSink for SlowAcceptLog {
        fn emit(&self, event: Event) {
            if matches!(event, Event::Accepted { .. }) {
                std::thread::sleep(Duration::from_millis(20));
            }
            self.0.emit(event);
        }
    }

    #[test]
    fn accepted_is_reported_before_movement() {
        let sink = Arc::new(SlowAcceptLog(EventLog::new()));
        let unit = Arc::new(Unit::new(1, 2, 1, Duration::ZERO, sink.clone()));
        let handle = Unit::spawn_worker(Arc::clone(&unit)).expect("worker");
        unit.enqueue(Request::new(2, 4)).expect("enqueue");
        unit.stop();
        handle.join().expect("worker panicked");

        let events = sink.0.snapshot();
        assert_eq!(
            events.first(),
            Some(&Event::Accepted {
                unit: 1,
                request: Request::new(2, 4)
            })
        );
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn dequeue_marks_unit_moving_with_queue_drained() {
        let (unit, _) = unit_with_log(2, 1);
        unit.enqueue(Request::new(3, 1)).expect("enqueue");
        let request = unit.dequeue_blocking().expect("request");
        assert_eq!(request, Request::new(3, 1));
        // No simulate_move yet: the pop alone must leave a consistent snapshot.
        let status = unit.status();
        assert_eq!(status.pending, 0);
        assert_eq!(status.state, UnitState::Moving);
        assert_eq!(status.direction, Direction::Down);
    }
}
