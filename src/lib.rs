//! Multi-unit elevator dispatch simulation.
//!
//! A [`Controller`] owns a fixed set of [`Unit`]s. Each unit has a bounded
//! request queue and a worker thread that executes requests one at a time,
//! stepping floor by floor. Incoming requests go to the unit whose current
//! position is nearest the pickup floor.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod request_queue;
pub mod sim;
pub mod types;
pub mod unit;

pub use config::{DispatchConfig, FloorRange};
pub use controller::{Controller, ControllerBuilder, DispatchStats, select_nearest};
pub use error::{DispatchError, DispatchResult};
pub use events::{Event, EventCounts, EventLog, EventSink, Fanout, LogSink};
pub use types::{Direction, Floor, Request, UnitId, UnitState, UnitStatus};
pub use unit::Unit;
