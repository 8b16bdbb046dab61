//! Shared identifiers and the request/direction model used across the system.

/// A floor number. Basements are negative.
pub type Floor = i32;
/// Identifier of a movement unit; assigned from 1 in registration order.
pub type UnitId = u64;

/// Travel direction, always derived from a movement delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Idle,
}

impl Direction {
    /// Direction of travel from `from` to `to`.
    pub fn between(from: Floor, to: Floor) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Idle => "idle",
        }
    }
}

/// Whether a unit is currently executing a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    Idle,
    Moving,
}

/// A transport order from one floor to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Request {
    source: Floor,
    destination: Floor,
}

impl Request {
    pub fn new(source: Floor, destination: Floor) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn source(&self) -> Floor {
        self.source
    }

    pub fn destination(&self) -> Floor {
        self.destination
    }

    pub fn direction(&self) -> Direction {
        Direction::between(self.source, self.destination)
    }

    /// Floors visited from source to destination inclusive, in travel order.
    pub fn path(&self) -> Vec<Floor> {
        if self.source <= self.destination {
            (self.source..=self.destination).collect()
        } else {
            (self.destination..=self.source).rev().collect()
        }
    }
}

/// Point-in-time view of a unit, read under its lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitStatus {
    pub id: UnitId,
    pub position: Floor,
    pub direction: Direction,
    pub state: UnitState,
    pub pending: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_sign_of_delta() {
        assert_eq!(Request::new(2, 9).direction(), Direction::Up);
        assert_eq!(Request::new(9, 2).direction(), Direction::Down);
        assert_eq!(Request::new(4, 4).direction(), Direction::Idle);
    }

    #[test]
    fn path_is_inclusive_in_travel_order() {
        assert_eq!(Request::new(2, 5).path(), vec![2, 3, 4, 5]);
        assert_eq!(Request::new(5, 2).path(), vec![5, 4, 3, 2]);
        assert_eq!(Request::new(-1, 1).path(), vec![-1, 0, 1]);
    }
}
