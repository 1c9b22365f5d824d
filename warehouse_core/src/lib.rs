use std::{
    fmt,
    ops::{Add, AddAssign, Div, Mul, Sub},
};

use serde::{Deserialize, Serialize};

pub mod config;
pub mod robot;
pub mod snapshot;
pub mod stack;
pub mod warehouse;

pub use config::WarehouseConfig;
pub use robot::{Robot, RobotState};
pub use snapshot::{ItemSnapshot, RobotSnapshot, StackSnapshot, WarehouseSnapshot};
pub use stack::Stack;
pub use warehouse::{TickResult, Warehouse, WarehouseError};

/// Unique identifier for robots. Robots are processed in ascending id order.
pub type RobotId = usize;

/// Unique identifier for items.
pub type ItemId = usize;

/// A point (or vector) on the continuous warehouse floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Position) -> f64 {
        (*self - other).length()
    }

    /// Rescales the vector to `magnitude`. A zero vector stays zero.
    pub fn with_length(self, magnitude: f64) -> Position {
        let length = self.length();
        if length > 0.0 {
            self * (magnitude / length)
        } else {
            Position::ZERO
        }
    }

    /// Heading of the vector in radians, as measured by `atan2(y, x)`.
    pub fn heading(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Clamps each component into `[min, max]` of the matching axis.
    pub fn clamp(self, min: Position, max: Position) -> Position {
        Position::new(self.x.clamp(min.x, max.x), self.y.clamp(min.y, max.y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Self) -> Self::Output {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Self) -> Self::Output {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Self::Output {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Position> for f64 {
    type Output = Position;

    fn mul(self, rhs: Position) -> Self::Output {
        rhs * self
    }
}

impl Div<f64> for Position {
    type Output = Position;

    fn div(self, rhs: f64) -> Self::Output {
        Position::new(self.x / rhs, self.y / rhs)
    }
}

/// Category of a collectible item. Every category has exactly one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Electronics,
    Clothing,
    Food,
    Tools,
}

impl ItemType {
    pub const ALL: [ItemType; 4] = [
        ItemType::Electronics,
        ItemType::Clothing,
        ItemType::Food,
        ItemType::Tools,
    ];
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemType::Electronics => "electronics",
            ItemType::Clothing => "clothing",
            ItemType::Food => "food",
            ItemType::Tools => "tools",
        };
        f.write_str(name)
    }
}

/// A collectible unit lying on the floor, carried by a robot, or stacked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub item_type: ItemType,
    pub position: Position,
}
