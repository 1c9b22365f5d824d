//! Construction parameters for a [`Warehouse`](crate::Warehouse).
//!
//! Every field has a default matching the reference layout, so a TOML file only
//! needs the keys it wants to change:
//!
//! ```toml
//! width = 400
//! height = 300
//! robot_count = 3
//! seed = 7
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Position, warehouse::WarehouseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub width: f64,
    pub height: f64,
    pub robot_count: usize,
    pub items_per_type: usize,
    pub stack_capacity: usize,
    /// Other robots closer than this push each other apart.
    pub detection_radius: f64,
    /// Distance travelled per tick.
    pub speed: f64,
    /// Maximum change of orientation per tick, in radians.
    pub rotation_speed: f64,
    /// Body radius; also the arrival tolerance.
    pub robot_radius: f64,
    /// Items are scattered at least this far from every wall.
    pub item_margin: f64,
    /// Distance of each stack from its two nearest walls.
    pub stack_margin: f64,
    /// Seed for initial robot and item placement. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            robot_count: 5,
            items_per_type: 5,
            stack_capacity: 5,
            detection_radius: 60.0,
            speed: 2.0,
            rotation_speed: PI / 16.0,
            robot_radius: 20.0,
            item_margin: 50.0,
            stack_margin: 70.0,
            seed: None,
        }
    }
}

impl WarehouseConfig {
    /// Checks every parameter a warehouse relies on.
    pub fn validate(&self) -> Result<(), WarehouseError> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("speed", self.speed)?;
        positive("rotation_speed", self.rotation_speed)?;
        positive("robot_radius", self.robot_radius)?;
        if !self.detection_radius.is_finite() || self.detection_radius < 0.0 {
            return Err(invalid(
                "detection_radius",
                "must be a finite, non-negative number",
            ));
        }
        if self.robot_count == 0 {
            return Err(invalid("robot_count", "must be at least 1"));
        }
        if self.stack_capacity == 0 {
            return Err(invalid("stack_capacity", "must be at least 1"));
        }
        if self.width <= 2.0 * self.robot_radius || self.height <= 2.0 * self.robot_radius {
            return Err(invalid("robot_radius", "robots do not fit inside the warehouse"));
        }
        let margins = [
            ("item_margin", self.item_margin),
            ("stack_margin", self.stack_margin),
        ];
        for (field, margin) in margins {
            if !margin.is_finite()
                || margin < 0.0
                || 2.0 * margin > self.width
                || 2.0 * margin > self.height
            {
                return Err(invalid(field, "must fit inside the warehouse"));
            }
        }
        Ok(())
    }

    /// Lowest corner a robot centre may occupy.
    pub fn min_robot_position(&self) -> Position {
        Position::new(self.robot_radius, self.robot_radius)
    }

    /// Highest corner a robot centre may occupy.
    pub fn max_robot_position(&self) -> Position {
        Position::new(self.width - self.robot_radius, self.height - self.robot_radius)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), WarehouseError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite, positive number"))
    }
}

fn invalid(field: &'static str, reason: &'static str) -> WarehouseError {
    WarehouseError::InvalidConfiguration { field, reason }
}
