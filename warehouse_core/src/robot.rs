//! Warehouse robots: task state and steering-based motion.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Item, Position, RobotId, WarehouseConfig};

/// Displacement from the last recorded position that counts as one movement.
const MOVEMENT_EPSILON: f64 = 0.1;

/// Weight of the goal-seeking component when neighbours are nearby.
const SEEK_WEIGHT: f64 = 0.6;

/// Weight of the separation component when neighbours are nearby.
const SEPARATION_WEIGHT: f64 = 0.4;

/// Task state of a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotState {
    /// Waiting for an assignment.
    Idle,
    /// Driving towards an item it intends to pick up.
    Seeking,
    /// Driving towards the stack matching the carried item.
    Carrying,
    /// Reserved; the warehouse never moves a robot into this state.
    Stacking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub(crate) id: RobotId,
    pub(crate) position: Position,
    pub(crate) orientation: f64,
    pub(crate) state: RobotState,
    pub(crate) carried_item: Option<Item>,
    pub(crate) target: Option<Position>,
    pub(crate) movement_count: u64,
    pub(crate) last_position: Position,
    radius: f64,
    speed: f64,
    rotation_speed: f64,
    detection_radius: f64,
    min_position: Position,
    max_position: Position,
}

impl Robot {
    /// Creates an idle robot at `position`, clamped into the area its body fits in.
    pub fn new(id: RobotId, position: Position, config: &WarehouseConfig) -> Self {
        let min_position = config.min_robot_position();
        let max_position = config.max_robot_position();
        let position = position.clamp(min_position, max_position);
        Robot {
            id,
            position,
            orientation: 0.0,
            state: RobotState::Idle,
            carried_item: None,
            target: None,
            movement_count: 0,
            last_position: position,
            radius: config.robot_radius,
            speed: config.speed,
            rotation_speed: config.rotation_speed,
            detection_radius: config.detection_radius,
            min_position,
            max_position,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Heading in radians within `(-PI, PI]`.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn carried_item(&self) -> Option<&Item> {
        self.carried_item.as_ref()
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    /// Number of ticks on which the robot moved noticeably.
    pub fn movement_count(&self) -> u64 {
        self.movement_count
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Velocity for this tick: seek the target while keeping clear of `neighbors`.
    ///
    /// `neighbors` holds the current positions of every other robot. Those
    /// within the detection radius repel with a strength falling off with the
    /// squared distance; coincident robots are ignored.
    pub fn steering_force(&self, neighbors: &[Position]) -> Position {
        let Some(target) = self.target else {
            return Position::ZERO;
        };

        let desired = (target - self.position).with_length(self.speed);

        let mut separation = Position::ZERO;
        let mut neighbor_count = 0usize;
        for &other in neighbors {
            let offset = self.position - other;
            let distance = offset.length();
            if distance < self.detection_radius && distance > 0.0 {
                separation += offset / (distance * distance);
                neighbor_count += 1;
            }
        }

        if neighbor_count == 0 {
            return desired;
        }

        let separation = (separation / neighbor_count as f64).with_length(self.speed);
        (SEEK_WEIGHT * desired + SEPARATION_WEIGHT * separation).with_length(self.speed)
    }

    /// Performs one motion step towards the target.
    ///
    /// Returns `true` when the robot ends within its own radius of the target.
    /// Without a target the robot stays put and `false` is returned. Neither the
    /// target nor the state is changed here.
    pub fn advance(&mut self, neighbors: &[Position]) -> bool {
        let Some(target) = self.target else {
            return false;
        };

        let steering = self.steering_force(neighbors);
        self.position += steering;

        if self.position.distance(self.last_position) > MOVEMENT_EPSILON {
            self.movement_count += 1;
            self.last_position = self.position;
        }

        self.position = self.position.clamp(self.min_position, self.max_position);

        if steering.length() > 0.0 {
            let turn = shortest_rotation(self.orientation, steering.heading());
            self.orientation =
                wrap_angle(self.orientation + turn.signum() * turn.abs().min(self.rotation_speed));
        }

        self.position.distance(target) < self.radius
    }
}

/// Maps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

/// Signed rotation of smallest magnitude taking heading `from` to heading `to`.
pub fn shortest_rotation(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}
