//! Read-only copies of warehouse state for drivers and displays.

use std::time::Duration;

use serde::Serialize;

use crate::{Item, ItemId, ItemType, Position, RobotId, RobotState, Warehouse};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotSnapshot {
    pub id: RobotId,
    pub position: Position,
    pub orientation: f64,
    pub radius: f64,
    pub state: RobotState,
    pub carried_item: Option<Item>,
    pub target: Option<Position>,
    pub movement_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub item_type: ItemType,
    pub position: Position,
    pub claimed_by: Option<RobotId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSnapshot {
    pub item_type: ItemType,
    pub position: Position,
    pub capacity: usize,
    pub items: Vec<ItemId>,
}

/// Everything a display needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseSnapshot {
    pub width: f64,
    pub height: f64,
    pub tick: u64,
    pub robots: Vec<RobotSnapshot>,
    /// Undelivered items, including those being carried.
    pub items: Vec<ItemSnapshot>,
    pub stacks: Vec<StackSnapshot>,
    pub task_completed: bool,
    pub completed_at_tick: Option<u64>,
    /// Wall-clock time since start, frozen once the task completes.
    pub elapsed: Duration,
}

impl WarehouseSnapshot {
    pub fn capture(warehouse: &Warehouse) -> Self {
        let robots = warehouse
            .robots()
            .iter()
            .map(|robot| RobotSnapshot {
                id: robot.id(),
                position: robot.position(),
                orientation: robot.orientation(),
                radius: robot.radius(),
                state: robot.state(),
                carried_item: robot.carried_item().copied(),
                target: robot.target(),
                movement_count: robot.movement_count(),
            })
            .collect();

        let items = warehouse
            .items()
            .map(|item| ItemSnapshot {
                id: item.id,
                item_type: item.item_type,
                position: item.position,
                claimed_by: warehouse.claimant(item.id),
            })
            .collect();

        let stacks = warehouse
            .stacks()
            .map(|stack| StackSnapshot {
                item_type: stack.item_type(),
                position: stack.position(),
                capacity: stack.capacity(),
                items: stack.items().iter().map(|item| item.id).collect(),
            })
            .collect();

        WarehouseSnapshot {
            width: warehouse.width(),
            height: warehouse.height(),
            tick: warehouse.tick_count(),
            robots,
            items,
            stacks,
            task_completed: warehouse.task_completed(),
            completed_at_tick: warehouse.completed_at_tick(),
            elapsed: warehouse.elapsed(),
        }
    }

    /// Number of items already deposited across all stacks.
    pub fn delivered(&self) -> usize {
        self.stacks.iter().map(|stack| stack.items.len()).sum()
    }

    /// Total movement count over all robots.
    pub fn total_movements(&self) -> u64 {
        self.robots.iter().map(|robot| robot.movement_count).sum()
    }
}
