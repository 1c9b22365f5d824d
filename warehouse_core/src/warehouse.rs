use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::{
    Item, ItemId, ItemType, Position, RobotId, WarehouseConfig,
    robot::{Robot, RobotState},
    snapshot::WarehouseSnapshot,
    stack::Stack,
};

/// Errors raised while building a warehouse. Ticking never fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WarehouseError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },
    #[error("position {position} lies outside the {width}x{height} warehouse")]
    PositionOutOfBounds {
        position: Position,
        width: f64,
        height: f64,
    },
    #[error(
        "the {item_type} stack holds {len} of {capacity} items and cannot take {requested} more"
    )]
    StackFull {
        item_type: ItemType,
        len: usize,
        capacity: usize,
        requested: usize,
    },
    #[error("the warehouse layout is fixed once ticking starts (tick {tick})")]
    LayoutLocked { tick: u64 },
}

/// Outcome of a single [`Warehouse::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Items remain to be delivered.
    InProgress,
    /// The last item was delivered during this tick.
    JustCompleted,
    /// The task had already been completed before this tick.
    Finished,
}

/// An item waiting for delivery, possibly already claimed by a robot on its way to a stack.
#[derive(Debug, Clone, PartialEq)]
struct PendingItem {
    item: Item,
    claimed_by: Option<RobotId>,
}

/// The warehouse floor: every robot, every undelivered item and one stack per item type.
///
/// Robots are evaluated in ascending id order on every tick. When two robots
/// race for the same item, the one evaluated first wins.
#[derive(Debug)]
pub struct Warehouse {
    config: WarehouseConfig,
    robots: Vec<Robot>,
    items: Vec<PendingItem>,
    stacks: BTreeMap<ItemType, Stack>,
    next_item_id: ItemId,
    tick_count: u64,
    start_time: Instant,
    end_time: Option<Instant>,
    completed_at_tick: Option<u64>,
    task_completed: bool,
}

impl Warehouse {
    /// Creates a warehouse with randomly placed robots and items.
    ///
    /// `config.robot_count` robots spawn anywhere their body fits, and
    /// `config.items_per_type` items of every type are scattered on whole
    /// coordinates at least `config.item_margin` away from the walls.
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut warehouse = Self::empty(config)?;

        let min = warehouse.config.min_robot_position();
        let max = warehouse.config.max_robot_position();
        for _ in 0..warehouse.config.robot_count {
            let position = Position::new(
                rng.random_range(min.x..=max.x),
                rng.random_range(min.y..=max.y),
            );
            warehouse.add_robot(position)?;
        }

        let margin = warehouse.config.item_margin;
        let (width, height) = (warehouse.config.width, warehouse.config.height);
        for item_type in ItemType::ALL {
            for _ in 0..warehouse.config.items_per_type {
                let position = Position::new(
                    random_coordinate(&mut rng, margin, width - margin),
                    random_coordinate(&mut rng, margin, height - margin),
                );
                warehouse.add_item(item_type, position)?;
            }
        }

        info!(
            robots = warehouse.robots.len(),
            items = warehouse.items.len(),
            seed = ?warehouse.config.seed,
            "warehouse initialized"
        );
        Ok(warehouse)
    }

    /// Creates a warehouse with corner stacks but no robots or items.
    ///
    /// `robot_count` and `items_per_type` are ignored; populate the floor with
    /// [`add_robot`](Self::add_robot) and [`add_item`](Self::add_item).
    pub fn empty(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        config.validate()?;

        let margin = config.stack_margin;
        let corners = [
            Position::new(margin, margin),
            Position::new(config.width - margin, margin),
            Position::new(margin, config.height - margin),
            Position::new(config.width - margin, config.height - margin),
        ];
        let stacks = ItemType::ALL
            .into_iter()
            .zip(corners)
            .map(|(item_type, position)| {
                (item_type, Stack::new(position, item_type, config.stack_capacity))
            })
            .collect();

        Ok(Warehouse {
            config,
            robots: Vec::new(),
            items: Vec::new(),
            stacks,
            next_item_id: 0,
            tick_count: 0,
            start_time: Instant::now(),
            end_time: None,
            completed_at_tick: None,
            task_completed: false,
        })
    }

    /// Adds an idle robot and returns its id. Ids follow insertion order.
    ///
    /// The position is clamped so the robot body lies inside the walls.
    pub fn add_robot(&mut self, position: Position) -> Result<RobotId, WarehouseError> {
        self.check_layout_open()?;
        self.check_bounds(position)?;
        let id = self.robots.len();
        self.robots.push(Robot::new(id, position, &self.config));
        Ok(id)
    }

    /// Places a new item on the floor and returns its id.
    pub fn add_item(
        &mut self,
        item_type: ItemType,
        position: Position,
    ) -> Result<ItemId, WarehouseError> {
        self.check_layout_open()?;
        self.check_bounds(position)?;
        let item = Item {
            id: self.reserve_item_id(),
            item_type,
            position,
        };
        self.items.push(PendingItem {
            item,
            claimed_by: None,
        });
        Ok(item.id)
    }

    /// Moves the stack for `item_type`. Stacks stay put once ticking starts.
    pub fn set_stack_position(
        &mut self,
        item_type: ItemType,
        position: Position,
    ) -> Result<(), WarehouseError> {
        self.check_layout_open()?;
        self.check_bounds(position)?;
        if let Some(stack) = self.stacks.get_mut(&item_type) {
            stack.set_position(position);
        }
        Ok(())
    }

    /// Deposits `count` fresh items straight onto the stack for `item_type`.
    pub fn preload_stack(
        &mut self,
        item_type: ItemType,
        count: usize,
    ) -> Result<Vec<ItemId>, WarehouseError> {
        self.check_layout_open()?;
        let first_id = self.next_item_id;
        let Some(stack) = self.stacks.get_mut(&item_type) else {
            return Ok(Vec::new());
        };
        let position = stack.position();
        let items: Vec<Item> = (first_id..first_id + count)
            .map(|id| Item {
                id,
                item_type,
                position,
            })
            .collect();
        let ids = items.iter().map(|item| item.id).collect();

        stack
            .try_extend(items)
            .map_err(|_| WarehouseError::StackFull {
                item_type,
                len: stack.len(),
                capacity: stack.capacity(),
                requested: count,
            })?;
        self.next_item_id += count;
        Ok(ids)
    }

    /// Advances the simulation by one step.
    pub fn tick(&mut self) -> TickResult {
        self.tick_count += 1;

        for index in 0..self.robots.len() {
            match self.robots[index].state {
                RobotState::Idle => self.assign_nearest_item(index),
                RobotState::Seeking => self.seek(index),
                RobotState::Carrying => self.carry(index),
                RobotState::Stacking => {}
            }
        }

        if self.task_completed {
            return TickResult::Finished;
        }
        if self.items.is_empty() && self.robots.iter().all(|r| r.carried_item.is_none()) {
            self.task_completed = true;
            self.end_time = Some(Instant::now());
            self.completed_at_tick = Some(self.tick_count);
            info!(
                ticks = self.tick_count,
                elapsed_ms = self.elapsed().as_millis() as u64,
                "all items delivered"
            );
            return TickResult::JustCompleted;
        }
        TickResult::InProgress
    }

    /// Points an idle robot at the nearest unclaimed item.
    fn assign_nearest_item(&mut self, index: usize) {
        let robot = &mut self.robots[index];
        if robot.carried_item.is_some() {
            // Stranded at a full stack. Unlike a plain reassignment loop, the
            // robot is never handed new work, so its item is not overwritten.
            return;
        }

        let origin = robot.position;
        let nearest = self
            .items
            .iter()
            .filter(|pending| pending.claimed_by.is_none())
            .min_by(|a, b| {
                origin
                    .distance(a.item.position)
                    .total_cmp(&origin.distance(b.item.position))
            });

        if let Some(pending) = nearest {
            debug!(
                robot = robot.id,
                item = pending.item.id,
                target = %pending.item.position,
                "seeking item"
            );
            robot.target = Some(pending.item.position);
            robot.state = RobotState::Seeking;
        }
    }

    fn seek(&mut self, index: usize) {
        let neighbors = self.neighbor_positions(index);
        let robot = &mut self.robots[index];
        if !robot.advance(&neighbors) {
            return;
        }

        let target = robot.target;
        let claimable = self.items.iter_mut().find(|pending| {
            pending.claimed_by.is_none() && Some(pending.item.position) == target
        });

        match claimable {
            Some(pending) => {
                pending.claimed_by = Some(robot.id);
                let item = pending.item;
                robot.carried_item = Some(item);
                robot.target = self.stacks.get(&item.item_type).map(Stack::position);
                robot.state = RobotState::Carrying;
                debug!(robot = robot.id, item = item.id, "claimed item");
            }
            None => {
                debug!(robot = robot.id, "item already taken");
                robot.target = None;
                robot.state = RobotState::Idle;
            }
        }
    }

    fn carry(&mut self, index: usize) {
        let neighbors = self.neighbor_positions(index);
        let robot = &mut self.robots[index];
        if !robot.advance(&neighbors) {
            return;
        }

        robot.target = None;
        robot.state = RobotState::Idle;

        let Some(item) = robot.carried_item else {
            return;
        };
        let Some(stack) = self.stacks.get_mut(&item.item_type) else {
            return;
        };
        match stack.try_push(item) {
            Ok(()) => {
                self.items.retain(|pending| pending.item.id != item.id);
                robot.carried_item = None;
                debug!(
                    robot = robot.id,
                    item = item.id,
                    stack = %item.item_type,
                    height = stack.len(),
                    "deposited item"
                );
            }
            Err(item) => {
                warn!(
                    robot = robot.id,
                    item = item.id,
                    stack = %item.item_type,
                    "stack full, item stranded on robot"
                );
            }
        }
    }

    /// Current positions of every robot except the one at `index`.
    fn neighbor_positions(&self, index: usize) -> Vec<Position> {
        self.robots
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, robot)| robot.position)
            .collect()
    }

    fn reserve_item_id(&mut self) -> ItemId {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    fn check_layout_open(&self) -> Result<(), WarehouseError> {
        if self.tick_count > 0 {
            return Err(WarehouseError::LayoutLocked {
                tick: self.tick_count,
            });
        }
        Ok(())
    }

    fn check_bounds(&self, position: Position) -> Result<(), WarehouseError> {
        let inside = position.x.is_finite()
            && position.y.is_finite()
            && (0.0..=self.config.width).contains(&position.x)
            && (0.0..=self.config.height).contains(&position.y);
        if inside {
            Ok(())
        } else {
            Err(WarehouseError::PositionOutOfBounds {
                position,
                width: self.config.width,
                height: self.config.height,
            })
        }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    /// Robots in evaluation order.
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(id)
    }

    /// Every item not yet deposited, including items robots are carrying.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().map(|pending| &pending.item)
    }

    /// Items lying on the floor that no robot has claimed.
    pub fn available_items(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|pending| pending.claimed_by.is_none())
            .map(|pending| &pending.item)
    }

    /// The robot holding `item_id`, if it is claimed and not yet deposited.
    pub fn claimant(&self, item_id: ItemId) -> Option<RobotId> {
        self.items
            .iter()
            .find(|pending| pending.item.id == item_id)
            .and_then(|pending| pending.claimed_by)
    }

    /// Stacks in item type order.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    pub fn stack(&self, item_type: ItemType) -> Option<&Stack> {
        self.stacks.get(&item_type)
    }

    pub fn task_completed(&self) -> bool {
        self.task_completed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn completed_at_tick(&self) -> Option<u64> {
        self.completed_at_tick
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    /// Wall-clock time since creation, frozen once the task completes.
    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    pub fn snapshot(&self) -> WarehouseSnapshot {
        WarehouseSnapshot::capture(self)
    }
}

/// A whole coordinate in `[low, high]`, or `low` when the range holds none.
fn random_coordinate(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    let low = low.ceil() as i64;
    let high = (high.floor() as i64).max(low);
    rng.random_range(low..=high) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WarehouseConfig {
        WarehouseConfig {
            width: 400.0,
            height: 300.0,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_places_corner_stacks() {
        let warehouse = Warehouse::empty(config()).unwrap();
        let positions: Vec<_> = warehouse
            .stacks()
            .map(|s| (s.item_type(), s.position()))
            .collect();
        assert_eq!(
            positions,
            vec![
                (ItemType::Electronics, Position::new(70.0, 70.0)),
                (ItemType::Clothing, Position::new(330.0, 70.0)),
                (ItemType::Food, Position::new(70.0, 230.0)),
                (ItemType::Tools, Position::new(330.0, 230.0)),
            ]
        );
        assert!(warehouse.robots().is_empty());
        assert_eq!(warehouse.items().count(), 0);
    }

    #[test]
    fn test_new_scatters_robots_and_items() {
        let warehouse = Warehouse::new(config()).unwrap();
        assert_eq!(warehouse.robots().len(), 5);
        assert_eq!(warehouse.items().count(), 20);
        for robot in warehouse.robots() {
            let p = robot.position();
            assert!((20.0..=380.0).contains(&p.x) && (20.0..=280.0).contains(&p.y));
        }
        for item in warehouse.items() {
            let p = item.position;
            assert_eq!(p.x.fract(), 0.0);
            assert_eq!(p.y.fract(), 0.0);
            assert!((50.0..=350.0).contains(&p.x) && (50.0..=250.0).contains(&p.y));
        }
        let ids: Vec<_> = warehouse.robots().iter().map(Robot::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_new_rejects_invalid_configuration() {
        let result = Warehouse::new(WarehouseConfig {
            robot_count: 0,
            ..config()
        });
        assert!(matches!(
            result,
            Err(WarehouseError::InvalidConfiguration { field: "robot_count", .. })
        ));
    }

    #[test]
    fn test_add_outside_bounds_fails() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        assert!(matches!(
            warehouse.add_item(ItemType::Food, Position::new(401.0, 10.0)),
            Err(WarehouseError::PositionOutOfBounds { .. })
        ));
        assert!(warehouse.add_robot(Position::new(-1.0, 10.0)).is_err());
        assert!(
            warehouse
                .set_stack_position(ItemType::Food, Position::new(0.0, f64::NAN))
                .is_err()
        );
    }

    #[test]
    fn test_idle_robot_targets_nearest_item_first_on_ties() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.add_robot(Position::new(200.0, 150.0)).unwrap();
        warehouse.add_item(ItemType::Food, Position::new(300.0, 150.0)).unwrap();
        warehouse.add_item(ItemType::Tools, Position::new(250.0, 150.0)).unwrap();
        warehouse.add_item(ItemType::Clothing, Position::new(150.0, 150.0)).unwrap();

        assert_eq!(warehouse.tick(), TickResult::InProgress);
        let robot = &warehouse.robots()[0];
        assert_eq!(robot.state(), RobotState::Seeking);
        assert_eq!(robot.target(), Some(Position::new(250.0, 150.0)));
        // Assignment alone does not move the robot.
        assert_eq!(robot.position(), Position::new(200.0, 150.0));
    }

    #[test]
    fn test_idle_robot_without_items_stays_parked() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.add_robot(Position::new(200.0, 150.0)).unwrap();
        for _ in 0..3 {
            warehouse.tick();
        }
        let robot = &warehouse.robots()[0];
        assert_eq!(robot.state(), RobotState::Idle);
        assert_eq!(robot.target(), None);
    }

    #[test]
    fn test_completion_is_recorded_once() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.add_robot(Position::new(200.0, 150.0)).unwrap();
        assert!(!warehouse.task_completed());

        assert_eq!(warehouse.tick(), TickResult::JustCompleted);
        let end_time = warehouse.end_time();
        assert!(end_time.is_some());
        assert_eq!(warehouse.completed_at_tick(), Some(1));

        assert_eq!(warehouse.tick(), TickResult::Finished);
        assert!(warehouse.task_completed());
        assert_eq!(warehouse.end_time(), end_time);
        assert_eq!(warehouse.completed_at_tick(), Some(1));
        assert_eq!(warehouse.elapsed(), warehouse.elapsed());
    }

    #[test]
    fn test_preload_respects_capacity() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        assert_eq!(warehouse.preload_stack(ItemType::Tools, 4).unwrap().len(), 4);
        assert_eq!(
            warehouse.preload_stack(ItemType::Tools, 2),
            Err(WarehouseError::StackFull {
                item_type: ItemType::Tools,
                len: 4,
                capacity: 5,
                requested: 2,
            })
        );
        assert_eq!(warehouse.stack(ItemType::Tools).unwrap().len(), 4);
    }

    #[test]
    fn test_preload_ids_continue_after_floor_items() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.add_item(ItemType::Food, Position::new(100.0, 100.0)).unwrap();
        assert_eq!(warehouse.preload_stack(ItemType::Tools, 2).unwrap(), vec![1, 2]);
        assert_eq!(
            warehouse.add_item(ItemType::Food, Position::new(120.0, 100.0)),
            Ok(3)
        );
    }

    #[test]
    fn test_layout_is_locked_once_ticking_starts() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.add_robot(Position::new(300.0, 200.0)).unwrap();
        warehouse.add_item(ItemType::Tools, Position::new(310.0, 210.0)).unwrap();
        let stack_at = warehouse.stack(ItemType::Tools).unwrap().position();

        warehouse.tick();
        warehouse.tick();
        assert_eq!(warehouse.robots()[0].state(), RobotState::Carrying);

        let locked = Err(WarehouseError::LayoutLocked { tick: 2 });
        assert_eq!(
            warehouse.set_stack_position(ItemType::Tools, Position::new(30.0, 30.0)),
            locked
        );
        assert_eq!(
            warehouse.add_item(ItemType::Food, Position::new(100.0, 100.0)),
            Err(WarehouseError::LayoutLocked { tick: 2 })
        );
        assert_eq!(
            warehouse.add_robot(Position::new(100.0, 100.0)),
            Err(WarehouseError::LayoutLocked { tick: 2 })
        );
        assert_eq!(
            warehouse.preload_stack(ItemType::Food, 1),
            Err(WarehouseError::LayoutLocked { tick: 2 })
        );
        assert_eq!(warehouse.stack(ItemType::Tools).unwrap().position(), stack_at);
        assert_eq!(warehouse.robots()[0].target(), Some(stack_at));

        while warehouse.tick() != TickResult::JustCompleted {}
        assert!(
            warehouse
                .add_item(ItemType::Food, Position::new(100.0, 100.0))
                .is_err()
        );
        assert_eq!(warehouse.items().count(), 0);
        assert!(warehouse.task_completed());
    }

    #[test]
    fn test_full_stack_strands_item_on_robot() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        warehouse.preload_stack(ItemType::Tools, 5).unwrap();
        let robot_id = warehouse.add_robot(Position::new(300.0, 200.0)).unwrap();
        let item_id = warehouse
            .add_item(ItemType::Tools, Position::new(310.0, 210.0))
            .unwrap();
        warehouse.add_item(ItemType::Food, Position::new(100.0, 200.0)).unwrap();

        // Hand the robot its item directly so it heads straight for the full stack.
        warehouse.items[0].claimed_by = Some(robot_id);
        let robot = &mut warehouse.robots[robot_id];
        robot.carried_item = Some(warehouse.items[0].item);
        robot.target = warehouse.stacks.get(&ItemType::Tools).map(Stack::position);
        robot.state = RobotState::Carrying;

        for _ in 0..200 {
            warehouse.tick();
        }

        let robot = &warehouse.robots()[robot_id];
        assert_eq!(robot.state(), RobotState::Idle);
        assert_eq!(robot.target(), None);
        assert_eq!(robot.carried_item().map(|item| item.id), Some(item_id));
        assert_eq!(warehouse.stack(ItemType::Tools).unwrap().len(), 5);
        assert_eq!(warehouse.claimant(item_id), Some(robot_id));
        // The food item is never picked up by the stranded robot.
        assert_eq!(warehouse.available_items().count(), 1);
        assert!(!warehouse.task_completed());
    }

    #[test]
    fn test_stacking_robot_is_left_alone() {
        let mut warehouse = Warehouse::empty(config()).unwrap();
        let id = warehouse.add_robot(Position::new(200.0, 150.0)).unwrap();
        warehouse.add_item(ItemType::Food, Position::new(300.0, 150.0)).unwrap();
        warehouse.robots[id].state = RobotState::Stacking;
        warehouse.robots[id].target = Some(Position::new(300.0, 150.0));

        warehouse.tick();
        let robot = &warehouse.robots()[id];
        assert_eq!(robot.state(), RobotState::Stacking);
        assert_eq!(robot.position(), Position::new(200.0, 150.0));
    }
}
