use warehouse_core::{ItemType, Position, RobotState, TickResult, Warehouse, WarehouseConfig};

fn small_warehouse() -> Warehouse {
    let config = WarehouseConfig {
        width: 100.0,
        height: 100.0,
        robot_count: 1,
        stack_margin: 30.0,
        ..Default::default()
    };
    Warehouse::empty(config).unwrap()
}

fn room() -> Warehouse {
    let config = WarehouseConfig {
        width: 400.0,
        height: 300.0,
        ..Default::default()
    };
    Warehouse::empty(config).unwrap()
}

#[test]
fn single_robot_delivers_single_item() {
    let mut warehouse = small_warehouse();
    warehouse
        .set_stack_position(ItemType::Tools, Position::new(30.0, 30.0))
        .unwrap();
    let robot_id = warehouse.add_robot(Position::new(10.0, 10.0)).unwrap();
    let item_id = warehouse
        .add_item(ItemType::Tools, Position::new(50.0, 50.0))
        .unwrap();

    let mut states = vec![warehouse.robots()[robot_id].state()];
    let mut completions = 0;
    for _ in 0..100 {
        if warehouse.tick() == TickResult::JustCompleted {
            completions += 1;
        }
        states.push(warehouse.robots()[robot_id].state());
    }
    states.dedup();

    assert_eq!(
        states,
        vec![
            RobotState::Idle,
            RobotState::Seeking,
            RobotState::Carrying,
            RobotState::Idle,
        ]
    );
    let stack = warehouse.stack(ItemType::Tools).unwrap();
    assert_eq!(stack.items().iter().map(|i| i.id).collect::<Vec<_>>(), vec![item_id]);
    assert_eq!(warehouse.items().count(), 0);
    assert!(warehouse.robots()[robot_id].carried_item().is_none());
    assert!(warehouse.task_completed());
    assert_eq!(completions, 1);
}

#[test]
fn only_one_robot_wins_a_contested_item() {
    let mut warehouse = room();
    warehouse.add_robot(Position::new(100.0, 150.0)).unwrap();
    warehouse.add_robot(Position::new(100.0, 190.0)).unwrap();
    let item_id = warehouse
        .add_item(ItemType::Food, Position::new(300.0, 170.0))
        .unwrap();

    let mut ever_carried = [false, false];
    for _ in 0..1000 {
        warehouse.tick();
        for robot in warehouse.robots() {
            if let Some(item) = robot.carried_item() {
                assert_eq!(item.id, item_id);
                ever_carried[robot.id()] = true;
            }
        }
    }

    assert_eq!(ever_carried.iter().filter(|carried| **carried).count(), 1);
    let loser = ever_carried.iter().position(|carried| !carried).unwrap();
    let loser = &warehouse.robots()[loser];
    assert_eq!(loser.state(), RobotState::Idle);
    assert_eq!(loser.target(), None);
    assert!(loser.carried_item().is_none());

    assert!(warehouse.task_completed());
    assert_eq!(warehouse.stack(ItemType::Food).unwrap().len(), 1);
}

#[test]
fn arriving_first_wins_over_earlier_assignment() {
    let mut warehouse = room();
    // Robot 0 is assigned first but robot 1 starts on top of the item.
    warehouse.add_robot(Position::new(100.0, 150.0)).unwrap();
    warehouse.add_robot(Position::new(300.0, 150.0)).unwrap();
    let item_id = warehouse
        .add_item(ItemType::Clothing, Position::new(300.0, 150.0))
        .unwrap();

    warehouse.tick();
    assert!(
        warehouse
            .robots()
            .iter()
            .all(|robot| robot.state() == RobotState::Seeking)
    );

    warehouse.tick();
    assert_eq!(warehouse.claimant(item_id), Some(1));
    assert_eq!(warehouse.robots()[1].state(), RobotState::Carrying);
    assert_eq!(warehouse.robots()[0].state(), RobotState::Seeking);
}

#[test]
fn simultaneous_arrival_goes_to_lower_id() {
    let mut warehouse = room();
    warehouse.add_robot(Position::new(190.0, 150.0)).unwrap();
    warehouse.add_robot(Position::new(210.0, 150.0)).unwrap();
    let item_id = warehouse
        .add_item(ItemType::Electronics, Position::new(200.0, 150.0))
        .unwrap();

    warehouse.tick();
    warehouse.tick();

    assert_eq!(warehouse.claimant(item_id), Some(0));
    assert_eq!(warehouse.robots()[0].state(), RobotState::Carrying);
    assert_eq!(warehouse.robots()[1].state(), RobotState::Idle);
    assert_eq!(warehouse.robots()[1].target(), None);
}

#[test]
fn full_stack_leaves_item_stranded() {
    let config = WarehouseConfig::default();
    let mut warehouse = Warehouse::empty(config).unwrap();
    warehouse.preload_stack(ItemType::Tools, 5).unwrap();
    let robot_id = warehouse.add_robot(Position::new(400.0, 400.0)).unwrap();
    let item_id = warehouse
        .add_item(ItemType::Tools, Position::new(500.0, 400.0))
        .unwrap();

    let mut saw_carrying = false;
    for _ in 0..400 {
        warehouse.tick();
        saw_carrying |= warehouse.robots()[robot_id].state() == RobotState::Carrying;
    }

    assert!(saw_carrying);
    let robot = &warehouse.robots()[robot_id];
    assert_eq!(robot.state(), RobotState::Idle);
    assert_eq!(robot.carried_item().map(|item| item.id), Some(item_id));
    assert_eq!(warehouse.stack(ItemType::Tools).unwrap().len(), 5);
    assert!(!warehouse.task_completed());

    let parked_at = robot.position();
    for _ in 0..50 {
        warehouse.tick();
    }
    let robot = &warehouse.robots()[robot_id];
    assert_eq!(robot.position(), parked_at);
    assert_eq!(robot.carried_item().map(|item| item.id), Some(item_id));
}

#[test]
fn default_warehouse_finishes() {
    let config = WarehouseConfig {
        seed: Some(2024),
        ..Default::default()
    };
    let mut warehouse = Warehouse::new(config).unwrap();
    let mut ticks = 0;
    while !warehouse.task_completed() && ticks < 20_000 {
        warehouse.tick();
        ticks += 1;
    }

    assert!(warehouse.task_completed());
    let snapshot = warehouse.snapshot();
    assert_eq!(snapshot.delivered(), 20);
    assert!(snapshot.stacks.iter().all(|stack| stack.items.len() == 5));
    assert!(snapshot.total_movements() > 0);
    assert_eq!(snapshot.completed_at_tick, Some(ticks));
}
