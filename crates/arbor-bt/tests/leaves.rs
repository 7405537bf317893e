mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arbor_bt::{Action, Behavior, BtStatus, Condition, Delay, DelayResetMode, ResetMode, Sequence, TreeRegistry, Wait};
use common::{board, tick};

use BtStatus::{Failure, Running, Success};

#[test]
fn action_reports_its_callback_status() {
    let bb = board();
    bb.set_value("ready", true);
    let mut action = Behavior::from(Action::new(|bb| {
        if bb.get_value("ready", false) {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }));
    assert_eq!(action.run(&tick(1), &bb), Success);

    let mut empty = Behavior::from(Action::empty());
    assert_eq!(empty.run(&tick(1), &bb), Failure);
}

#[test]
fn condition_maps_its_predicate() {
    let bb = board();
    bb.set_value("hp", 5);
    let mut alive = Behavior::from(Condition::new(|bb| bb.get_value("hp", 0) > 0));
    let mut dead = Behavior::from(Condition::new(|bb| bb.get_value("hp", 0) <= 0));
    let mut missing = Behavior::from(Condition::empty());

    assert_eq!(alive.run(&tick(1), &bb), Success);
    assert_eq!(dead.run(&tick(1), &bb), Failure);
    assert_eq!(missing.run(&tick(1), &bb), Failure);
}

#[test]
fn delay_then_action_fires_once_after_the_wait() {
    let counter = Arc::new(AtomicU32::new(0));
    let hits = counter.clone();
    let mut behavior = Behavior::build(|nodes| {
        let wait = nodes.insert(Delay::new(0.5));
        let act = nodes.insert(Action::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            BtStatus::Success
        }));
        nodes.insert(Sequence::new([wait, act]))
    });
    let bb = board();

    for n in 1..=4 {
        assert_eq!(behavior.run(&tick(n), &bb), Running, "tick {n}");
    }
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(behavior.run(&tick(5), &bb), Success);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Nothing reset the delay, so it stays complete.
    assert_eq!(behavior.run(&tick(6), &bb), Success);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn delay_in_a_tree_restarts_after_the_tree_resets() {
    let registry = TreeRegistry::new();
    let mut tree = registry.create_tree(1, None);
    tree.add_node(Behavior::build(|nodes| {
        let wait = nodes.insert(Delay::new(0.5));
        let act = nodes.insert(Action::new(|bb| {
            bb.set_value("fired", bb.get_value("fired", 0u32) + 1);
            BtStatus::Success
        }));
        nodes.insert(Sequence::new([wait, act]))
    }))
    .unwrap();

    for _ in 0..5 {
        tree.update(0.1);
    }
    assert_eq!(tree.blackboard().get_value("fired", 0u32), 1);
    assert_eq!(tree.resume_index(), None);

    tree.update(0.1);
    assert_eq!(tree.node_status(0), Some(Running));
    assert_eq!(tree.blackboard().get_value("fired", 0u32), 1);
}

#[test]
fn non_positive_durations_fail() {
    let bb = board();
    assert_eq!(Behavior::from(Delay::new(0.0)).run(&tick(1), &bb), Failure);
    assert_eq!(Behavior::from(Wait::new(-1.0)).run(&tick(1), &bb), Failure);
}

#[test]
fn delay_reset_modes() {
    let bb = board();

    let mut restart = Behavior::from(Delay::new(0.2));
    restart.run(&tick(1), &bb);
    assert_eq!(restart.run(&tick(2), &bb), Success);
    restart.reset(&bb, ResetMode::Partial);
    assert_eq!(restart.run(&tick(3), &bb), Running);

    let mut once = Behavior::from(Delay::new(0.2).with_reset_mode(DelayResetMode::Once));
    once.run(&tick(1), &bb);
    assert_eq!(once.run(&tick(2), &bb), Success);
    once.reset(&bb, ResetMode::Full);
    assert_eq!(once.run(&tick(3), &bb), Success);

    let mut soft = Behavior::from(Delay::new(0.2));
    soft.run(&tick(1), &bb);
    soft.reset(&bb, ResetMode::Soft);
    assert_eq!(soft.run(&tick(2), &bb), Success);
    let delay = soft.nodes().downcast_ref::<Delay>(soft.root()).unwrap();
    assert!(delay.is_completed());
}
