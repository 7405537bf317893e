mod common;

use arbor_bt::{
    Behavior, BtStatus, FailureHandling, ForceResult, Inverter, NodeId, RepeatMode, Repeater, RepeaterData,
    ResetMode, Timeout, TimeoutData,
};
use common::{board, tick, Scripted};

use BtStatus::{Failure, Running, Success};

fn scripted(behavior: &Behavior, id: NodeId) -> &Scripted {
    behavior.nodes().downcast_ref::<Scripted>(id).unwrap()
}

#[test]
fn inverter_swaps_terminal_statuses() {
    let bb = board();
    for (child, expected) in [(Success, Failure), (Failure, Success), (Running, Running)] {
        let mut behavior = Behavior::build(|nodes| {
            let child = nodes.insert(Scripted::always(child));
            nodes.insert(Inverter::new(child))
        });
        assert_eq!(behavior.run(&tick(1), &bb), expected);
    }
}

#[test]
fn force_result_passes_running_through() {
    let bb = board();
    let mut forced = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Running, Failure]));
        nodes.insert(ForceResult::success(child))
    });
    assert_eq!(forced.run(&tick(1), &bb), Running);
    assert_eq!(forced.run(&tick(2), &bb), Success);
    assert_eq!(forced.root_node().unwrap().kind(), "ForceSuccess");

    let mut failing = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Success));
        nodes.insert(ForceResult::failure(child))
    });
    assert_eq!(failing.run(&tick(1), &bb), Failure);
}

#[test]
fn count_limited_repeater_succeeds_on_the_run_after_the_last_iteration() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Success));
        nodes.insert(Repeater::new(child, RepeatMode::CountLimited(2)))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Running);
    assert_eq!(behavior.run(&tick(3), &bb), Success);

    let child = scripted(&behavior, NodeId(0));
    assert_eq!(child.runs, 2);
    assert_eq!(child.resets, vec![ResetMode::Partial, ResetMode::Partial]);
}

#[test]
fn zero_count_repeater_fails() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Success));
        nodes.insert(Repeater::new(child, RepeatMode::CountLimited(0)))
    });
    assert_eq!(behavior.run(&tick(1), &board()), Failure);
}

#[test]
fn until_success_repeater_stops_after_a_success() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Failure, Success]));
        nodes.insert(Repeater::new(child, RepeatMode::UntilSuccess))
    });
    let bb = board();

    // The child's partial reset after each iteration rewinds its script.
    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Running);
    assert_eq!(behavior.run(&tick(3), &bb), Running);

    let mut flipping = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Success));
        nodes.insert(Repeater::new(child, RepeatMode::UntilSuccess))
    });
    assert_eq!(flipping.run(&tick(1), &bb), Running);
    assert_eq!(flipping.run(&tick(2), &bb), Success);
}

#[test]
fn repeater_reads_its_data_from_the_blackboard() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Success));
        nodes.insert(Repeater::new(child, RepeatMode::Infinite).with_data_key("repeat"))
    });
    let bb = board();
    bb.set_value(
        "repeat",
        RepeaterData {
            child: Some(NodeId(0)),
            mode: RepeatMode::CountLimited(1),
        },
    );

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
    let repeater = behavior.nodes().downcast_ref::<Repeater>(behavior.root()).unwrap();
    assert_eq!(repeater.data().mode, RepeatMode::CountLimited(1));
}

#[test]
fn timeout_fails_stickily_and_resets_the_child() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Running));
        nodes.insert(Timeout::new(child, 0.25))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Running);
    assert_eq!(behavior.run(&tick(3), &bb), Failure);
    assert_eq!(behavior.run(&tick(4), &bb), Failure);

    let child = scripted(&behavior, NodeId(0));
    assert_eq!(child.runs, 3);
    assert_eq!(child.resets, vec![ResetMode::Partial]);

    behavior.reset(&bb, ResetMode::Full);
    assert_eq!(behavior.run(&tick(5), &bb), Running);
}

#[test]
fn timeout_keeps_failing_when_the_child_would_succeed() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Running, Running, Running, Success]));
        nodes.insert(Timeout::new(child, 0.25))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Running);
    assert_eq!(behavior.run(&tick(3), &bb), Failure);
    // The child's next scripted result is Success, but it is never asked.
    assert_eq!(behavior.run(&tick(4), &bb), Failure);
    assert_eq!(behavior.run(&tick(5), &bb), Failure);
    assert_eq!(scripted(&behavior, NodeId(0)).runs, 3);

    let timeout = behavior.nodes().downcast_ref::<Timeout>(behavior.root()).unwrap();
    assert!(timeout.is_timed_out());
}

#[test]
fn timeout_passes_child_results_before_expiry() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Running, Success]));
        nodes.insert(Timeout::new(child, 1.0))
    });
    let bb = board();
    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
}

#[test]
fn timeout_without_duration_fails() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Running));
        nodes.insert(Timeout::from_data(TimeoutData {
            child: Some(child),
            duration: 0.0,
        }))
    });
    assert_eq!(behavior.run(&tick(1), &board()), Failure);
}

#[test]
fn soft_reset_keeps_the_timeout_clock() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Running));
        nodes.insert(Timeout::new(child, 0.25))
    });
    let bb = board();
    behavior.run(&tick(1), &bb);
    behavior.run(&tick(2), &bb);
    behavior.reset(&bb, ResetMode::Soft);

    let timeout = behavior.nodes().downcast_ref::<Timeout>(behavior.root()).unwrap();
    assert!(timeout.elapsed() > 0.15);
    assert_eq!(behavior.run(&tick(3), &bb), Failure);
}

#[test]
fn skip_turns_the_first_failure_into_success() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Failure));
        nodes.insert(FailureHandling::skip(child))
    });
    let bb = board();
    assert_eq!(behavior.run(&tick(1), &bb), Success);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
}

#[test]
fn throw_fails_without_retrying_the_policy() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Failure, Success, Failure]));
        nodes.insert(FailureHandling::throw(child))
    });
    let bb = board();
    assert_eq!(behavior.run(&tick(1), &bb), Failure);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
    assert_eq!(behavior.run(&tick(3), &bb), Failure);
    let node = behavior.nodes().downcast_ref::<FailureHandling>(behavior.root()).unwrap();
    assert!(node.has_handled_failure());
}

#[test]
fn catch_keeps_running_the_fallback() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::always(Failure));
        let fallback = nodes.insert(Scripted::new([Running, Running, Success]));
        nodes.insert(FailureHandling::catch(child, fallback))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.active_paths(), vec!["FailureHandling.Scripted".to_string()]);
    assert_eq!(behavior.run(&tick(2), &bb), Running);
    assert_eq!(behavior.run(&tick(3), &bb), Success);
    // Handled: the fallback is not run again.
    assert_eq!(behavior.run(&tick(4), &bb), Success);
    assert_eq!(scripted(&behavior, NodeId(1)).runs, 3);

    behavior.reset(&bb, ResetMode::Full);
    assert_eq!(behavior.run(&tick(5), &bb), Running);
    assert_eq!(scripted(&behavior, NodeId(1)).runs, 4);
}

#[test]
fn catch_rewinds_a_fallback_the_child_recovered_from() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Failure, Success, Failure]));
        let fallback = nodes.insert(Scripted::new([Running, Success]));
        nodes.insert(FailureHandling::catch(child, fallback))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Running);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
    assert_eq!(scripted(&behavior, NodeId(1)).resets, vec![ResetMode::Partial]);
    assert_eq!(behavior.active_paths(), vec!["FailureHandling".to_string()]);

    // The fallback starts over instead of picking up its second step.
    assert_eq!(behavior.run(&tick(3), &bb), Running);
    assert_eq!(scripted(&behavior, NodeId(1)).runs, 2);
}

#[test]
fn catch_leaves_a_finished_fallback_alone() {
    let mut behavior = Behavior::build(|nodes| {
        let child = nodes.insert(Scripted::new([Failure, Success]));
        let fallback = nodes.insert(Scripted::always(Success));
        nodes.insert(FailureHandling::catch(child, fallback))
    });
    let bb = board();

    assert_eq!(behavior.run(&tick(1), &bb), Success);
    assert_eq!(behavior.run(&tick(2), &bb), Success);
    assert!(scripted(&behavior, NodeId(1)).resets.is_empty());
}
