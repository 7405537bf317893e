//! A guard that patrols until an intruder shows up, chases for a bounded time, then goes back to
//! patrolling.
//!
//! Run with `RUST_LOG=arbor_bt=debug cargo run -p arbor --example guard` to see node logs.

use arbor::core::BbKey;
use arbor::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const INTRUDER: BbKey<bool> = BbKey::new("intruder");
const PATROL_STEPS: BbKey<u32> = BbKey::new("patrol_steps");
const CHASE_TICKS: BbKey<u32> = BbKey::new("chase_ticks");

fn guard() -> Behavior {
    Behavior::build(|nodes| {
        let spotted = nodes.insert(Condition::new(|bb| bb.get(INTRUDER).unwrap_or(false)));
        let chase = nodes.insert(Action::new(|bb| {
            bb.set(CHASE_TICKS, bb.get(CHASE_TICKS).unwrap_or(0) + 1);
            BtStatus::Running
        }));
        let bounded = nodes.insert(Timeout::new(chase, 0.5));
        let pursue = nodes.insert(Sequence::new([spotted, bounded]));

        let wait = nodes.insert(Delay::new(0.3));
        let step = nodes.insert(Action::new(|bb| {
            bb.set(PATROL_STEPS, bb.get(PATROL_STEPS).unwrap_or(0) + 1);
            BtStatus::Success
        }));
        let patrol = nodes.insert(Sequence::new([wait, step]));

        let choose = nodes.insert(Selector::new([pursue, patrol]));
        nodes.insert(BlackboardWatcher::new(choose, INTRUDER.name(), WatchMode::OnValueChanged))
    })
}

fn main() -> Result<(), TreeError> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let registry = TreeRegistry::new();
    let mut tree = registry.create_tree_with(TreeConfig::default().with_initial_capacity(1), None)?;
    tree.on_node_status_changed(|node, status| tracing::info!(node = node.kind(), ?status, "root finished"));
    tree.add_node(guard())?;

    for tick in 1..=40u32 {
        match tick {
            10 => tree.blackboard().set(INTRUDER, true),
            30 => {
                tree.blackboard().remove(INTRUDER);
            }
            _ => {}
        }
        tree.update(0.1);
        if tick % 10 == 0 {
            tracing::info!(tick, active = ?tree.active_path(), "guard state");
        }
    }

    let bb = tree.blackboard();
    tracing::info!(
        patrol_steps = bb.get(PATROL_STEPS).unwrap_or(0),
        chase_ticks = bb.get(CHASE_TICKS).unwrap_or(0),
        "done"
    );
    println!("{tree}");
    Ok(())
}
