//! Engine binary for the Volition action framework.
//!
//! Wires a simulated robot, the action queue, and a scripted vision
//! source into a bounded tick loop. The demo scenario queues a head move
//! and a drive-out sequence (which run in parallel on disjoint locks),
//! then a retry-wrapped search that claims both subsystems; a scripted
//! sighting lets the search succeed, or, when disabled, exhaust its
//! retries.
//!
//! # Startup sequence
//!
//! 1. Load configuration from `volition-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the bus, the completion log, and the simulated robot
//! 4. Queue the demo scenario
//! 5. Run the tick loop until the queue drains or the budget runs out
//! 6. Log the result

mod config;
mod error;
mod vision;

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use volition_actions::{
    DriveStraightAction, MoveHeadToAngleAction, SearchForNearbyObjectAction, TurnInPlaceAction,
    WaitAction,
};
use volition_bus::{EventBus, Subscription};
use volition_core::{ActionNode, CompoundAction, EngineState, RetryAction, run_until_settled};
use volition_robot::Robot;
use volition_types::{Event, ObjectId, RobotId};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::vision::ScriptedVision;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        tick_step_ms = config.control.tick_step_ms,
        max_ticks = config.control.max_ticks,
        "volition-engine starting"
    );

    // 3. Create the bus, the completion log, and the simulated robot.
    let bus = EventBus::new();
    let _completion_log = log_completions(&bus);
    let robot = Robot::new(
        RobotId::new(),
        Duration::from_millis(config.control.tick_step_ms),
        config.motion,
        bus.clone(),
    )
    .map_err(EngineError::from)?;
    info!(robot = %robot.id(), "robot initialized");

    // 4. Queue the demo scenario.
    let mut state = EngineState::new(robot);
    let object_id = ObjectId::new();
    queue_demo(&mut state, &config, object_id);
    let mut vision = ScriptedVision::new(object_id, config.demo.observe_object_at_tick);
    info!(
        object = %object_id,
        observe_at_tick = config.demo.observe_object_at_tick,
        pending = state.actions.pending_count(),
        "demo scenario queued"
    );

    // 5. Run the tick loop.
    let outcome = run_until_settled(
        &mut state,
        config.control.max_ticks,
        Duration::from_millis(config.control.tick_interval_ms),
        &mut vision,
    )
    .map_err(EngineError::from)?;

    // 6. Log the result.
    info!(
        reason = ?outcome.reason,
        ticks = outcome.ticks,
        completed = outcome.completed,
        "volition-engine shutdown complete"
    );
    Ok(())
}

/// Load the engine configuration from `volition-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to defaults when it is absent.
fn load_config() -> Result<EngineConfig, EngineError> {
    let config_path = Path::new("volition-config.yaml");
    if config_path.exists() {
        let config = EngineConfig::from_file(config_path)?;
        Ok(config)
    } else {
        Ok(EngineConfig::default())
    }
}

/// Log every top-level completion as a JSON payload.
fn log_completions(bus: &EventBus) -> Subscription {
    bus.subscribe(|event| {
        if let Event::ActionCompleted(done) = event {
            match serde_json::to_string(done) {
                Ok(payload) => info!(event = %payload, "action completed"),
                Err(error) => warn!(error = %error, "completion event did not serialize"),
            }
        }
    })
}

/// Queue the demo: a head move and a drive-out sequence first, then a
/// retry-wrapped search for the scripted object.
fn queue_demo(state: &mut EngineState, config: &EngineConfig, object_id: ObjectId) {
    let demo = &config.demo;
    let head_speed = state.robot.limits().max_head_speed_radps;

    state.actions.queue(ActionNode::leaf(MoveHeadToAngleAction::new(
        demo.head_angle_deg.to_radians(),
        head_speed,
    )));

    let drive_out = CompoundAction::new("drive_out")
        .with_child(ActionNode::leaf(DriveStraightAction::new(
            demo.drive_distance_mm,
            demo.drive_speed_mmps,
        )))
        .with_child(ActionNode::leaf(TurnInPlaceAction::relative(
            demo.turn_angle_deg.to_radians(),
            demo.turn_speed_radps,
        )))
        .with_child(ActionNode::leaf(WaitAction::new(Duration::from_millis(
            demo.pause_ms,
        ))));
    state.actions.queue(drive_out);

    let search = SearchForNearbyObjectAction::new(config.search).for_object(object_id);
    state
        .actions
        .queue(RetryAction::new(ActionNode::leaf(search), demo.search_max_retries));
}
