//! A scripted stand-in for a vision system.

use tracing::info;
use volition_core::{EngineState, TickCallback};
use volition_types::{Event, ObjectId, ObjectObserved, Pose2};

/// Publishes one [`ObjectObserved`] sighting at a fixed tick.
///
/// Stands in for a perception pipeline in the demo: the search action
/// subscribes to the same bus and picks the sighting up on its next
/// completion check.
#[derive(Debug)]
pub struct ScriptedVision {
    object_id: ObjectId,
    observe_at_tick: u64,
    published: bool,
}

impl ScriptedVision {
    /// Report `object_id` once tick `observe_at_tick` is reached (0 = never).
    pub const fn new(object_id: ObjectId, observe_at_tick: u64) -> Self {
        Self {
            object_id,
            observe_at_tick,
            published: false,
        }
    }
}

impl TickCallback for ScriptedVision {
    fn on_tick(&mut self, state: &mut EngineState) {
        if self.published || self.observe_at_tick == 0 || state.robot.tick() < self.observe_at_tick
        {
            return;
        }
        self.published = true;
        let robot_pose = state.robot.pose();
        let observed = ObjectObserved {
            robot_id: state.robot.id(),
            object_id: self.object_id,
            // Place the object a little way ahead of wherever the robot
            // happens to be looking.
            pose: Pose2::new(
                robot_pose.heading_rad.cos().mul_add(120.0, robot_pose.x_mm),
                robot_pose.heading_rad.sin().mul_add(120.0, robot_pose.y_mm),
                0.0,
            ),
            tick: state.robot.tick(),
        };
        info!(object = %self.object_id, tick = observed.tick, "scripted sighting published");
        state.robot.bus().publish(&Event::ObjectObserved(observed));
    }
}
