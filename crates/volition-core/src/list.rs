//! Queued action dispatch.
//!
//! An [`ActionList`] owns every top-level [`ActionRunner`] on a robot.
//! Queued actions wait until no running action holds a conflicting
//! subsystem lock, then start; actions with disjoint lock sets run
//! concurrently within the same tick. A queued action whose locks are
//! free may start ahead of an earlier one that is still blocked.
//!
//! Running order is queue order, and all dispatch happens inside
//! [`ActionList::update`], once per tick.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::debug;
use volition_robot::Robot;
use volition_types::{ActionResult, ActionTag, LockSet};

use crate::action::{ActionCtx, ActionNode};
use crate::runner::ActionRunner;
use crate::watcher::ActionWatcher;

/// Queueing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The tag is already attached to a queued or running action.
    #[error("action tag {tag} is already in use")]
    DuplicateTag {
        /// The tag that collided.
        tag: ActionTag,
    },
}

/// Lock-aware queue of top-level actions.
#[derive(Debug, Default)]
pub struct ActionList {
    running: Vec<ActionRunner>,
    pending: VecDeque<ActionRunner>,
    watcher: ActionWatcher,
    log_steps: bool,
}

impl ActionList {
    /// Empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: Vec::new(),
            pending: VecDeque::new(),
            watcher: ActionWatcher::new(),
            log_steps: false,
        }
    }

    /// Queue an action behind everything already queued.
    pub fn queue(&mut self, node: impl Into<ActionNode>) -> ActionTag {
        let mut runner = ActionRunner::new(node.into());
        runner.set_log_steps(self.log_steps);
        let tag = runner.tag();
        debug!(%tag, name = runner.name(), "action queued");
        self.pending.push_back(runner);
        tag
    }

    /// Queue an action under a caller-chosen tag.
    pub fn queue_with_tag(
        &mut self,
        tag: ActionTag,
        node: impl Into<ActionNode>,
    ) -> Result<ActionTag, QueueError> {
        if self.contains(tag) {
            return Err(QueueError::DuplicateTag { tag });
        }
        let mut runner = ActionRunner::with_tag(tag, node.into());
        runner.set_log_steps(self.log_steps);
        debug!(%tag, name = runner.name(), "action queued");
        self.pending.push_back(runner);
        Ok(tag)
    }

    /// Queue an action at the front and interrupt every running action
    /// whose locks it needs. The displaced actions report `Interrupted`
    /// on the next update, and the new action starts once their locks
    /// are free.
    pub fn queue_now(&mut self, node: impl Into<ActionNode>) -> ActionTag {
        let mut runner = ActionRunner::new(node.into());
        runner.set_log_steps(self.log_steps);
        let needed = runner.locks();
        for active in &mut self.running {
            if active.locks().intersects(needed) {
                debug!(displaced = %active.tag(), by = %runner.tag(), "interrupting for urgent action");
                active.interrupt();
            }
        }
        let tag = runner.tag();
        self.pending.push_front(runner);
        tag
    }

    /// Request cancellation of one action, queued or running. Returns
    /// whether the tag was found; the result arrives on the next update.
    pub fn cancel(&mut self, tag: ActionTag) -> bool {
        for runner in &mut self.running {
            if runner.tag() == tag {
                runner.cancel();
                return true;
            }
        }
        for runner in &mut self.pending {
            if runner.tag() == tag {
                runner.cancel();
                return true;
            }
        }
        false
    }

    /// Request cancellation of everything, queued and running.
    pub fn cancel_all(&mut self) {
        for runner in &mut self.running {
            runner.cancel();
        }
        for runner in &mut self.pending {
            runner.cancel();
        }
    }

    /// Log every queued tree's nested completions at info level.
    pub fn set_log_steps(&mut self, on: bool) {
        self.log_steps = on;
        for runner in &mut self.running {
            runner.set_log_steps(on);
        }
        for runner in &mut self.pending {
            runner.set_log_steps(on);
        }
    }

    /// Whether the tag belongs to a queued or running action.
    pub fn contains(&self, tag: ActionTag) -> bool {
        self.running.iter().any(|runner| runner.tag() == tag)
            || self.pending.iter().any(|runner| runner.tag() == tag)
    }

    /// Number of actions currently executing.
    pub const fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Number of actions waiting to start.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }

    /// Completion records not yet drained by their broadcasts.
    pub const fn watcher(&self) -> &ActionWatcher {
        &self.watcher
    }

    /// Drive every running action one tick, then start queued actions
    /// whose locks are free. Returns the actions that terminated this
    /// tick, in the order they terminated.
    pub fn update(&mut self, robot: &mut Robot) -> Vec<(ActionTag, ActionResult)> {
        let mut completed = Vec::new();

        for runner in &mut self.running {
            let mut ctx = ActionCtx::new(robot, &mut self.watcher);
            let result = runner.update(&mut ctx);
            if result.is_terminal() {
                completed.push((runner.tag(), result));
            }
        }
        self.running.retain(|runner| !runner.is_finished());

        let mut claimed = self
            .running
            .iter()
            .fold(LockSet::NONE, |acc, runner| acc.union(runner.locks()));

        let mut index = 0;
        while index < self.pending.len() {
            let startable = self.pending.get(index).is_some_and(|candidate| {
                // An aborted action never takes its locks, so it may
                // start (and terminate) regardless of conflicts.
                candidate.abort_requested() || !claimed.intersects(candidate.locks())
            });
            if !startable {
                index = index.saturating_add(1);
                continue;
            }
            let Some(mut runner) = self.pending.remove(index) else {
                break;
            };
            let mut ctx = ActionCtx::new(robot, &mut self.watcher);
            let result = runner.update(&mut ctx);
            if result.is_terminal() {
                completed.push((runner.tag(), result));
            } else {
                claimed = claimed.union(runner.locks());
                self.running.push(runner);
            }
        }

        completed
    }
}
