//! Orchestrator
//!
//! Play/pause/complete state machine around the executor. Tracks step and
//! orbit counters, fires milestone and step notifications synchronously in
//! registration order, and bounds per-frame work to `steps_per_frame`.
//!
//! Contract: counters roll over and milestones fire BEFORE step
//! notifications, so every step listener observes an orbit index that
//! already reflects the new orbit. Listener panics are not caught; they
//! propagate through `tick` to the host loop.

use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::executor::Executor;
use crate::fields::FieldSet;
use crate::grid::GridTopology;
use crate::types::{ControlState, Milestone, MilestoneKind, StepEvent, SubscriptionId};

/// Typed observer slot for the component that needs field access per step
/// (the recorder). The field set is lent for the duration of the call only.
pub trait StepObserver {
    fn observe_step(&mut self, event: &StepEvent, fields: &FieldSet);
}

/// Milestone listener; payload is immutable.
pub type MilestoneCallback = Box<dyn FnMut(&Milestone)>;

/// Step listener; fires every successful step, milestone or not.
pub type StepCallback = Box<dyn FnMut(&StepEvent)>;

/// Control-flow state machine driving the executor from a host frame loop.
pub struct Orchestrator {
    executor: Executor,
    control: ControlState,
    physics_step: u32,
    orbit: u64,
    next_subscription: u64,
    milestone_listeners: Vec<(SubscriptionId, MilestoneCallback)>,
    step_listeners: Vec<(SubscriptionId, StepCallback)>,
}

impl Orchestrator {
    pub fn new(executor: Executor) -> Self {
        info!("orchestrator created");
        Self {
            executor,
            control: ControlState::Idle,
            physics_step: 0,
            orbit: 0,
            next_subscription: 0,
            milestone_listeners: Vec::new(),
            step_listeners: Vec::new(),
        }
    }

    /// Current control state.
    pub fn control(&self) -> ControlState {
        self.control
    }

    /// Step index within the current orbit, in `[0, steps_per_orbit)`.
    pub fn physics_step(&self) -> u32 {
        self.physics_step
    }

    /// Completed-orbit counter; monotonic.
    pub fn orbit(&self) -> u64 {
        self.orbit
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    /// Transition idle/paused -> running. No-op from completed.
    pub fn play(&mut self) {
        match self.control {
            ControlState::Idle | ControlState::Paused => {
                info!(from = ?self.control, "play");
                self.control = ControlState::Running;
            }
            ControlState::Running => {}
            ControlState::Completed => {
                debug!("play ignored: simulation completed");
            }
        }
    }

    /// Transition running -> paused; no-op from any other state.
    pub fn pause(&mut self) {
        if self.control == ControlState::Running {
            info!("pause");
            self.control = ControlState::Paused;
        }
    }

    /// Terminal trigger: running/paused -> completed. Fires the
    /// simulation-complete milestone once. The state never resumes.
    pub fn complete(&mut self) {
        match self.control {
            ControlState::Running | ControlState::Paused => {
                info!(orbit = self.orbit, "simulation complete");
                self.control = ControlState::Completed;
                let milestone = Milestone {
                    kind: MilestoneKind::SimulationComplete,
                    orbit: self.orbit,
                    physics_step: self.physics_step,
                };
                for (_, callback) in &mut self.milestone_listeners {
                    callback(&milestone);
                }
            }
            ControlState::Idle | ControlState::Completed => {
                debug!(state = ?self.control, "complete ignored");
            }
        }
    }

    /// Zero the counters and the executor clock and return to idle, for
    /// starting a fresh run over replaced state. Field contents and
    /// subscriptions are untouched.
    pub fn reset(&mut self) {
        info!("orchestrator reset");
        self.physics_step = 0;
        self.orbit = 0;
        self.control = ControlState::Idle;
        self.executor.reset();
    }

    /// Register a milestone listener; fires synchronously in registration
    /// order.
    pub fn on_milestone(&mut self, callback: MilestoneCallback) -> SubscriptionId {
        let id = self.subscription_id();
        self.milestone_listeners.push((id, callback));
        id
    }

    /// Register a step listener; fires every successful step.
    pub fn on_step(&mut self, callback: StepCallback) -> SubscriptionId {
        let id = self.subscription_id();
        self.step_listeners.push((id, callback));
        id
    }

    /// Detach a milestone listener. Returns whether it was attached.
    pub fn remove_milestone(&mut self, id: SubscriptionId) -> bool {
        let before = self.milestone_listeners.len();
        self.milestone_listeners.retain(|(sid, _)| *sid != id);
        self.milestone_listeners.len() != before
    }

    /// Detach a step listener. Returns whether it was attached.
    pub fn remove_step(&mut self, id: SubscriptionId) -> bool {
        let before = self.step_listeners.len();
        self.step_listeners.retain(|(sid, _)| *sid != id);
        self.step_listeners.len() != before
    }

    /// Advance up to `steps_per_frame` physics steps.
    ///
    /// Returns the number of steps actually completed. While not running
    /// this returns 0 without invoking the executor; a dispatch failure
    /// stops the frame's remaining steps. Synchronous and not re-entrant.
    pub fn tick(
        &mut self,
        grid: &GridTopology,
        config: &SimConfig,
        fields: &mut FieldSet,
        mut observer: Option<&mut dyn StepObserver>,
        steps_per_frame: u32,
    ) -> u32 {
        if self.control != ControlState::Running {
            trace!(state = ?self.control, "tick ignored while not running");
            return 0;
        }

        let mut completed = 0;
        for _ in 0..steps_per_frame {
            if !self.executor.run_step(grid, config, fields) {
                break;
            }
            completed += 1;

            // Rollover first: notifications below must see updated counters.
            self.physics_step += 1;
            if self.physics_step == config.steps_per_orbit {
                self.physics_step = 0;
                self.orbit += 1;
                debug!(orbit = self.orbit, "orbit complete");
                let milestone = Milestone {
                    kind: MilestoneKind::OrbitComplete,
                    orbit: self.orbit,
                    physics_step: 0,
                };
                for (_, callback) in &mut self.milestone_listeners {
                    callback(&milestone);
                }
            }

            let event = StepEvent {
                physics_step: self.physics_step,
                orbit: self.orbit,
            };
            if let Some(obs) = observer.as_mut() {
                obs.observe_step(&event, fields);
            }
            for (_, callback) in &mut self.step_listeners {
                callback(&event);
            }
        }
        completed
    }

    fn subscription_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }
}
