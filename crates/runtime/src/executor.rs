//! Step executor
//!
//! Runs one step's fixed, ordered pass sequence over the field set, swaps
//! every mutated field exactly once, and advances the orbital clock. A
//! dispatch failure abandons the step with no partial swap and is reported
//! through the injected error callback; the caller only sees a boolean.

use tracing::{debug, error, info, trace};

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::fields::FieldSet;
use crate::grid::GridTopology;
use crate::passes::{standard_pipeline, validate_order, Pass, PassContext};
use crate::types::OrbitalState;

/// Injected sink for dispatch failures; invoked at most once per failing step.
pub type ErrorCallback = Box<dyn FnMut(&Error)>;

/// Sequences the pass pipeline for one physics step at a time.
pub struct Executor {
    passes: Vec<Box<dyn Pass>>,
    clock: OrbitalState,
    steps_advanced: u64,
    on_error: Option<ErrorCallback>,
}

impl Executor {
    /// Create an executor over an explicit pass table.
    ///
    /// The table is audited up front: a pass reading a next-generation role
    /// no earlier pass writes is a construction error, not a runtime one.
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Result<Self> {
        validate_order(&passes)?;
        debug!(passes = passes.len(), "executor created");
        Ok(Self {
            passes,
            clock: OrbitalState::default(),
            steps_advanced: 0,
            on_error: None,
        })
    }

    /// Executor over the standard radiation -> hydrology -> convection ->
    /// diffusion pipeline.
    pub fn standard() -> Self {
        Self::new(standard_pipeline()).expect("standard pipeline is ordered")
    }

    /// Install the error callback. Replaces any previous one.
    pub fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.on_error = Some(callback);
    }

    /// Current orbital clock state.
    pub fn orbital_state(&self) -> OrbitalState {
        self.clock
    }

    /// Successful steps since construction or reset.
    pub fn steps_advanced(&self) -> u64 {
        self.steps_advanced
    }

    /// Zero the orbital clock. Field contents are untouched.
    pub fn reset(&mut self) {
        info!("executor clock reset");
        self.steps_advanced = 0;
        self.clock = OrbitalState::default();
    }

    /// Run one full step: every pass in order, then swap.
    ///
    /// Returns `false` if any dispatch failed; the step is abandoned, no
    /// field is swapped, the clock does not advance, and the failure has
    /// already been reported through the error callback. Errors never cross
    /// this boundary.
    pub fn run_step(
        &mut self,
        grid: &GridTopology,
        config: &SimConfig,
        fields: &mut FieldSet,
    ) -> bool {
        for pass in &self.passes {
            trace!(pass = %pass.id(), "dispatch");
            let mut ctx = PassContext {
                grid,
                config,
                orbit: &self.clock,
                fields: &mut *fields,
            };
            if let Err(err) = pass.dispatch(&mut ctx) {
                error!(pass = %pass.id(), %err, "dispatch failed, step abandoned");
                if let Some(callback) = self.on_error.as_mut() {
                    callback(&err);
                }
                return false;
            }
        }

        fields.swap_all();
        self.steps_advanced += 1;
        self.clock = OrbitalState::at_step(
            self.steps_advanced,
            config.dt,
            config.year_length,
            config.rotations_per_year,
        );
        true
    }
}
