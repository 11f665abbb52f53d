//! Recorder
//!
//! Fixed-depth wrap-around history of selected fields, sampled at a cadence
//! decoupled from (and generally coarser than) the physics step rate. When
//! `steps_per_orbit` is not an integer multiple of `samples_per_orbit` the
//! due point falls between steps; samples are linearly blended between the
//! previous and current state, and the overshoot is carried forward so the
//! sampling phase never drifts against the orbit.
//!
//! The recorder owns its ring slots and previous-state snapshots outright;
//! the live field set is only lent to it for the duration of each
//! `observe_step` call.

use indexmap::IndexMap;
use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::fields::FieldSet;
use crate::orchestrator::StepObserver;
use crate::types::StepEvent;

/// Extracts the recorded quantity (current generation) from the field set.
pub type FieldExtractor = Box<dyn Fn(&FieldSet) -> &[f64]>;

struct TrackedField {
    extractor: FieldExtractor,
    /// depth x cell_count slots, allocated once and reused
    ring: Vec<Vec<f64>>,
    previous: Vec<f64>,
    has_previous: bool,
}

/// Historical ring-buffer sampler with sub-step interpolation.
pub struct Recorder {
    samples_per_orbit: usize,
    steps_per_sample: f64,
    depth: usize,
    cell_count: usize,
    write_index: usize,
    steps_since_last_sample: f64,
    samples_written: u64,
    last_orbit: Option<u64>,
    complete_orbit_start: Option<usize>,
    fields: IndexMap<String, TrackedField>,
}

impl Recorder {
    /// Recorder sized for `config`'s cadence over `cell_count` cells.
    ///
    /// Ring depth is twice `samples_per_orbit`, so one full orbit is always
    /// retained while the next one overwrites the other half.
    pub fn new(config: &SimConfig, cell_count: usize) -> Self {
        info!(
            samples_per_orbit = config.samples_per_orbit,
            depth = config.ring_depth(),
            "recorder created"
        );
        Self {
            samples_per_orbit: config.samples_per_orbit as usize,
            steps_per_sample: config.steps_per_sample(),
            depth: config.ring_depth(),
            cell_count,
            write_index: 0,
            steps_since_last_sample: 0.0,
            samples_written: 0,
            last_orbit: None,
            complete_orbit_start: None,
            fields: IndexMap::new(),
        }
    }

    /// Track a field under `name`. Ring storage for it is allocated here;
    /// tracking the same name again replaces the extractor and history.
    pub fn track(&mut self, name: impl Into<String>, extractor: FieldExtractor) {
        let name = name.into();
        debug!(field = %name, "recorder tracking field");
        self.fields.insert(
            name,
            TrackedField {
                extractor,
                ring: (0..self.depth).map(|_| vec![0.0; self.cell_count]).collect(),
                previous: vec![0.0; self.cell_count],
                has_previous: false,
            },
        );
    }

    /// Whether a full orbit of samples is available.
    pub fn has_complete_orbit(&self) -> bool {
        self.complete_orbit_start.is_some()
    }

    /// Ring index of the earliest sample of the most recent complete orbit,
    /// or `None` until the first orbit completes.
    pub fn complete_orbit_start_index(&self) -> Option<usize> {
        self.complete_orbit_start
    }

    /// Samples retained per orbit.
    pub fn samples_per_orbit(&self) -> usize {
        self.samples_per_orbit
    }

    /// Total samples written since construction or reset.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Names of tracked fields in registration order.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// One orbit of history for `cell`: `samples_per_orbit` contiguous values
    /// starting at the complete-orbit window. `None` while no complete orbit
    /// exists, or for an unknown field or out-of-range cell.
    pub fn orbit_samples(&self, field: &str, cell: usize) -> Option<Vec<f64>> {
        let start = self.complete_orbit_start?;
        let tracked = self.fields.get(field)?;
        if cell >= self.cell_count {
            return None;
        }
        Some(
            (0..self.samples_per_orbit)
                .map(|k| tracked.ring[(start + k) % self.depth][cell])
                .collect(),
        )
    }

    /// Zero counters and indices, discard the window, and recapture the
    /// current state as the previous snapshot. Ring storage is reused.
    pub fn reset(&mut self, fields: &FieldSet) {
        info!("recorder reset");
        self.write_index = 0;
        self.steps_since_last_sample = 0.0;
        self.samples_written = 0;
        self.last_orbit = None;
        self.complete_orbit_start = None;
        for tracked in self.fields.values_mut() {
            let current = (tracked.extractor)(fields);
            debug_assert_eq!(current.len(), self.cell_count);
            tracked.previous.copy_from_slice(current);
            tracked.has_previous = true;
        }
    }
}

impl StepObserver for Recorder {
    fn observe_step(&mut self, event: &StepEvent, fields: &FieldSet) {
        // Note the rollover up front; the window itself is derived below,
        // after the orbit's final sample (always due on the wrap step) has
        // been written, so it brackets exactly that orbit.
        let rolled = self.last_orbit.is_some_and(|o| o != event.orbit);
        self.last_orbit = Some(event.orbit);

        self.steps_since_last_sample += 1.0;

        if self.steps_since_last_sample >= self.steps_per_sample {
            let fraction = self.steps_since_last_sample - self.steps_per_sample;
            let blend = fraction.clamp(0.0, 1.0);
            for tracked in self.fields.values_mut() {
                let current = (tracked.extractor)(fields);
                debug_assert_eq!(current.len(), self.cell_count);
                let slot = &mut tracked.ring[self.write_index];
                if !tracked.has_previous || blend >= 1.0 {
                    slot.copy_from_slice(current);
                } else if blend <= 0.0 {
                    slot.copy_from_slice(&tracked.previous);
                } else {
                    for (dst, (prev, cur)) in slot
                        .iter_mut()
                        .zip(tracked.previous.iter().zip(current.iter()))
                    {
                        *dst = prev + blend * (cur - prev);
                    }
                }
            }
            trace!(index = self.write_index, fraction, "sample written");
            self.write_index = (self.write_index + 1) % self.depth;
            self.samples_written += 1;
            // Carry the overshoot forward as the new accumulator. Resetting
            // to zero here would let the sampling phase drift against the
            // orbit whenever steps_per_sample is fractional.
            self.steps_since_last_sample = fraction;
        }

        if rolled && self.samples_written >= self.samples_per_orbit as u64 {
            let start =
                (self.write_index + self.depth - self.samples_per_orbit) % self.depth;
            self.complete_orbit_start = Some(start);
            debug!(start, orbit = event.orbit, "complete orbit window updated");
        }

        // Always recapture: interpolation blends immediately adjacent
        // physics states, whether or not a sample fired this step.
        for tracked in self.fields.values_mut() {
            let current = (tracked.extractor)(fields);
            debug_assert_eq!(current.len(), self.cell_count);
            tracked.previous.copy_from_slice(current);
            tracked.has_previous = true;
        }
    }
}
