//! Field storage
//!
//! Double-buffered per-cell state with a scratch arena for breaking
//! read/write aliasing inside a step. Buffers are exchanged by pointer swap,
//! never copied; passes borrow current/next generations per dispatch.

use std::mem;

use tracing::warn;

/// Temperature every buffer starts at before the host seeds real state.
const INITIAL_TEMP_K: f64 = 288.15;

/// A current/next buffer pair for one per-cell quantity.
///
/// Exactly one generation is readable (`current`) and one writable (`next`)
/// at any time. `swap` is an O(1) pointer exchange and must be called at most
/// once per step, after every writer of `next` has finished; the engine does
/// this through [`FieldSet::swap_all`].
#[derive(Debug)]
pub struct DoubleField {
    name: &'static str,
    current: Vec<f64>,
    next: Vec<f64>,
    generation: u64,
}

impl DoubleField {
    /// Create a pair with both generations filled with `value`.
    pub fn filled(name: &'static str, len: usize, value: f64) -> Self {
        Self {
            name,
            current: vec![value; len],
            next: vec![value; len],
            generation: 0,
        }
    }

    /// Field name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cells per generation.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether the field holds zero cells.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Readable generation.
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Read back the writable generation (for passes consuming an earlier
    /// pass's output within the same step).
    pub fn next(&self) -> &[f64] {
        &self.next
    }

    /// Writable generation.
    pub fn next_mut(&mut self) -> &mut [f64] {
        &mut self.next
    }

    /// Borrow both generations at once: `(current, next)`.
    pub fn split(&mut self) -> (&[f64], &mut [f64]) {
        (&self.current, &mut self.next)
    }

    /// Exchange the generations. O(1); no element is copied.
    pub fn swap(&mut self) {
        mem::swap(&mut self.current, &mut self.next);
        self.generation += 1;
    }

    /// Number of swaps since construction. Lets callers verify the exchange
    /// is a pure reference swap rather than a copy.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seed both generations from `values`.
    ///
    /// A length mismatch is a setup mistake, not a runtime failure: it is
    /// logged and the call is a no-op, leaving prior contents intact.
    /// Returns whether the values were applied.
    pub fn set_initial(&mut self, values: &[f64]) -> bool {
        if values.len() != self.current.len() {
            warn!(
                field = self.name,
                expected = self.current.len(),
                actual = values.len(),
                "initial values ignored: length mismatch"
            );
            return false;
        }
        self.current.copy_from_slice(values);
        self.next.copy_from_slice(values);
        true
    }
}

/// Fixed scratch arena staging element-wise copies within a step.
///
/// Contract: a slot's contents are only valid between being fully overwritten
/// by [`WorkingArena::stage`] and the end of the pass that staged it. Slots
/// are allocated once; steady-state operation never allocates.
#[derive(Debug)]
pub struct WorkingArena {
    slots: Vec<Vec<f64>>,
}

impl WorkingArena {
    /// Allocate `slots` scratch buffers of `len` cells each.
    pub fn new(slots: usize, len: usize) -> Self {
        Self {
            slots: (0..slots).map(|_| vec![0.0; len]).collect(),
        }
    }

    /// Number of scratch slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Overwrite a slot with a copy of `src` and return the staged view.
    pub fn stage(&mut self, slot: usize, src: &[f64]) -> &[f64] {
        let dst = &mut self.slots[slot];
        debug_assert_eq!(dst.len(), src.len(), "arena slot length is fixed at construction");
        dst.copy_from_slice(src);
        dst
    }

    /// Read a previously staged slot.
    pub fn slot(&self, slot: usize) -> &[f64] {
        &self.slots[slot]
    }
}

/// All mutable simulation state for one run.
///
/// Owned by the simulation host and lent by reference to the executor and
/// recorder per call; nothing here is shared or locked.
#[derive(Debug)]
pub struct FieldSet {
    /// Surface temperature, K
    pub surface_temp: DoubleField,
    /// Liquid surface water, kg/m^2
    pub water: DoubleField,
    /// Surface ice, kg/m^2
    pub ice: DoubleField,
    /// Per-layer air temperature, K; index 0 is the bottom layer
    pub layer_temp: Vec<DoubleField>,
    /// Per-layer moisture mixing ratio, kg/kg
    pub layer_moisture: Vec<DoubleField>,
    /// Per-layer cloud fraction, [0, 1]
    pub layer_cloud: Vec<DoubleField>,
    /// Shortwave flux absorbed at the surface this step, W/m^2 (diagnostic)
    pub absorbed_solar: Vec<f64>,
    /// Static terrain elevation, m
    pub elevation: Vec<f64>,
    /// Static snow/ice-free surface albedo
    pub base_albedo: Vec<f64>,
    /// Scratch slots for the surface field
    pub working: WorkingArena,
}

impl FieldSet {
    /// Isothermal, dry initial state; the host seeds real state through the
    /// setters afterwards.
    pub fn new(cell_count: usize, layers: usize) -> Self {
        let temps = |_: usize| DoubleField::filled("layer_temp", cell_count, INITIAL_TEMP_K);
        Self {
            surface_temp: DoubleField::filled("surface_temp", cell_count, INITIAL_TEMP_K),
            water: DoubleField::filled("water", cell_count, 0.0),
            ice: DoubleField::filled("ice", cell_count, 0.0),
            layer_temp: (0..layers).map(temps).collect(),
            layer_moisture: (0..layers)
                .map(|_| DoubleField::filled("layer_moisture", cell_count, 0.0))
                .collect(),
            layer_cloud: (0..layers)
                .map(|_| DoubleField::filled("layer_cloud", cell_count, 0.0))
                .collect(),
            absorbed_solar: vec![0.0; cell_count],
            elevation: vec![0.0; cell_count],
            base_albedo: vec![0.3; cell_count],
            working: WorkingArena::new(2, cell_count),
        }
    }

    /// Cells per field.
    pub fn cell_count(&self) -> usize {
        self.surface_temp.len()
    }

    /// Atmosphere layer count.
    pub fn layer_count(&self) -> usize {
        self.layer_temp.len()
    }

    /// Swap every double-buffered field exactly once.
    ///
    /// Called by the executor after the last pass of a successful step; an
    /// abandoned step never reaches this.
    pub fn swap_all(&mut self) {
        self.surface_temp.swap();
        self.water.swap();
        self.ice.swap();
        for f in &mut self.layer_temp {
            f.swap();
        }
        for f in &mut self.layer_moisture {
            f.swap();
        }
        for f in &mut self.layer_cloud {
            f.swap();
        }
    }

    /// Replace the static terrain attributes wholesale.
    ///
    /// Mis-sized arrays are logged and ignored (setup-time mismatch policy).
    pub fn set_terrain(&mut self, elevation: &[f64], base_albedo: &[f64]) -> bool {
        if elevation.len() != self.elevation.len() || base_albedo.len() != self.base_albedo.len() {
            warn!(
                expected = self.elevation.len(),
                elevation = elevation.len(),
                albedo = base_albedo.len(),
                "terrain ignored: length mismatch"
            );
            return false;
        }
        self.elevation.copy_from_slice(elevation);
        self.base_albedo.copy_from_slice(base_albedo);
        true
    }
}
