//! Core runtime types
//!
//! Payloads, identifiers and control-flow state shared across the engine.

use std::fmt;

/// Identifier for a compute pass in the step pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    /// Two-stream shortwave + longwave column transfer
    Radiation,
    /// Freeze/thaw, evaporation and latent-heat corrections
    Hydrology,
    /// Convective adjustment and moisture transport
    Convection,
    /// Lateral heat conduction over the neighbour topology
    Diffusion,
}

impl PassId {
    /// All passes in dispatch order
    pub const ALL: [PassId; 4] = [
        PassId::Radiation,
        PassId::Hydrology,
        PassId::Convection,
        PassId::Diffusion,
    ];

    /// Stable lowercase name for logs
    pub fn name(&self) -> &'static str {
        match self {
            PassId::Radiation => "radiation",
            PassId::Hydrology => "hydrology",
            PassId::Convection => "convection",
            PassId::Diffusion => "diffusion",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Buffer roles a pass may bind. Declared as data on each pass so the
/// dependency chain between passes is auditable without running them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Surface temperature, current generation
    SurfaceCurrent,
    /// Surface temperature, next generation
    SurfaceNext,
    /// Liquid water + ice mass, current generation
    HydrologyCurrent,
    /// Liquid water + ice mass, next generation
    HydrologyNext,
    /// Per-layer atmosphere state, current generation
    LayersCurrent,
    /// Per-layer atmosphere state, next generation
    LayersNext,
    /// Scratch slot staging a copy of the next-generation surface
    WorkingSurface,
    /// Absorbed-shortwave diagnostic output
    SolarDiagnostic,
    /// Static terrain attributes (elevation, base albedo)
    Terrain,
}

/// Control state of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    /// Constructed, never played
    #[default]
    Idle,
    /// Ticks advance physics
    Running,
    /// Ticks are no-ops until play() is called again
    Paused,
    /// Terminal. Never resumes.
    Completed,
}

/// Milestone kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneKind {
    /// physics_step wrapped and the orbit counter advanced
    OrbitComplete,
    /// The run was completed by a terminal trigger
    SimulationComplete,
}

/// Immutable milestone payload delivered to milestone listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub kind: MilestoneKind,
    /// Orbit counter after the transition that produced this milestone
    pub orbit: u64,
    /// Step-in-orbit at dispatch time (0 for orbit completions)
    pub physics_step: u32,
}

/// Immutable per-step payload delivered to step listeners.
///
/// Counters already reflect any rollover that happened this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent {
    pub physics_step: u32,
    pub orbit: u64,
}

/// Orbital clock state.
///
/// A pure function of step count and configuration; never integrated
/// incrementally, so it cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitalState {
    /// Simulated seconds since reset
    pub total_time: f64,
    /// Fraction of the current orbit elapsed, in [0, 1)
    pub year_progress: f64,
    /// Planetary rotation angle in degrees, in [0, 360)
    pub rotation_degrees: f64,
    /// Longitude (degrees east, in [0, 360)) currently under the star
    pub subsolar_longitude: f64,
}

impl OrbitalState {
    /// Clock state after `steps` successful physics steps.
    pub fn at_step(steps: u64, dt: f64, year_length: f64, rotations_per_year: f64) -> Self {
        let total_time = steps as f64 * dt;
        let years = total_time / year_length;
        let rotation_degrees = (years * rotations_per_year * 360.0).rem_euclid(360.0);
        // The subsolar point regresses by one rotation less than the spin
        // per orbit (solar vs sidereal day).
        let subsolar_longitude =
            ((years - years * rotations_per_year) * 360.0).rem_euclid(360.0);
        Self {
            total_time,
            year_progress: years.fract(),
            rotation_degrees,
            subsolar_longitude,
        }
    }
}

/// Handle returned by listener registration; detaches on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
