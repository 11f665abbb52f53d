//! Tellus Runtime
//!
//! Deterministic, fixed-timestep planetary climate engine: sequences the
//! per-step pass pipeline over double-buffered fields, drives it from a
//! frame-based host loop, and records interpolated orbit history.

pub mod config;
pub mod error;
pub mod executor;
pub mod fields;
pub mod grid;
pub mod orchestrator;
pub mod passes;
pub mod recorder;
pub mod types;

pub use config::{PhysicsConfig, SimConfig};
pub use error::{Error, Result};
pub use executor::Executor;
pub use fields::{DoubleField, FieldSet, WorkingArena};
pub use grid::GridTopology;
pub use orchestrator::{Orchestrator, StepObserver};
pub use recorder::Recorder;
pub use types::*;
