//! Step pipeline passes
//!
//! Each pass is a pure, data-parallel transform consuming current-generation
//! buffers (plus static tables) and producing next-generation buffers. The
//! pipeline is an explicit ordered table; every pass declares the buffer
//! roles it binds so the §step dependency chain is auditable as data rather
//! than implied by call order.
//!
//! Dispatch order and data flow:
//!
//! 1. radiation  - reads current surface/hydrology/layers + orbital state;
//!    writes next surface, next layer temperatures, solar diagnostic.
//! 2. hydrology  - reads radiation's outputs + current hydrology; writes next
//!    hydrology and corrects next surface/bottom-layer state for latent heat.
//! 3. convection - reads/writes next layer state as updated so far.
//! 4. diffusion  - reads a staged working copy of the next surface plus next
//!    hydrology (heat capacity); writes the final next surface.
//!
//! Within a pass, next-generation buffers are only read element-wise at the
//! cell being written; any cross-cell read of a next buffer must go through
//! a staged working copy (diffusion).

pub mod convection;
pub mod diffusion;
pub mod hydrology;
pub mod radiation;

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::fields::FieldSet;
use crate::grid::GridTopology;
use crate::types::{BufferRole, OrbitalState, PassId};

/// Everything a pass may touch during one dispatch.
pub struct PassContext<'a> {
    pub grid: &'a GridTopology,
    pub config: &'a SimConfig,
    pub orbit: &'a OrbitalState,
    pub fields: &'a mut FieldSet,
}

/// One compute pass in the step pipeline.
pub trait Pass: Send {
    fn id(&self) -> PassId;
    /// Buffer roles consumed by this pass.
    fn reads(&self) -> &'static [BufferRole];
    /// Buffer roles produced by this pass.
    fn writes(&self) -> &'static [BufferRole];
    /// Run the kernel for one step. Must either fully write its declared
    /// outputs or fail without side effects the next step would observe.
    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()>;
}

/// The standard four-pass pipeline in dependency order.
pub fn standard_pipeline() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(radiation::RadiationPass),
        Box::new(hydrology::HydrologyPass),
        Box::new(convection::ConvectionPass),
        Box::new(diffusion::DiffusionPass),
    ]
}

/// Audit a pass table: every next-generation role a pass reads must have been
/// written by an earlier pass in the same table.
pub fn validate_order(passes: &[Box<dyn Pass>]) -> Result<()> {
    let mut written: Vec<BufferRole> = Vec::new();
    for pass in passes {
        for &role in pass.reads() {
            let needs_producer = matches!(
                role,
                BufferRole::SurfaceNext
                    | BufferRole::HydrologyNext
                    | BufferRole::LayersNext
                    | BufferRole::WorkingSurface
            );
            // WorkingSurface is staged by the reading pass itself.
            if needs_producer
                && role != BufferRole::WorkingSurface
                && !written.contains(&role)
            {
                return Err(Error::OrderViolation {
                    pass: pass.id(),
                    role,
                });
            }
        }
        written.extend_from_slice(pass.writes());
    }
    Ok(())
}

/// Guard a kernel result against NaN/infinity; a non-finite value turns the
/// whole dispatch into a failure the executor catches.
#[inline]
pub(crate) fn finite(pass: PassId, cell: usize, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Numeric {
            pass,
            cell,
            message: if value.is_nan() {
                "NaN result".to_string()
            } else {
                "infinite result".to_string()
            },
        })
    }
}

/// Saturation moisture mixing ratio at `temp_k`, kg/kg.
///
/// Magnus-form fit; only the shape matters to the engine (monotone in
/// temperature, small near freezing).
#[inline]
pub(crate) fn saturation_mixing_ratio(temp_k: f64) -> f64 {
    let t_c = temp_k - 273.15;
    0.0038 * (17.625 * t_c / (t_c + 243.04)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_order_is_valid() {
        assert!(validate_order(&standard_pipeline()).is_ok());
    }

    #[test]
    fn reordered_pipeline_is_rejected() {
        // Hydrology before radiation reads SurfaceNext with no producer
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(hydrology::HydrologyPass),
            Box::new(radiation::RadiationPass),
        ];
        assert!(matches!(
            validate_order(&passes),
            Err(Error::OrderViolation {
                pass: PassId::Hydrology,
                ..
            })
        ));
    }

    #[test]
    fn saturation_rises_with_temperature() {
        assert!(saturation_mixing_ratio(300.0) > saturation_mixing_ratio(280.0));
        assert!(saturation_mixing_ratio(250.0) > 0.0);
    }

    #[test]
    fn finite_guard_rejects_nan() {
        assert!(finite(PassId::Radiation, 0, 1.0).is_ok());
        assert!(finite(PassId::Radiation, 3, f64::NAN).is_err());
        assert!(finite(PassId::Diffusion, 1, f64::INFINITY).is_err());
    }
}
