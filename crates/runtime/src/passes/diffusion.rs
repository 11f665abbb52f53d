//! Diffusion pass
//!
//! Lateral heat conduction over the static neighbour topology. The
//! just-updated surface temperature is staged into a working slot first so
//! every cell's update reads the same snapshot; writing directly while
//! reading neighbours would alias the buffer being produced.

use rayon::prelude::*;

use crate::error::Result;
use crate::types::{BufferRole, PassId};

use super::{finite, Pass, PassContext};

pub struct DiffusionPass;

impl Pass for DiffusionPass {
    fn id(&self) -> PassId {
        PassId::Diffusion
    }

    fn reads(&self) -> &'static [BufferRole] {
        &[
            BufferRole::WorkingSurface,
            BufferRole::SurfaceNext,
            BufferRole::HydrologyNext,
        ]
    }

    fn writes(&self) -> &'static [BufferRole] {
        &[BufferRole::SurfaceNext]
    }

    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()> {
        let grid = ctx.grid;
        let p = &ctx.config.physics;
        let dt = ctx.config.dt;
        let fields = &mut *ctx.fields;

        fields.working.stage(0, fields.surface_temp.next());
        let staged = fields.working.slot(0);
        let water = fields.water.next();
        let ice = fields.ice.next();
        let base_capacity = p.surface_heat_capacity;

        fields
            .surface_temp
            .next_mut()
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(i, out)| -> Result<()> {
                let neighbors = grid.neighbors(i);
                if neighbors.is_empty() {
                    *out = staged[i];
                    return Ok(());
                }
                let mut sum = 0.0;
                for &n in neighbors {
                    sum += staged[n as usize];
                }
                let mean = sum / neighbors.len() as f64;

                // Wet cells carry more thermal mass and equilibrate slower
                let relative_capacity = (base_capacity
                    + (water[i] + ice[i]) * p.water_specific_heat)
                    / base_capacity;
                let coefficient = (p.diffusivity * dt / relative_capacity).min(0.5);

                *out = finite(
                    PassId::Diffusion,
                    i,
                    staged[i] + coefficient * (mean - staged[i]),
                )?;
                Ok(())
            })
    }
}
