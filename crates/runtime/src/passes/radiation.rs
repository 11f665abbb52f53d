//! Radiation pass
//!
//! Two-stream shortwave + longwave transfer through the layer stack.
//! Multi-output: next surface temperature, next per-layer temperature, and
//! the absorbed-shortwave diagnostic.

use rayon::prelude::*;

use crate::error::Result;
use crate::types::{BufferRole, PassId};

use super::{finite, Pass, PassContext};

/// Stefan-Boltzmann constant, W/m^2/K^4.
const STEFAN_BOLTZMANN: f64 = 5.670374419e-8;

pub struct RadiationPass;

impl Pass for RadiationPass {
    fn id(&self) -> PassId {
        PassId::Radiation
    }

    fn reads(&self) -> &'static [BufferRole] {
        &[
            BufferRole::SurfaceCurrent,
            BufferRole::HydrologyCurrent,
            BufferRole::LayersCurrent,
            BufferRole::Terrain,
        ]
    }

    fn writes(&self) -> &'static [BufferRole] {
        &[
            BufferRole::SurfaceNext,
            BufferRole::LayersNext,
            BufferRole::SolarDiagnostic,
        ]
    }

    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()> {
        let grid = ctx.grid;
        let p = &ctx.config.physics;
        let dt = ctx.config.dt;
        let declination = p.obliquity * (std::f64::consts::TAU * ctx.orbit.year_progress).sin();
        let subsolar = ctx.orbit.subsolar_longitude.to_radians();

        let fields = &mut *ctx.fields;
        let layers = fields.layer_count();
        let solar_constant = p.solar_constant;

        // Top-of-atmosphere insolation, cell-parallel into the diagnostic
        // buffer; the column sweep below replaces it with the surface value.
        fields
            .absorbed_solar
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, toa)| {
                let lat = grid.latitude(i);
                let hour_angle = grid.longitude(i) - subsolar;
                let mu = lat.sin() * declination.sin()
                    + lat.cos() * declination.cos() * hour_angle.cos();
                *toa = solar_constant * mu.max(0.0);
            });

        let (ts_cur, ts_next) = fields.surface_temp.split();
        let water = fields.water.current();
        let ice = fields.ice.current();
        let mut layer_split: Vec<(&[f64], &mut [f64])> =
            fields.layer_temp.iter_mut().map(|f| f.split()).collect();
        let clouds: Vec<&[f64]> = fields.layer_cloud.iter().map(|f| f.current()).collect();

        // Per-layer net flux accumulator, reused across cells
        let mut net = vec![0.0f64; layers];

        for i in 0..grid.cell_count() {
            net.fill(0.0);

            // The column thins over high terrain
            let column = (-fields.elevation[i] / p.scale_height).exp();
            let sw_extinction = p.shortwave_extinction * column;
            let lw_absorptivity = p.layer_absorptivity * column;

            // Shortwave, top of stack downward: clouds reflect, each layer
            // absorbs a fixed fraction of what gets through.
            let mut flux = fields.absorbed_solar[i];
            for k in (0..layers).rev() {
                let reflected = flux * p.cloud_reflectivity * clouds[k][i];
                let absorbed = (flux - reflected) * sw_extinction;
                net[k] += absorbed;
                flux -= reflected + absorbed;
            }
            let ice_frac = (ice[i] / p.ice_cover_mass).min(1.0);
            let albedo = fields.base_albedo[i]
                + ice_frac * (p.ice_albedo - fields.base_albedo[i]);
            let sw_surface = flux * (1.0 - albedo.clamp(0.0, 1.0));

            // Longwave upward stream: surface emission attenuated by each
            // layer; every layer emits from its own temperature, half up and
            // half down.
            let ts = ts_cur[i];
            let surface_emit = p.surface_emissivity * STEFAN_BOLTZMANN * ts.powi(4);
            let mut up = surface_emit;
            for k in 0..layers {
                let absorbed = up * lw_absorptivity;
                net[k] += absorbed;
                up -= absorbed;
                let emit =
                    lw_absorptivity * STEFAN_BOLTZMANN * layer_split[k].0[i].powi(4);
                net[k] -= 2.0 * emit;
                up += emit;
            }

            // Longwave downward stream: layer emissions absorbed on the way
            // down, remainder reaches the surface as back-radiation.
            let mut down = 0.0;
            for k in (0..layers).rev() {
                down += lw_absorptivity * STEFAN_BOLTZMANN * layer_split[k].0[i].powi(4);
                if k > 0 {
                    let absorbed = down * lw_absorptivity;
                    net[k - 1] += absorbed;
                    down -= absorbed;
                }
            }
            let lw_down = p.surface_emissivity * down;

            let capacity =
                p.surface_heat_capacity + (water[i] + ice[i]) * p.water_specific_heat;
            let ts_new = ts + (sw_surface + lw_down - surface_emit) * dt / capacity;
            ts_next[i] = finite(PassId::Radiation, i, ts_new)?;

            for k in 0..layers {
                let tl_new = layer_split[k].0[i] + net[k] * dt / p.layer_heat_capacity;
                layer_split[k].1[i] = finite(PassId::Radiation, i, tl_new)?;
            }

            fields.absorbed_solar[i] = sw_surface;
        }

        Ok(())
    }
}
