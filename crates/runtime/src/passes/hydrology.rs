//! Hydrology pass
//!
//! Freeze/thaw and evaporation. Consumes the radiation pass's surface and
//! bottom-layer output, writes next hydrology and corrects both for latent
//! heat. All next-generation reads are element-wise at the cell being
//! written.

use crate::error::Result;
use crate::types::{BufferRole, PassId};

use super::{finite, saturation_mixing_ratio, Pass, PassContext};

pub struct HydrologyPass;

impl Pass for HydrologyPass {
    fn id(&self) -> PassId {
        PassId::Hydrology
    }

    fn reads(&self) -> &'static [BufferRole] {
        &[
            BufferRole::SurfaceNext,
            BufferRole::HydrologyCurrent,
            BufferRole::LayersCurrent,
            BufferRole::LayersNext,
        ]
    }

    fn writes(&self) -> &'static [BufferRole] {
        &[
            BufferRole::HydrologyNext,
            BufferRole::SurfaceNext,
            BufferRole::LayersNext,
        ]
    }

    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()> {
        let p = &ctx.config.physics;
        let dt = ctx.config.dt;
        let fields = &mut *ctx.fields;
        let cells = fields.cell_count();
        let layers = fields.layer_count();

        let ts_next = fields.surface_temp.next_mut();
        let (w_cur, w_next) = fields.water.split();
        let (ice_cur, ice_next) = fields.ice.split();
        let mut moist_split: Vec<(&[f64], &mut [f64])> =
            fields.layer_moisture.iter_mut().map(|f| f.split()).collect();
        let bottom_temp = fields.layer_temp[0].next_mut();

        for i in 0..cells {
            // Carry moisture forward; evaporation and condensation below
            // only touch the bottom layer.
            for split in moist_split.iter_mut().take(layers) {
                split.1[i] = split.0[i];
            }

            let mut ts = ts_next[i];
            let mut water = w_cur[i];
            let mut ice = ice_cur[i];
            let capacity =
                p.surface_heat_capacity + (water + ice) * p.water_specific_heat;

            // Phase transition toward the side the temperature demands,
            // rate-limited and bounded by the available reservoir.
            if ts < p.freezing_point {
                let frozen = (p.phase_rate * (p.freezing_point - ts) * dt).min(water);
                water -= frozen;
                ice += frozen;
                ts += frozen * p.latent_heat_fusion / capacity;
            } else {
                let melted = (p.phase_rate * (ts - p.freezing_point) * dt).min(ice);
                ice -= melted;
                water += melted;
                ts -= melted * p.latent_heat_fusion / capacity;
            }

            // Evaporation from open water into the bottom layer
            if water > 0.0 && ts > p.freezing_point {
                let deficit =
                    (saturation_mixing_ratio(ts) - moist_split[0].1[i]).max(0.0);
                let evaporated = (p.evaporation_rate * deficit * dt).min(water);
                water -= evaporated;
                moist_split[0].1[i] += evaporated / p.layer_air_mass;
                ts -= evaporated * p.latent_heat_vapor / capacity;
            }

            // Supersaturated bottom air condenses: rain returns to the
            // surface reservoir, latent heat stays in the layer.
            let mut t_bottom = bottom_temp[i];
            let saturation = saturation_mixing_ratio(t_bottom);
            if moist_split[0].1[i] > saturation {
                let condensed_mass =
                    (moist_split[0].1[i] - saturation) * p.layer_air_mass;
                moist_split[0].1[i] = saturation;
                water += condensed_mass;
                t_bottom +=
                    condensed_mass * p.latent_heat_vapor / p.layer_heat_capacity;
            }

            ts_next[i] = finite(PassId::Hydrology, i, ts)?;
            bottom_temp[i] = finite(PassId::Hydrology, i, t_bottom)?;
            w_next[i] = water;
            ice_next[i] = ice;
        }

        Ok(())
    }
}
