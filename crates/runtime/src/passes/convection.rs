//! Vertical mixing pass
//!
//! Convective adjustment where the lapse rate exceeds the adiabatic
//! threshold, with moisture transport and cloud-fraction update. Operates on
//! per-layer next-generation state as updated so far this step; each column
//! is independent.

use crate::error::Result;
use crate::types::{BufferRole, PassId};

use super::{finite, saturation_mixing_ratio, Pass, PassContext};

pub struct ConvectionPass;

impl Pass for ConvectionPass {
    fn id(&self) -> PassId {
        PassId::Convection
    }

    fn reads(&self) -> &'static [BufferRole] {
        &[BufferRole::LayersNext]
    }

    fn writes(&self) -> &'static [BufferRole] {
        &[BufferRole::LayersNext]
    }

    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()> {
        let p = &ctx.config.physics;
        let fields = &mut *ctx.fields;
        let cells = fields.cell_count();
        let layers = fields.layer_count();

        let mut temps: Vec<&mut [f64]> =
            fields.layer_temp.iter_mut().map(|f| f.next_mut()).collect();
        let mut moist: Vec<&mut [f64]> = fields
            .layer_moisture
            .iter_mut()
            .map(|f| f.next_mut())
            .collect();
        let mut clouds: Vec<&mut [f64]> =
            fields.layer_cloud.iter_mut().map(|f| f.next_mut()).collect();

        for i in 0..cells {
            // Bottom-up sweep: where a pair is unstable, move heat and
            // moisture upward. Equal layer capacities keep the exchange
            // energy-conserving.
            for k in 0..layers.saturating_sub(1) {
                let lapse = temps[k][i] - temps[k + 1][i];
                if lapse > p.adiabatic_lapse {
                    let excess = lapse - p.adiabatic_lapse;
                    let transfer = 0.5 * excess * p.mixing_strength;
                    temps[k][i] -= transfer;
                    temps[k + 1][i] += transfer;

                    let severity = (excess / p.adiabatic_lapse).min(1.0);
                    let lifted = moist[k][i] * p.moisture_mixing * severity;
                    moist[k][i] -= lifted;
                    moist[k + 1][i] += lifted;
                }
            }

            for k in 0..layers {
                let t = finite(PassId::Convection, i, temps[k][i])?;
                let rh = moist[k][i] / saturation_mixing_ratio(t);
                clouds[k][i] = ((rh - p.condensation_humidity)
                    / (1.0 - p.condensation_humidity))
                    .clamp(0.0, 1.0);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::fields::FieldSet;
    use crate::grid::GridTopology;
    use crate::types::OrbitalState;

    fn run_once(fields: &mut FieldSet, config: &SimConfig) {
        let grid = GridTopology::lattice(1, fields.cell_count());
        let orbit = OrbitalState::default();
        let mut ctx = PassContext {
            grid: &grid,
            config,
            orbit: &orbit,
            fields,
        };
        ConvectionPass.dispatch(&mut ctx).expect("dispatch succeeds");
    }

    #[test]
    fn unstable_column_relaxes_toward_adiabat() {
        let config = SimConfig::default();
        let mut fields = FieldSet::new(1, 2);
        fields.layer_temp[0].set_initial(&[300.0]);
        fields.layer_temp[1].set_initial(&[270.0]);
        run_once(&mut fields, &config);

        let lower = fields.layer_temp[0].next()[0];
        let upper = fields.layer_temp[1].next()[0];
        assert!(lower < 300.0);
        assert!(upper > 270.0);
        assert!(lower - upper < 30.0);
        // Column energy conserved
        assert!((lower + upper - 570.0).abs() < 1e-9);
    }

    #[test]
    fn stable_column_is_untouched() {
        let config = SimConfig::default();
        let mut fields = FieldSet::new(1, 2);
        fields.layer_temp[0].set_initial(&[280.0]);
        fields.layer_temp[1].set_initial(&[278.0]);
        run_once(&mut fields, &config);

        assert_eq!(fields.layer_temp[0].next()[0], 280.0);
        assert_eq!(fields.layer_temp[1].next()[0], 278.0);
    }

    #[test]
    fn convection_lifts_moisture() {
        let config = SimConfig::default();
        let mut fields = FieldSet::new(1, 2);
        fields.layer_temp[0].set_initial(&[310.0]);
        fields.layer_temp[1].set_initial(&[270.0]);
        fields.layer_moisture[0].set_initial(&[0.010]);
        run_once(&mut fields, &config);

        assert!(fields.layer_moisture[0].next()[0] < 0.010);
        assert!(fields.layer_moisture[1].next()[0] > 0.0);
        // Mass conserved between the two layers
        let total =
            fields.layer_moisture[0].next()[0] + fields.layer_moisture[1].next()[0];
        assert!((total - 0.010).abs() < 1e-12);
    }

    #[test]
    fn saturated_layer_forms_cloud() {
        let config = SimConfig::default();
        let mut fields = FieldSet::new(1, 1);
        fields.layer_temp[0].set_initial(&[285.0]);
        let near_saturation = saturation_mixing_ratio(285.0) * 0.95;
        fields.layer_moisture[0].set_initial(&[near_saturation]);
        run_once(&mut fields, &config);

        let cloud = fields.layer_cloud[0].next()[0];
        assert!(cloud > 0.0 && cloud <= 1.0);
    }

    #[test]
    fn dry_layer_stays_clear() {
        let config = SimConfig::default();
        let mut fields = FieldSet::new(1, 1);
        run_once(&mut fields, &config);
        assert_eq!(fields.layer_cloud[0].next()[0], 0.0);
    }
}
