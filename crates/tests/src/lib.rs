//! Integration test harness for Tellus.
//!
//! Assembles a full simulation the way a host would: lattice grid, field
//! set, standard executor pipeline, orchestrator and a recorder tracking the
//! surface fields. Tests drive it frame by frame.

use tellus_runtime::executor::Executor;
use tellus_runtime::fields::FieldSet;
use tellus_runtime::grid::GridTopology;
use tellus_runtime::orchestrator::Orchestrator;
use tellus_runtime::recorder::Recorder;
use tellus_runtime::SimConfig;

/// A complete simulation with all collaborators wired up.
pub struct TestHarness {
    pub grid: GridTopology,
    pub config: SimConfig,
    pub fields: FieldSet,
    pub orchestrator: Orchestrator,
    pub recorder: Recorder,
}

impl TestHarness {
    /// Build a small world under `config`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; tests supply valid configs.
    pub fn new(config: SimConfig) -> Self {
        config.validate().expect("test config is valid");
        let grid = GridTopology::lattice(3, 6);
        let mut fields = FieldSet::new(grid.cell_count(), config.layers);
        // Some open water so hydrology and clouds have work to do
        fields
            .water
            .set_initial(&vec![25.0; grid.cell_count()]);

        let orchestrator = Orchestrator::new(Executor::standard());
        let mut recorder = Recorder::new(&config, grid.cell_count());
        recorder.track(
            "surface_temperature",
            Box::new(|f: &FieldSet| f.surface_temp.current()),
        );
        recorder.track("surface_water", Box::new(|f: &FieldSet| f.water.current()));

        Self {
            grid,
            config,
            fields,
            orchestrator,
            recorder,
        }
    }

    /// Start the run.
    pub fn play(&mut self) {
        self.orchestrator.play();
    }

    /// Advance one host frame of up to `steps` physics steps, with the
    /// recorder attached as the step observer.
    pub fn tick(&mut self, steps: u32) -> u32 {
        self.orchestrator.tick(
            &self.grid,
            &self.config,
            &mut self.fields,
            Some(&mut self.recorder),
            steps,
        )
    }

    /// Run whole orbits, one orbit per frame.
    pub fn run_orbits(&mut self, orbits: u64) {
        while self.orchestrator.orbit() < orbits {
            let done = self.tick(self.config.steps_per_orbit);
            assert!(done > 0, "simulation stalled before orbit {orbits}");
        }
    }

    /// Area-unweighted mean surface temperature, K.
    pub fn surface_mean(&self) -> f64 {
        let current = self.fields.surface_temp.current();
        current.iter().sum::<f64>() / current.len() as f64
    }
}
