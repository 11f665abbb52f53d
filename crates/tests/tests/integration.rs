//! Integration tests for end-to-end Tellus execution.
//!
//! These drive the assembled engine the way a frame-based host would:
//! play -> tick(n) per frame -> query history, and verify the scheduling,
//! milestone and recording contracts hold through the real pass pipeline.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tellus_runtime::error::{Error, Result};
use tellus_runtime::executor::Executor;
use tellus_runtime::fields::FieldSet;
use tellus_runtime::grid::GridTopology;
use tellus_runtime::orchestrator::{Orchestrator, StepObserver};
use tellus_runtime::passes::{Pass, PassContext};
use tellus_runtime::recorder::Recorder;
use tellus_runtime::types::{BufferRole, Milestone, MilestoneKind, PassId, StepEvent};
use tellus_runtime::SimConfig;
use tellus_tests::TestHarness;

fn quick_config(steps_per_orbit: u32, samples_per_orbit: u32) -> SimConfig {
    SimConfig {
        dt: 600.0,
        year_length: steps_per_orbit as f64 * 600.0,
        rotations_per_year: 2.0,
        steps_per_orbit,
        samples_per_orbit,
        layers: 2,
        ..SimConfig::default()
    }
}

/// After n successful steps: physics_step = n mod steps_per_orbit,
/// orbit = n / steps_per_orbit, one milestone per completed orbit.
#[test]
fn counters_and_milestones_track_step_count() {
    let mut h = TestHarness::new(quick_config(8, 4));
    let milestones: Rc<RefCell<Vec<Milestone>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&milestones);
    h.orchestrator
        .on_milestone(Box::new(move |m| sink.borrow_mut().push(*m)));

    h.play();
    let done = h.tick(21);
    assert_eq!(done, 21);
    assert_eq!(h.orchestrator.physics_step(), 21 % 8);
    assert_eq!(h.orchestrator.orbit(), 21 / 8);

    let milestones = milestones.borrow();
    assert_eq!(milestones.len(), 2);
    for (idx, m) in milestones.iter().enumerate() {
        assert_eq!(m.kind, MilestoneKind::OrbitComplete);
        assert_eq!(m.orbit, idx as u64 + 1);
        assert_eq!(m.physics_step, 0);
    }
}

/// Minimal end-to-end scenario: dt=1, 4 steps per orbit, 2 samples per
/// orbit; one frame of 4 steps produces 4 executor steps, one orbit
/// milestone and exactly two recorder samples.
#[test]
fn minimal_orbit_end_to_end() {
    let config = SimConfig {
        dt: 1.0,
        year_length: 4.0,
        rotations_per_year: 1.0,
        steps_per_orbit: 4,
        samples_per_orbit: 2,
        layers: 2,
        ..SimConfig::default()
    };
    let mut h = TestHarness::new(config);
    let milestones: Rc<RefCell<Vec<Milestone>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&milestones);
    h.orchestrator
        .on_milestone(Box::new(move |m| sink.borrow_mut().push(*m)));

    h.play();
    assert_eq!(h.tick(4), 4);

    assert_eq!(h.orchestrator.executor().steps_advanced(), 4);
    let milestones = milestones.borrow();
    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].orbit, 1);
    assert_eq!(milestones[0].physics_step, 0);

    assert_eq!(h.recorder.samples_written(), 2);
    assert!(h.recorder.has_complete_orbit());
}

/// Post-swap current is reference-identical to pre-swap next: the exchange
/// is a pure pointer swap, even through the full pipeline.
#[test]
fn swap_is_a_reference_exchange() {
    let mut h = TestHarness::new(quick_config(8, 4));
    let next_ptr = h.fields.surface_temp.next().as_ptr();
    h.play();
    assert_eq!(h.tick(1), 1);
    assert_eq!(h.fields.surface_temp.current().as_ptr(), next_ptr);
    assert_eq!(h.fields.surface_temp.generation(), 1);
}

/// tick() while idle or paused performs no executor work at all.
#[test]
fn idle_and_paused_ticks_do_nothing() {
    let mut h = TestHarness::new(quick_config(8, 4));

    assert_eq!(h.tick(10), 0);
    assert_eq!(h.orchestrator.executor().steps_advanced(), 0);

    h.play();
    h.tick(3);
    h.orchestrator.pause();
    let advanced = h.orchestrator.executor().steps_advanced();
    assert_eq!(h.tick(10), 0);
    assert_eq!(h.orchestrator.executor().steps_advanced(), advanced);
}

/// Pass that succeeds until a chosen dispatch, then fails every time.
struct FlakyPass {
    calls: Arc<AtomicUsize>,
    fail_from: usize,
}

impl Pass for FlakyPass {
    fn id(&self) -> PassId {
        PassId::Radiation
    }
    fn reads(&self) -> &'static [BufferRole] {
        &[BufferRole::SurfaceCurrent]
    }
    fn writes(&self) -> &'static [BufferRole] {
        &[BufferRole::SurfaceNext]
    }
    fn dispatch(&self, ctx: &mut PassContext<'_>) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call >= self.fail_from {
            return Err(Error::Numeric {
                pass: PassId::Radiation,
                cell: 0,
                message: "injected failure".to_string(),
            });
        }
        let (cur, next) = ctx.fields.surface_temp.split();
        next.copy_from_slice(cur);
        Ok(())
    }
}

/// A dispatch failure stops the remaining steps of the frame; the error is
/// reported once through the callback and never crosses tick() as a panic.
#[test]
fn first_failure_halts_the_frame() {
    let grid = GridTopology::lattice(1, 4);
    let config = quick_config(8, 4);
    let mut fields = FieldSet::new(grid.cell_count(), config.layers);

    let calls = Arc::new(AtomicUsize::new(0));
    let mut executor = Executor::new(vec![Box::new(FlakyPass {
        calls: Arc::clone(&calls),
        fail_from: 3,
    })])
    .expect("table is valid");

    let reports = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&reports);
    executor.set_error_callback(Box::new(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    }));

    let mut orch = Orchestrator::new(executor);
    orch.play();
    let done = orch.tick(&grid, &config, &mut fields, None, 5);

    assert_eq!(done, 2);
    assert_eq!(reports.load(Ordering::Relaxed), 1);
    assert_eq!(orch.physics_step(), 2);
    // The abandoned step left no partial swap behind
    assert_eq!(fields.surface_temp.generation(), 2);
}

/// Ring fill: the history window opens exactly at the orbit rollover, not
/// when enough samples merely exist.
#[test]
fn history_window_opens_at_rollover() {
    let mut h = TestHarness::new(quick_config(8, 4));
    h.play();

    h.tick(7);
    assert!(!h.recorder.has_complete_orbit());
    assert_eq!(h.recorder.orbit_samples("surface_temperature", 0), None);

    // The wrap step both writes the orbit's last sample and opens the window
    h.tick(1);
    assert!(h.recorder.has_complete_orbit());
    let samples = h
        .recorder
        .orbit_samples("surface_temperature", 0)
        .expect("window is open");
    assert_eq!(samples.len(), 4);
}

/// Integer cadence at scale: 1024 steps per orbit, 256 samples per orbit,
/// linear field. Every recorded sample must land exactly on a step value
/// (blend fraction ~0) with no drift across orbits.
#[test]
fn integer_cadence_never_drifts() {
    let config = SimConfig {
        dt: 1.0,
        year_length: 1024.0,
        rotations_per_year: 1.0,
        steps_per_orbit: 1024,
        samples_per_orbit: 256,
        layers: 1,
        ..SimConfig::default()
    };
    let mut fields = FieldSet::new(2, 1);
    let mut recorder = Recorder::new(&config, 2);
    recorder.track(
        "surface_temperature",
        Box::new(|f: &FieldSet| f.surface_temp.current()),
    );

    for n in 1..=2048u32 {
        fields.surface_temp.set_initial(&[n as f64, n as f64]);
        let event = StepEvent {
            physics_step: n % 1024,
            orbit: (n / 1024) as u64,
        };
        recorder.observe_step(&event, &fields);
    }

    assert_eq!(recorder.samples_written(), 512);
    let samples = recorder
        .orbit_samples("surface_temperature", 0)
        .expect("two orbits recorded");
    assert_eq!(samples.len(), 256);
    // Second orbit: samples due every 4 steps from 1028, recording the
    // previous step's value each time.
    for (k, value) in samples.iter().enumerate() {
        assert_eq!(*value, 1027.0 + 4.0 * k as f64);
    }
}

/// completed is terminal: no resume, no further executor work.
#[test]
fn completed_runs_never_resume() {
    let mut h = TestHarness::new(quick_config(8, 4));
    h.play();
    h.tick(4);
    h.orchestrator.complete();

    h.play();
    assert_eq!(h.tick(8), 0);
    assert_eq!(h.orchestrator.executor().steps_advanced(), 4);
}

/// The full pipeline stays numerically sane over several orbits.
#[test]
fn multi_orbit_run_stays_finite() {
    let mut h = TestHarness::new(quick_config(16, 4));
    h.play();
    h.run_orbits(5);

    assert_eq!(h.orchestrator.orbit(), 5);
    let mean = h.surface_mean();
    assert!(mean.is_finite());
    assert!((150.0..400.0).contains(&mean), "mean surface {mean} K");
    assert!(h.recorder.has_complete_orbit());
    let history = h
        .recorder
        .orbit_samples("surface_temperature", 0)
        .expect("history available");
    assert!(history.iter().all(|v| v.is_finite()));
}
