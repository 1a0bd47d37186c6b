//! Runtime for batch template simulation over a structure library.

use super::templates::Template;
use crate::data::{AtomSet, LibraryError, Orientation, SpeciesKey, StructureLibrary};
use crate::ffi::types::DiffsimStatus;
use crate::sim::{
    euler_rzxz, DiffractionSimulator, Geometry, Precession, ProbeFunction, ScatteringTable,
    SimulationConfig, SimulationError,
};
use ndarray::Array1;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime as TokioRuntime;

/// Wavelength of 200 kV electrons, in angstrom.
pub const WAVELENGTH_200KV: f64 = 0.02508;

/// Configuration for the runtime.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Number of async worker threads.
    pub worker_count: usize,
    /// Imaging geometry shared by every template.
    pub geometry: Geometry,
    /// Image former settings.
    pub simulation: SimulationConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            geometry: Geometry::new(
                vec![
                    Array1::linspace(-16.0, 16.0, 64),
                    Array1::linspace(-16.0, 16.0, 64),
                    Array1::linspace(-8.0, 8.0, 32),
                ],
                WAVELENGTH_200KV,
                Precession::none(),
            ),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Errors raised by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Invalid structure library: {0}")]
    Library(#[from] LibraryError),

    #[error("Failed to start async runtime: {0}")]
    Io(#[from] std::io::Error),
}

/// One pending simulation: a structure in one orientation.
struct Job<K, S> {
    phase: K,
    orientation: Orientation,
    atoms: Arc<AtomSet<S>>,
}

/// Main runtime for template generation.
pub struct Runtime<K, S> {
    /// Configuration.
    config: RuntimeConfig,
    /// Per-species scattering model.
    table: Arc<dyn ScatteringTable<S>>,
    /// Beam probe.
    probe: Arc<dyn ProbeFunction>,
    /// Jobs waiting to be simulated.
    pending: Vec<Job<K, S>>,
    /// Templates produced by synchronous runs.
    completed: Mutex<Vec<Template<K>>>,
    /// Tokio runtime for async execution.
    tokio_runtime: TokioRuntime,
    /// Cancellation flag.
    cancelled: Arc<AtomicBool>,
}

impl<K, S> Runtime<K, S>
where
    K: Clone + Send + Sync + 'static,
    S: SpeciesKey + 'static,
{
    /// Create a new runtime.
    pub fn new(
        config: RuntimeConfig,
        table: Arc<dyn ScatteringTable<S>>,
        probe: Arc<dyn ProbeFunction>,
    ) -> Result<Self, RuntimeError> {
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_count.max(1))
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            table,
            probe,
            pending: Vec::new(),
            completed: Mutex::new(Vec::new()),
            tokio_runtime,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    /// Queue one job per orientation of a single phase.
    pub fn add_phase(&mut self, phase: K, atoms: AtomSet<S>, orientations: &[Orientation]) {
        let atoms = Arc::new(atoms);
        self.pending.extend(orientations.iter().map(|&orientation| Job {
            phase: phase.clone(),
            orientation,
            atoms: atoms.clone(),
        }));
    }

    /// Queue every (phase, orientation) pair of a library.
    pub fn add_library(&mut self, library: &StructureLibrary<K, AtomSet<S>>)
    where
        K: Eq + std::hash::Hash,
    {
        for (phase, entry) in library.iter() {
            self.add_phase(phase.clone(), entry.structure.clone(), &entry.orientations);
        }
    }

    /// Number of jobs not yet simulated.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of templates held from synchronous runs.
    pub fn completed_count(&self) -> usize {
        self.completed.lock().map_or(0, |c| c.len())
    }

    /// Simulate all pending jobs in parallel (blocking).
    ///
    /// Runs to completion; [`Runtime::cancel`] only affects `run_async`.
    /// Jobs that fail stay queued.
    pub fn run_sync(&mut self) -> Result<(), RuntimeError> {
        self.config.geometry.validate()?;

        let jobs = std::mem::take(&mut self.pending);
        log::debug!("running {} template jobs", jobs.len());

        let table = self.table.as_ref();
        let probe = self.probe.as_ref();
        let geometry = &self.config.geometry;
        let simulation = self.config.simulation;

        let results: Vec<Result<Template<K>, SimulationError>> = jobs
            .par_iter()
            .map(|job| simulate_job(job, table, probe, geometry, simulation))
            .collect();

        let mut templates = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (job, result) in jobs.into_iter().zip(results) {
            match result {
                Ok(template) => templates.push(template),
                Err(err) => {
                    self.pending.push(job);
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Ok(mut completed) = self.completed.lock() {
            completed.extend(templates);
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Simulate all pending jobs on the async runtime with callbacks.
    ///
    /// Returns immediately. `on_progress(done, total)` and `on_template`
    /// fire after every job, `on_complete` once at the end.
    pub fn run_async<F, P, C>(
        &mut self,
        on_complete: F,
        on_progress: P,
        on_template: C,
    ) -> Result<(), RuntimeError>
    where
        F: FnOnce(DiffsimStatus) + Send + 'static,
        P: Fn(usize, usize) + Send + Sync + 'static,
        C: Fn(Template<K>) + Send + Sync + 'static,
    {
        self.config.geometry.validate()?;
        self.cancelled.store(false, Ordering::SeqCst);

        let jobs = std::mem::take(&mut self.pending);
        let total = jobs.len();

        let table = self.table.clone();
        let probe = self.probe.clone();
        let geometry = Arc::new(self.config.geometry.clone());
        let simulation = self.config.simulation;
        let cancelled = self.cancelled.clone();

        self.tokio_runtime.spawn(async move {
            let mut done = 0usize;

            for job in jobs {
                if cancelled.load(Ordering::SeqCst) {
                    on_complete(DiffsimStatus::Cancelled);
                    return;
                }

                let (table, probe, geometry) = (table.clone(), probe.clone(), geometry.clone());
                let result = tokio::task::spawn_blocking(move || {
                    simulate_job(&job, table.as_ref(), probe.as_ref(), &geometry, simulation)
                })
                .await;

                match result {
                    Ok(Ok(template)) => {
                        done += 1;
                        on_progress(done, total);
                        on_template(template);
                    }
                    Ok(Err(err)) => {
                        log::warn!("template simulation failed: {err}");
                        on_complete(DiffsimStatus::RuntimeError);
                        return;
                    }
                    Err(err) => {
                        log::warn!("template worker panicked: {err}");
                        on_complete(DiffsimStatus::RuntimeError);
                        return;
                    }
                }
            }

            on_complete(DiffsimStatus::Ok);
        });

        Ok(())
    }

    /// Remove and return all templates from synchronous runs.
    pub fn take_templates(&mut self) -> Vec<Template<K>> {
        self.completed
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }

    /// Pop one finished template, oldest first.
    pub fn pop_template(&mut self) -> Option<Template<K>> {
        let mut completed = self.completed.lock().ok()?;
        if completed.is_empty() {
            None
        } else {
            Some(completed.remove(0))
        }
    }

    /// Stop an async run before its next job.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reset the runtime for reuse.
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Ok(mut completed) = self.completed.lock() {
            completed.clear();
        }
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Rotate a structure into its orientation and simulate it.
fn simulate_job<K: Clone, S: SpeciesKey>(
    job: &Job<K, S>,
    table: &dyn ScatteringTable<S>,
    probe: &dyn ProbeFunction,
    geometry: &Geometry,
    simulation: SimulationConfig,
) -> Result<Template<K>, SimulationError> {
    let [phi1, big_phi, phi2] = job.orientation;
    let oriented = job.atoms.rotated(&euler_rzxz(phi1, big_phi, phi2));
    let image = DiffractionSimulator::new(table, probe, simulation).simulate(&oriented, geometry)?;

    Ok(Template {
        phase: job.phase.clone(),
        orientation: job.orientation,
        image,
    })
}
