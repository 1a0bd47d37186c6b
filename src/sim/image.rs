//! Kinematic diffraction image formation with precession averaging.

use super::fourier::power_spectrum;
use super::probe::ProbeFunction;
use super::rotation::Precession;
use super::scattering::ScatteringTable;
use super::sphere::{grid2sphere, reciprocal_axis, Curvature};
use super::volume::{ProbeEvaluation, ProbeSampler};
use crate::data::{AtomSet, AtomSetError, SpeciesKey};
use nalgebra::Matrix3;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rustfft::FftPlanner;

/// Imaging geometry: real-space grid, wavelength and precession.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    /// Two or three ascending, uniformly spaced axes.
    pub axes: Vec<Array1<f64>>,
    /// Electron wavelength in the axes' length unit; 0 requests a flat
    /// (no curvature) detector plane.
    pub wavelength: f64,
    pub precession: Precession,
}

impl Geometry {
    pub fn new(axes: Vec<Array1<f64>>, wavelength: f64, precession: Precession) -> Self {
        Self {
            axes,
            wavelength,
            precession,
        }
    }

    /// Output image shape, `(len(axes[0]), len(axes[1]))`.
    pub fn image_shape(&self) -> (usize, usize) {
        (
            self.axes.first().map_or(0, |a| a.len()),
            self.axes.get(1).map_or(0, |a| a.len()),
        )
    }

    pub fn curvature(&self) -> Curvature {
        Curvature::from_wavelength(self.wavelength)
    }

    /// Check the geometry before simulating.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(2..=3).contains(&self.axes.len()) {
            return Err(SimulationError::AxisCount(self.axes.len()));
        }
        for (index, axis) in self.axes.iter().enumerate() {
            if axis.is_empty() {
                return Err(SimulationError::EmptyAxis { index });
            }
            if axis.iter().any(|v| !v.is_finite()) {
                return Err(SimulationError::NonFiniteAxis { index });
            }
            if !is_uniform_ascending(axis) {
                return Err(SimulationError::UnorderedAxis { index });
            }
        }
        if !(self.wavelength >= 0.0) || !self.wavelength.is_finite() {
            return Err(SimulationError::InvalidWavelength(self.wavelength));
        }
        Ok(())
    }

    /// The three real-space axes; a two-axis geometry gets a single `z = 0`.
    fn volume_axes(&self) -> Vec<Array1<f64>> {
        let mut axes = self.axes.clone();
        if axes.len() == 2 {
            axes.push(Array1::zeros(1));
        }
        axes
    }
}

/// Knobs for the image former.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Probe evaluation strategy.
    pub probe_evaluation: ProbeEvaluation,
    /// Run precession samples in parallel.
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            probe_evaluation: ProbeEvaluation::Precompute,
            parallel: true,
        }
    }
}

/// Errors raised by the simulation kernel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("Geometry needs 2 or 3 axes, got {0}")]
    AxisCount(usize),

    #[error("Axis {index} is empty")]
    EmptyAxis { index: usize },

    #[error("Axis {index} contains non-finite values")]
    NonFiniteAxis { index: usize },

    #[error("Axis {index} must be strictly ascending with uniform spacing")]
    UnorderedAxis { index: usize },

    #[error("Wavelength must be finite and non-negative, got {0}")]
    InvalidWavelength(f64),

    #[error(transparent)]
    Atoms(#[from] AtomSetError),
}

/// Reusable image former bound to a scattering table and a probe.
pub struct DiffractionSimulator<'a, T: ?Sized, P: ?Sized> {
    table: &'a T,
    probe: &'a P,
    config: SimulationConfig,
}

impl<'a, T: ?Sized, P: ?Sized> DiffractionSimulator<'a, T, P>
where
    P: ProbeFunction,
{
    pub fn new(table: &'a T, probe: &'a P, config: SimulationConfig) -> Self {
        Self {
            table,
            probe,
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate the diffraction image of `atoms` for `geometry`.
    pub fn simulate<S>(
        &self,
        atoms: &AtomSet<S>,
        geometry: &Geometry,
    ) -> Result<Array2<f64>, SimulationError>
    where
        S: SpeciesKey,
        T: ScatteringTable<S>,
    {
        geometry.validate()?;

        let unknown = self.unknown_species_count(atoms);
        if unknown > 0 {
            log::warn!(
                "{unknown} of {} atoms have no scattering data and are ignored",
                atoms.len()
            );
        }

        Ok(self.form_image(atoms, geometry, geometry.curvature()))
    }

    /// Number of atoms whose species the scattering table does not know.
    pub fn unknown_species_count<S>(&self, atoms: &AtomSet<S>) -> usize
    where
        S: SpeciesKey,
        T: ScatteringTable<S>,
    {
        atoms
            .iter()
            .filter(|(_, species)| !self.table.contains(species))
            .count()
    }

    /// Image formation for an explicit curvature, bypassing the wavelength.
    pub fn form_image<S>(
        &self,
        atoms: &AtomSet<S>,
        geometry: &Geometry,
        curvature: Curvature,
    ) -> Array2<f64>
    where
        S: SpeciesKey,
        T: ScatteringTable<S>,
    {
        let axes = geometry.volume_axes();
        let recip: Vec<Array1<f64>> = axes.iter().map(reciprocal_axis).collect();
        let rotations = geometry.precession.rotations();
        let sampler = ProbeSampler::new(self.config.probe_evaluation, self.probe, &axes);
        let spacing: Vec<f64> = axes.iter().map(axis_spacing).collect();

        log::debug!(
            "forming {:?} image: {} atoms, {} precession samples, {:?}",
            geometry.image_shape(),
            atoms.len(),
            rotations.len(),
            curvature
        );

        // Rotating the structure by R^T is rotating the beam by R.
        let sample = |rotation: &Matrix3<f64>| -> Array2<f64> {
            let positions = atoms.rotated_positions(&rotation.transpose());
            let density = sampler.illuminate(positions.view(), atoms.species(), self.table, &axes);
            let mut planner = FftPlanner::new();

            match curvature {
                Curvature::Flat => {
                    let projected = density.sum_axis(Axis(2)) * spacing[2];
                    power_spectrum(&projected, spacing[0] * spacing[1], &mut planner)
                }
                Curvature::Sphere { radius } => {
                    let dv = spacing[0] * spacing[1] * spacing[2];
                    let volume = power_spectrum(&density, dv, &mut planner);
                    grid2sphere(volume.view(), &recip, None, Some(radius))
                }
            }
        };

        let shape = geometry.image_shape();
        let total = if self.config.parallel && rotations.len() > 1 {
            rotations
                .par_iter()
                .map(sample)
                .reduce(|| Array2::zeros(shape), |a, b| a + b)
        } else {
            rotations
                .iter()
                .map(sample)
                .fold(Array2::zeros(shape), |a, b| a + b)
        };

        total / rotations.len() as f64
    }
}

/// Relative tolerance on the spacing of consecutive axis samples.
const SPACING_TOLERANCE: f64 = 1e-6;

/// Strictly increasing with equal steps; a single sample always passes.
fn is_uniform_ascending(axis: &Array1<f64>) -> bool {
    if axis.len() < 2 {
        return true;
    }
    let step = axis[1] - axis[0];
    step > 0.0
        && axis
            .windows(2)
            .into_iter()
            .all(|w| ((w[1] - w[0]) - step).abs() <= SPACING_TOLERANCE * step)
}

/// Grid spacing of an axis; a single-sample axis counts as unit thickness.
fn axis_spacing(axis: &Array1<f64>) -> f64 {
    if axis.len() < 2 {
        1.0
    } else {
        axis[1] - axis[0]
    }
}

/// Simulate a kinematic diffraction image.
///
/// `coords` has shape `(n_atoms, 3)` and `species` one entry per atom.
/// The image has shape `(len(axes[0]), len(axes[1]))` and is the mean over
/// the precession schedule of `|F|^2` sampled on the Ewald sphere of radius
/// `1 / wavelength` (flat plane when `wavelength == 0`).
#[allow(clippy::too_many_arguments)]
pub fn get_diffraction_image<S, T, P>(
    coords: ArrayView2<'_, f64>,
    species: &[S],
    probe: &P,
    table: &T,
    axes: &[Array1<f64>],
    wavelength: f64,
    precession: Precession,
    evaluation: ProbeEvaluation,
) -> Result<Array2<f64>, SimulationError>
where
    S: SpeciesKey,
    T: ScatteringTable<S> + ?Sized,
    P: ProbeFunction + ?Sized,
{
    let atoms = AtomSet::new(coords.to_owned(), species.to_vec())?;
    let geometry = Geometry::new(axes.to_vec(), wavelength, precession);
    let config = SimulationConfig {
        probe_evaluation: evaluation,
        ..SimulationConfig::default()
    };

    DiffractionSimulator::new(table, probe, config).simulate(&atoms, &geometry)
}
