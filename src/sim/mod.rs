//! Kinematic electron diffraction simulation kernel.

pub mod fourier;
pub mod image;
pub mod probe;
pub mod rotation;
pub mod scattering;
pub mod sphere;
pub mod volume;

pub use image::{get_diffraction_image, DiffractionSimulator, Geometry, SimulationConfig, SimulationError};
pub use probe::{DiscProbe, GaussianProbe, PlaneWave, ProbeFunction, SquareProbe};
pub use rotation::{azimuth_mat, euler_rzxz, precess_mat, tilt_mat, Precession};
pub use scattering::{GaussianParams, GaussianTable, ScatteringTable};
pub use sphere::{grid2sphere, reciprocal_axis, sphere_points, Curvature};
pub use volume::{ProbeEvaluation, ProbeSampler};
