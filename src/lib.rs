//! diffsimrs - Kinematic electron diffraction simulation.
//!
//! This crate simulates diffraction patterns of atomic structures under a
//! finite beam probe, with:
//!
//! - Real-space discretisation of the illuminated scattering density
//! - FFT-based intensity, sampled on the Ewald sphere or a flat detector
//! - Precession averaging, parallelised with rayon
//! - Batch template generation over a structure library, sync or async
//! - FFI layer for Python (cffi) and other language bindings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     FFI Layer (diffsimrs.h)         │
//! │  C-compatible functions & types     │
//! └─────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │          Template Runtime           │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │ Structure │  │   Template    │  │
//! │  │  Library  │  │   Library     │  │
//! │  └───────────┘  └───────────────┘  │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │  Rayon    │  │    Tokio      │  │
//! │  │  (sync)   │  │   Workers     │  │
//! │  └───────────┘  └───────────────┘  │
//! └─────────────────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │          Simulation Kernel          │
//! │  rotation → volume → fourier →      │
//! │  sphere → precession mean           │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use diffsimrs::sim::{get_diffraction_image, GaussianTable, Precession, ProbeEvaluation, SquareProbe};
//! use ndarray::{array, Array1};
//!
//! let coords = array![[0.0, 0.0, 0.0], [1.36, 1.36, 1.36]];
//! let axes = vec![
//!     Array1::linspace(-10.0, 10.0, 64),
//!     Array1::linspace(-10.0, 10.0, 64),
//!     Array1::linspace(-5.0, 5.0, 32),
//! ];
//! let image = get_diffraction_image(
//!     coords.view(),
//!     &[14u8, 14],
//!     &SquareProbe::new(8.0),
//!     &GaussianTable::standard(),
//!     &axes,
//!     0.02508,
//!     Precession::new(1.0, 10),
//!     ProbeEvaluation::Precompute,
//! )?;
//! assert_eq!(image.dim(), (64, 64));
//! # Ok::<(), diffsimrs::sim::SimulationError>(())
//! ```
//!
//! # FFI Usage
//!
//! ```c
//! // Create runtime
//! RuntimeHandle runtime;
//! diffsim_runtime_create(NULL, NULL, &runtime);
//!
//! // Queue a phase in two orientations
//! diffsim_runtime_add_phase(runtime, "Si", coords, species, n_atoms, eulers, 2);
//!
//! // Run with callbacks
//! diffsim_runtime_run_async(runtime, on_complete, on_progress, on_template, user_data);
//!
//! // Cleanup
//! diffsim_runtime_free(runtime);
//! ```

pub mod data;
pub mod ffi;
pub mod runtime;
pub mod sim;

// Re-export commonly used items
pub use data::{AtomSet, AtomSetError, LibraryError, Orientation, SpeciesKey, StructureLibrary};
pub use runtime::{Runtime, RuntimeConfig, RuntimeError, Template, TemplateLibrary};
pub use sim::{
    get_diffraction_image, grid2sphere, precess_mat, DiffractionSimulator, Geometry, Precession,
    ProbeEvaluation, ProbeFunction, ScatteringTable, SimulationConfig, SimulationError,
};

// Re-export FFI types for cbindgen
pub use ffi::runtime::*;
pub use ffi::simulate::*;
pub use ffi::types::*;
