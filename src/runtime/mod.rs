//! Runtime for batch template simulation.

pub mod executor;
pub mod templates;

pub use executor::{Runtime, RuntimeConfig, RuntimeError, WAVELENGTH_200KV};
pub use templates::{Template, TemplateLibrary};
