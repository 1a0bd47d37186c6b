//! Data structures for diffraction simulation.

pub mod atoms;
pub mod library;

pub use atoms::{AtomSet, AtomSetError, SpeciesKey};
pub use library::{LibraryEntry, LibraryError, Orientation, StructureLibrary};
