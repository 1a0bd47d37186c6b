//! Structure library: phase identifiers mapped to structures and orientations.

use std::collections::HashMap;
use std::hash::Hash;

/// Euler angles `(phi1, Phi, phi2)` in degrees, rzxz convention.
pub type Orientation = [f64; 3];

/// A single library entry: a structure and its candidate orientations.
#[derive(Clone, Debug, PartialEq)]
pub struct LibraryEntry<T> {
    pub structure: T,
    pub orientations: Vec<Orientation>,
}

/// Mapping from phase identifier to `(structure, orientations)`.
#[derive(Clone, Debug)]
pub struct StructureLibrary<K, T> {
    /// Identifiers in insertion order.
    identifiers: Vec<K>,
    entries: HashMap<K, LibraryEntry<T>>,
}

impl<K, T> StructureLibrary<K, T>
where
    K: Clone + Eq + Hash,
{
    /// Build a library from parallel sequences.
    ///
    /// Fails if `identifiers`, `structures` and `orientations` do not all
    /// have the same length. A repeated identifier keeps its last entry.
    pub fn new(
        identifiers: Vec<K>,
        structures: Vec<T>,
        orientations: Vec<Vec<Orientation>>,
    ) -> Result<Self, LibraryError> {
        if identifiers.len() != structures.len() {
            return Err(LibraryError::StructureCountMismatch {
                identifiers: identifiers.len(),
                structures: structures.len(),
            });
        }
        if identifiers.len() != orientations.len() {
            return Err(LibraryError::OrientationCountMismatch {
                identifiers: identifiers.len(),
                orientations: orientations.len(),
            });
        }

        let mut library = Self {
            identifiers: Vec::with_capacity(identifiers.len()),
            entries: HashMap::with_capacity(identifiers.len()),
        };
        for ((ident, structure), orientations) in
            identifiers.into_iter().zip(structures).zip(orientations)
        {
            library.insert(ident, structure, orientations);
        }

        Ok(library)
    }

    /// Insert or replace a single phase.
    pub fn insert(&mut self, ident: K, structure: T, orientations: Vec<Orientation>) {
        let entry = LibraryEntry {
            structure,
            orientations,
        };
        if self.entries.insert(ident.clone(), entry).is_some() {
            log::debug!("structure library: replacing existing phase entry");
        } else {
            self.identifiers.push(ident);
        }
    }

    /// Look up a phase.
    pub fn get(&self, ident: &K) -> Option<&LibraryEntry<T>> {
        self.entries.get(ident)
    }

    /// Check whether a phase is present.
    pub fn contains(&self, ident: &K) -> bool {
        self.entries.contains_key(ident)
    }

    /// Phase identifiers in insertion order.
    pub fn identifiers(&self) -> &[K] {
        &self.identifiers
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &LibraryEntry<T>)> + '_ {
        self.identifiers
            .iter()
            .filter_map(move |k| self.entries.get(k).map(|e| (k, e)))
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Total number of orientations over all phases.
    pub fn total_orientations(&self) -> usize {
        self.entries.values().map(|e| e.orientations.len()).sum()
    }
}

impl<K, T> Default for StructureLibrary<K, T> {
    fn default() -> Self {
        Self {
            identifiers: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

/// Validation errors raised when building a [`StructureLibrary`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LibraryError {
    #[error("Number of identifiers ({identifiers}) and structures ({structures}) must be the same.")]
    StructureCountMismatch {
        identifiers: usize,
        structures: usize,
    },

    #[error(
        "Number of identifiers ({identifiers}) and orientations ({orientations}) must be the same."
    )]
    OrientationCountMismatch {
        identifiers: usize,
        orientations: usize,
    },
}
