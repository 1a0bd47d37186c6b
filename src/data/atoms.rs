//! Atomic structure data passed to the simulation kernel.

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::hash::Hash;

/// Marker for species keys usable by the kernel (atomic numbers, labels, ...).
pub trait SpeciesKey: Copy + Eq + Hash + Send + Sync {}

impl<T: Copy + Eq + Hash + Send + Sync> SpeciesKey for T {}

/// An ordered set of atoms: one `(x, y, z)` row and one species per atom.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomSet<S> {
    /// Atom positions, shape `(n_atoms, 3)`.
    positions: Array2<f64>,

    /// Species of each atom.
    species: Vec<S>,
}

impl<S: SpeciesKey> AtomSet<S> {
    /// Create an atom set from an `(n, 3)` position array and `n` species.
    pub fn new(positions: Array2<f64>, species: Vec<S>) -> Result<Self, AtomSetError> {
        if positions.ncols() != 3 {
            return Err(AtomSetError::NotThreeDimensional {
                columns: positions.ncols(),
            });
        }
        if positions.nrows() != species.len() {
            return Err(AtomSetError::LengthMismatch {
                positions: positions.nrows(),
                species: species.len(),
            });
        }

        Ok(Self { positions, species })
    }

    /// Create from a list of `(position, species)` pairs.
    pub fn from_atoms(atoms: impl IntoIterator<Item = ([f64; 3], S)>) -> Self {
        let mut flat = Vec::new();
        let mut species = Vec::new();
        for (p, s) in atoms {
            flat.extend_from_slice(&p);
            species.push(s);
        }

        let positions = Array2::from_shape_vec((species.len(), 3), flat)
            .unwrap_or_else(|_| Array2::zeros((0, 3)));
        Self { positions, species }
    }

    /// An atom set with no atoms.
    pub fn empty() -> Self {
        Self {
            positions: Array2::zeros((0, 3)),
            species: Vec::new(),
        }
    }

    /// Number of atoms.
    #[inline]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Position array, shape `(n_atoms, 3)`.
    #[inline]
    pub fn positions(&self) -> ArrayView2<'_, f64> {
        self.positions.view()
    }

    /// Species of every atom.
    #[inline]
    pub fn species(&self) -> &[S] {
        &self.species
    }

    /// Iterate over `(position, species)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<'_, f64>, S)> + '_ {
        self.positions
            .axis_iter(Axis(0))
            .zip(self.species.iter().copied())
    }

    /// Positions after applying `rotation` to every atom (`p' = R p`).
    pub fn rotated_positions(&self, rotation: &Matrix3<f64>) -> Array2<f64> {
        let mut out = Array2::zeros(self.positions.raw_dim());
        for (src, mut dst) in self
            .positions
            .axis_iter(Axis(0))
            .zip(out.axis_iter_mut(Axis(0)))
        {
            let p = rotation * Vector3::new(src[0], src[1], src[2]);
            dst[0] = p.x;
            dst[1] = p.y;
            dst[2] = p.z;
        }
        out
    }

    /// A copy of this atom set with `rotation` applied to every atom.
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Self {
        Self {
            positions: self.rotated_positions(rotation),
            species: self.species.clone(),
        }
    }
}

/// Errors raised while building an [`AtomSet`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AtomSetError {
    /// Position rows and species entries disagree.
    #[error("Number of positions ({positions}) and species ({species}) must be the same.")]
    LengthMismatch { positions: usize, species: usize },

    /// Positions are not three-dimensional.
    #[error("Atom positions must have 3 columns, got {columns}")]
    NotThreeDimensional { columns: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_atom_set_creation() {
        let atoms = AtomSet::new(array![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]], vec![6u8, 14]).unwrap();

        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.species(), &[6, 14]);
        assert_eq!(atoms.positions()[[1, 2]], 3.0);

        let pairs: Vec<_> = atoms.iter().map(|(p, s)| (p[0], s)).collect();
        assert_eq!(pairs, vec![(0.0, 6), (1.0, 14)]);
    }

    #[test]
    fn test_atom_set_length_mismatch() {
        let result = AtomSet::new(array![[0.0, 0.0, 0.0]], vec![6u8, 14]);
        assert!(matches!(
            result,
            Err(AtomSetError::LengthMismatch {
                positions: 1,
                species: 2
            })
        ));

        let result = AtomSet::new(array![[0.0, 0.0]], vec![6u8]);
        assert!(matches!(
            result,
            Err(AtomSetError::NotThreeDimensional { columns: 2 })
        ));
    }

    #[test]
    fn test_from_atoms_allows_coincident_atoms() {
        let atoms = AtomSet::from_atoms([([1.0, 1.0, 1.0], 8u8), ([1.0, 1.0, 1.0], 8u8)]);
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.positions().row(0), atoms.positions().row(1));
        assert!(AtomSet::<u8>::empty().is_empty());
    }

    #[test]
    fn test_rotated_positions() {
        let atoms = AtomSet::from_atoms([([1.0, 0.0, 0.0], 6u8)]);
        // Quarter turn about z.
        let r = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let rotated = atoms.rotated(&r);

        let positions = rotated.positions();
        let p = positions.row(0);
        assert!(p[0].abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert_eq!(rotated.species(), atoms.species());
    }
}
