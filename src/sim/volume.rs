//! Discretisation of the illuminated scattering density on a real-space grid.

use super::probe::ProbeFunction;
use super::scattering::ScatteringTable;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use std::ops::Range;

/// How the probe is evaluated while building the illuminated density.
///
/// Both strategies give the same density up to floating-point summation
/// order; the choice trades memory for repeated probe evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeEvaluation {
    /// Evaluate the probe once over the full grid and reuse it for every
    /// atom and precession sample.
    #[default]
    Precompute,
    /// Evaluate the probe at each atom's neighbourhood points only.
    PerAtom,
}

/// Probe evaluation strategy, prepared once per image.
pub enum ProbeSampler<'a, P: ?Sized> {
    /// Probe values over the whole grid.
    Cached(Array3<f64>),
    /// Probe evaluated lazily per atom.
    PerAtom(&'a P),
}

impl<'a, P: ProbeFunction + ?Sized> ProbeSampler<'a, P> {
    pub fn new(evaluation: ProbeEvaluation, probe: &'a P, axes: &[Array1<f64>]) -> Self {
        match evaluation {
            ProbeEvaluation::Precompute => ProbeSampler::Cached(probe.grid(axes)),
            ProbeEvaluation::PerAtom => ProbeSampler::PerAtom(probe),
        }
    }

    /// Build `u(x) = P(x) * sum_a phi_{s_a}(x - p_a)` on the mesh of `axes`.
    ///
    /// `positions` has shape `(n_atoms, 3)`; each atom only touches grid
    /// points within the table's cutoff of its position.
    pub fn illuminate<S, T>(
        &self,
        positions: ArrayView2<'_, f64>,
        species: &[S],
        table: &T,
        axes: &[Array1<f64>],
    ) -> Array3<f64>
    where
        T: ScatteringTable<S> + ?Sized,
    {
        let shape = (axes[0].len(), axes[1].len(), axes[2].len());
        let mut out = Array3::zeros(shape);

        match self {
            ProbeSampler::Cached(probe) => {
                for (p, s) in positions.axis_iter(Axis(0)).zip(species) {
                    let centre = [p[0], p[1], p[2]];
                    let Some(window) = neighbourhood(axes, centre, table.cutoff(s)) else {
                        continue;
                    };
                    for_each_voxel(axes, &window, centre, |idx, r2| {
                        out[idx] += table.potential(s, r2);
                    });
                }
                out *= probe;
            }
            ProbeSampler::PerAtom(probe) => {
                for (p, s) in positions.axis_iter(Axis(0)).zip(species) {
                    let centre = [p[0], p[1], p[2]];
                    let Some(window) = neighbourhood(axes, centre, table.cutoff(s)) else {
                        continue;
                    };
                    let points = window_points(axes, &window);
                    let weights = probe.points(points.view());

                    let mut k = 0;
                    for_each_voxel(axes, &window, centre, |idx, r2| {
                        out[idx] += table.potential(s, r2) * weights[k];
                        k += 1;
                    });
                }
            }
        }

        out
    }
}

/// Index ranges of grid points within `radius` of `centre` along each axis.
fn neighbourhood(axes: &[Array1<f64>], centre: [f64; 3], radius: f64) -> Option<[Range<usize>; 3]> {
    if !(radius > 0.0) {
        return None;
    }
    let mut ranges = [0..0, 0..0, 0..0];
    for d in 0..3 {
        let (lo, hi) = (centre[d] - radius, centre[d] + radius);
        let start = axes[d].iter().take_while(|&&v| v < lo).count();
        let end = start + axes[d].iter().skip(start).take_while(|&&v| v <= hi).count();
        if start >= end {
            return None;
        }
        ranges[d] = start..end;
    }
    Some(ranges)
}

/// Visit voxels of `window` in row-major order with their squared distance.
fn for_each_voxel<F>(axes: &[Array1<f64>], window: &[Range<usize>; 3], centre: [f64; 3], mut f: F)
where
    F: FnMut([usize; 3], f64),
{
    for i in window[0].clone() {
        let dx = axes[0][i] - centre[0];
        for j in window[1].clone() {
            let dy = axes[1][j] - centre[1];
            for k in window[2].clone() {
                let dz = axes[2][k] - centre[2];
                f([i, j, k], dx * dx + dy * dy + dz * dz);
            }
        }
    }
}

/// Coordinates of the voxels of `window`, same order as [`for_each_voxel`].
fn window_points(axes: &[Array1<f64>], window: &[Range<usize>; 3]) -> Array2<f64> {
    let count = window.iter().map(|r| r.len()).product();
    let mut points = Array2::zeros((count, 3));
    let mut row = 0;
    for i in window[0].clone() {
        for j in window[1].clone() {
            for k in window[2].clone() {
                points[[row, 0]] = axes[0][i];
                points[[row, 1]] = axes[1][j];
                points[[row, 2]] = axes[2][k];
                row += 1;
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::probe::{GaussianProbe, PlaneWave};
    use crate::sim::scattering::GaussianTable;
    use ndarray::array;

    fn axes() -> Vec<Array1<f64>> {
        vec![
            Array1::linspace(-4.0, 4.0, 17),
            Array1::linspace(-4.0, 4.0, 17),
            Array1::linspace(-2.0, 2.0, 9),
        ]
    }

    #[test]
    fn test_neighbourhood_clips_to_grid() {
        let axes = axes();
        let window = neighbourhood(&axes, [3.9, 0.0, 0.0], 1.0).unwrap();
        assert_eq!(window[0], 14..17);
        assert_eq!(window[1], 6..11);
        assert_eq!(window[2], 2..7);

        assert!(neighbourhood(&axes, [10.0, 0.0, 0.0], 1.0).is_none());
        assert!(neighbourhood(&axes, [0.0, 0.0, 0.0], 0.0).is_none());
        assert!(neighbourhood(&axes, [f64::NAN, 0.0, 0.0], 1.0).is_none());
    }

    #[test]
    fn test_strategies_agree() {
        let axes = axes();
        let table = GaussianTable::standard();
        let probe = GaussianProbe::new(2.0);
        let positions = array![[0.0, 0.0, 0.0], [1.3, -0.7, 0.2], [1.3, -0.7, 0.2]];
        let species = [14u8, 8, 6];

        let cached = ProbeSampler::new(ProbeEvaluation::Precompute, &probe, &axes)
            .illuminate(positions.view(), &species, &table, &axes);
        let per_atom = ProbeSampler::new(ProbeEvaluation::PerAtom, &probe, &axes)
            .illuminate(positions.view(), &species, &table, &axes);

        let scale = cached.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(scale > 0.0);
        for (a, b) in cached.iter().zip(per_atom.iter()) {
            assert!((a - b).abs() <= 1e-12 * scale);
        }
    }

    #[test]
    fn test_density_peaks_at_atom() {
        let axes = axes();
        let table = GaussianTable::standard();
        let positions = array![[1.0, -1.0, 0.5]];
        let density = ProbeSampler::new(ProbeEvaluation::Precompute, &PlaneWave, &axes)
            .illuminate(positions.view(), &[26u8], &table, &axes);

        let (mut best, mut best_idx) = (f64::NEG_INFINITY, (0, 0, 0));
        for (idx, &v) in density.indexed_iter() {
            if v > best {
                best = v;
                best_idx = idx;
            }
        }
        // Grid spacing is 0.5, so the atom sits on voxel (10, 6, 5).
        assert_eq!(best_idx, (10, 6, 5));
    }

    #[test]
    fn test_unknown_species_leaves_grid_empty() {
        let axes = axes();
        let table = GaussianTable::standard();
        let positions = array![[0.0, 0.0, 0.0]];
        let density = ProbeSampler::new(ProbeEvaluation::PerAtom, &PlaneWave, &axes)
            .illuminate(positions.view(), &[0u8], &table, &axes);
        assert!(density.iter().all(|&v| v == 0.0));
    }
}
