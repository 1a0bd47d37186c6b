//! Projection of a flat reciprocal-space grid onto the Ewald sphere.

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2, ArrayView3, Axis};

/// Curvature of the sampling surface in reciprocal space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curvature {
    /// Flat plane (`q_z = 0`), the infinite-radius limit.
    Flat,
    /// Sphere tangent to the plane at the origin.
    Sphere { radius: f64 },
}

impl Curvature {
    /// Ewald sphere for the given wavelength; a zero wavelength is flat.
    pub fn from_wavelength(wavelength: f64) -> Self {
        if wavelength > 0.0 && (1.0 / wavelength).is_finite() {
            Curvature::Sphere {
                radius: 1.0 / wavelength,
            }
        } else {
            Curvature::Flat
        }
    }

    pub fn radius(&self) -> Option<f64> {
        match *self {
            Curvature::Flat => None,
            Curvature::Sphere { radius } => Some(radius),
        }
    }
}

/// Centred DFT frequencies for a uniformly spaced axis.
///
/// Matches an fftshift-ed `fftfreq(n, dx)`: `(i - n/2) / (n dx)`, in cycles
/// per unit length. A single-sample axis maps to `[0]`.
pub fn reciprocal_axis(axis: &Array1<f64>) -> Array1<f64> {
    let n = axis.len();
    if n < 2 {
        return Array1::zeros(n);
    }
    let dx = axis[1] - axis[0];
    let half = (n / 2) as f64;
    Array1::from_shape_fn(n, |i| (i as f64 - half) / (n as f64 * dx))
}

/// Planar grid points `x0[i] e0 + x1[j] e1`, optionally pushed onto a sphere.
///
/// `basis` rows give `e0, e1, e2` (identity when `None`). With
/// `radius = Some(C)` every point is scaled by `w = 1 / (1 + |y|^2 / C^2)`
/// and lifted by `C (1 - w)` along `e2`. Output has shape `(n0 * n1, 3)`,
/// `i`-major.
pub fn sphere_points(
    axes: &[Array1<f64>],
    basis: Option<&Matrix3<f64>>,
    radius: Option<f64>,
) -> Array2<f64> {
    let (n0, n1) = (axes[0].len(), axes[1].len());
    let identity = Matrix3::identity();
    let basis = basis.unwrap_or(&identity);
    let e0: Vector3<f64> = basis.row(0).transpose();
    let e1: Vector3<f64> = basis.row(1).transpose();
    let e2: Vector3<f64> = basis.row(2).transpose();

    let mut out = Array2::zeros((n0 * n1, 3));
    for (k, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        let (i, j) = (k / n1, k % n1);
        let mut y = e0 * axes[0][i] + e1 * axes[1][j];

        if let Some(c) = radius {
            let w = 1.0 / (1.0 + y.norm_squared() / (c * c));
            y = y * w + e2 * (c * (1.0 - w));
        }

        row[0] = y.x;
        row[1] = y.y;
        row[2] = y.z;
    }
    out
}

/// Sample a 3D array on the (projected) detector plane.
///
/// `arr` is defined on the mesh of `axes` (ascending). Points come from
/// [`sphere_points`]; values are interpolated trilinearly and are zero
/// outside the mesh. A single-sample third axis returns that slice as is.
pub fn grid2sphere(
    arr: ArrayView3<'_, f64>,
    axes: &[Array1<f64>],
    basis: Option<&Matrix3<f64>>,
    radius: Option<f64>,
) -> Array2<f64> {
    let (n0, n1) = (axes[0].len(), axes[1].len());
    if arr.len_of(Axis(2)) == 1 {
        return arr.index_axis(Axis(2), 0).to_owned();
    }

    let points = sphere_points(axes, basis, radius);
    let values: Vec<f64> = points
        .axis_iter(Axis(0))
        .map(|p| interpolate_trilinear(&arr, axes, [p[0], p[1], p[2]]))
        .collect();

    // n0 * n1 values by construction.
    Array2::from_shape_vec((n0, n1), values).unwrap_or_else(|_| Array2::zeros((n0, n1)))
}

/// Locate `x` on an ascending axis: lower index and fractional offset.
fn locate(axis: &Array1<f64>, x: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if n == 0 || x.is_nan() {
        return None;
    }
    if n == 1 {
        return (x == axis[0]).then_some((0, 0.0));
    }
    if x < axis[0] || x > axis[n - 1] {
        return None;
    }

    let upper = axis
        .as_slice()
        .map(|s| s.partition_point(|&v| v <= x))
        .unwrap_or_else(|| axis.iter().take_while(|&&v| v <= x).count());
    let lo = upper.saturating_sub(1).min(n - 2);
    let t = (x - axis[lo]) / (axis[lo + 1] - axis[lo]);
    Some((lo, t))
}

fn interpolate_trilinear(arr: &ArrayView3<'_, f64>, axes: &[Array1<f64>], p: [f64; 3]) -> f64 {
    let mut cells = [(0usize, 0.0f64); 3];
    for d in 0..3 {
        match locate(&axes[d], p[d]) {
            Some(cell) => cells[d] = cell,
            None => return 0.0,
        }
    }

    let mut value = 0.0;
    for corner in 0..8 {
        let mut weight = 1.0;
        let mut idx = [0usize; 3];
        for d in 0..3 {
            let (lo, t) = cells[d];
            let upper = (corner >> d) & 1 == 1;
            if upper {
                if t == 0.0 {
                    weight = 0.0;
                    break;
                }
                idx[d] = lo + 1;
                weight *= t;
            } else {
                idx[d] = lo;
                weight *= 1.0 - t;
            }
        }
        if weight != 0.0 {
            value += weight * arr[idx];
        }
    }
    value
}
