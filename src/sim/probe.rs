//! Beam probe functions.
//!
//! A probe weights the scattering density by the beam's illumination. It can
//! be evaluated either on an axis-separated grid or at a flat list of points;
//! callers pick whichever form suits them.

use ndarray::{Array1, Array3, ArrayView2, ArrayViewMut1, ArrayViewMut3, Axis, Zip};

/// Illumination profile of the incident beam.
pub trait ProbeFunction: Send + Sync {
    /// Evaluate on the mesh of `axes` (three ascending axes), writing into `out`
    /// of shape `(len(axes[0]), len(axes[1]), len(axes[2]))`.
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>);

    /// Evaluate at `points` of shape `(m, 3)`, writing `m` values into `out`.
    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>);

    /// Allocating version of [`ProbeFunction::evaluate_on_grid`].
    fn grid(&self, axes: &[Array1<f64>]) -> Array3<f64> {
        let mut out = Array3::zeros((axes[0].len(), axes[1].len(), axes[2].len()));
        self.evaluate_on_grid(axes, out.view_mut());
        out
    }

    /// Allocating version of [`ProbeFunction::evaluate_at_points`].
    fn points(&self, points: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut out = Array1::zeros(points.nrows());
        self.evaluate_at_points(points, out.view_mut());
        out
    }
}

impl<P: ProbeFunction + ?Sized> ProbeFunction for Box<P> {
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>) {
        (**self).evaluate_on_grid(axes, out)
    }

    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        (**self).evaluate_at_points(points, out)
    }
}

impl<P: ProbeFunction + ?Sized> ProbeFunction for std::sync::Arc<P> {
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>) {
        (**self).evaluate_on_grid(axes, out)
    }

    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        (**self).evaluate_at_points(points, out)
    }
}

/// Fill a grid from a profile that depends only on the transverse `(x, y)`.
fn fill_transverse<F>(axes: &[Array1<f64>], mut out: ArrayViewMut3<'_, f64>, profile: F)
where
    F: Fn(f64, f64) -> f64,
{
    for (i, mut plane) in out.axis_iter_mut(Axis(0)).enumerate() {
        let x = axes[0][i];
        for (j, mut column) in plane.axis_iter_mut(Axis(0)).enumerate() {
            column.fill(profile(x, axes[1][j]));
        }
    }
}

fn fill_points<F>(points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>, profile: F)
where
    F: Fn(f64, f64) -> f64,
{
    Zip::from(out)
        .and(points.rows())
        .for_each(|o, p| *o = profile(p[0], p[1]));
}

/// Uniform illumination.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaneWave;

impl ProbeFunction for PlaneWave {
    fn evaluate_on_grid(&self, _axes: &[Array1<f64>], mut out: ArrayViewMut3<'_, f64>) {
        out.fill(1.0);
    }

    fn evaluate_at_points(&self, _points: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        out.fill(1.0);
    }
}

/// Square aperture: 1 where `max(|x|, |y|) < half_width`, else 0.
#[derive(Clone, Copy, Debug)]
pub struct SquareProbe {
    pub half_width: f64,
}

impl SquareProbe {
    pub fn new(half_width: f64) -> Self {
        Self { half_width }
    }

    #[inline]
    fn value(&self, x: f64, y: f64) -> f64 {
        if x.abs() < self.half_width && y.abs() < self.half_width {
            1.0
        } else {
            0.0
        }
    }
}

impl ProbeFunction for SquareProbe {
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>) {
        fill_transverse(axes, out, |x, y| self.value(x, y));
    }

    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        fill_points(points, out, |x, y| self.value(x, y));
    }
}

/// Circular aperture of the given radius.
#[derive(Clone, Copy, Debug)]
pub struct DiscProbe {
    pub radius: f64,
}

impl DiscProbe {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    #[inline]
    fn value(&self, x: f64, y: f64) -> f64 {
        if x * x + y * y < self.radius * self.radius {
            1.0
        } else {
            0.0
        }
    }
}

impl ProbeFunction for DiscProbe {
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>) {
        fill_transverse(axes, out, |x, y| self.value(x, y));
    }

    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        fill_points(points, out, |x, y| self.value(x, y));
    }
}

/// Gaussian beam, `exp(-(x^2 + y^2) / (2 sigma^2))`.
#[derive(Clone, Copy, Debug)]
pub struct GaussianProbe {
    pub sigma: f64,
}

impl GaussianProbe {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    #[inline]
    fn value(&self, x: f64, y: f64) -> f64 {
        (-(x * x + y * y) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

impl ProbeFunction for GaussianProbe {
    fn evaluate_on_grid(&self, axes: &[Array1<f64>], out: ArrayViewMut3<'_, f64>) {
        fill_transverse(axes, out, |x, y| self.value(x, y));
    }

    fn evaluate_at_points(&self, points: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        fill_points(points, out, |x, y| self.value(x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn test_axes() -> Vec<Array1<f64>> {
        vec![
            Array1::linspace(-10.0, 10.0, 6),
            Array1::linspace(-8.0, 8.0, 5),
            Array1::linspace(0.0, 1.0, 3),
        ]
    }

    /// Flattened mesh of `axes`, `i`-major.
    fn mesh(axes: &[Array1<f64>]) -> Array2<f64> {
        let (n0, n1, n2) = (axes[0].len(), axes[1].len(), axes[2].len());
        Array2::from_shape_fn((n0 * n1 * n2, 3), |(k, d)| {
            let idx = [k / (n1 * n2), (k / n2) % n1, k % n2];
            axes[d][idx[d]]
        })
    }

    fn assert_forms_agree<P: ProbeFunction>(probe: &P) {
        let axes = test_axes();
        let grid = probe.grid(&axes);
        let flat = probe.points(mesh(&axes).view());
        assert_eq!(grid.len(), flat.len());
        for (a, b) in grid.iter().zip(flat.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_grid_and_point_forms_agree() {
        assert_forms_agree(&PlaneWave);
        assert_forms_agree(&SquareProbe::new(6.0));
        assert_forms_agree(&DiscProbe::new(7.0));
        assert_forms_agree(&GaussianProbe::new(3.0));
        assert_forms_agree(&Box::new(GaussianProbe::new(3.0)));
    }

    #[test]
    fn test_square_probe_support() {
        let probe = SquareProbe::new(6.0);
        let points = ndarray::array![[0.0, 0.0, 5.0], [5.9, -5.9, 0.0], [6.0, 0.0, 0.0], [0.0, -7.0, 0.0]];
        assert_eq!(probe.points(points.view()).to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gaussian_probe_is_independent_of_z() {
        let grid = GaussianProbe::new(2.0).grid(&test_axes());
        for column in grid.lanes(Axis(2)) {
            assert!(column.iter().all(|&v| v == column[0]));
        }
    }
}
