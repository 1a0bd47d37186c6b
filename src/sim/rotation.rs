//! Rotation composition for precession and crystal orientations.
//!
//! All angles are in degrees. The beam travels along the third (z) axis;
//! precession tilts are taken about x and swept around z.

use nalgebra::Matrix3;

/// Rotation by `alpha` degrees about the beam (z) axis, right-handed.
pub fn azimuth_mat(alpha: f64) -> Matrix3<f64> {
    let (s, c) = alpha.to_radians().sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation by `theta` degrees about the x axis (the tilt axis).
pub fn tilt_mat(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.to_radians().sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

/// Precession rotation for azimuth `alpha` and cone half-angle `theta`.
///
/// Returns `Rz(alpha) * Rx(theta) * Rz(alpha)^T`: the tilt is expressed in
/// the frame rotated by `alpha` about the beam, so `theta` alone fixes the
/// angle to the beam (`R[(2, 2)] == cos(theta)`) while `alpha` sweeps the
/// tilt axis around the cone. `theta == 0` gives exactly the identity.
pub fn precess_mat(alpha: f64, theta: f64) -> Matrix3<f64> {
    if theta == 0.0 {
        return Matrix3::identity();
    }
    let rz = azimuth_mat(alpha);
    rz * tilt_mat(theta) * rz.transpose()
}

/// Orientation matrix from Bunge Euler angles in the rzxz convention.
pub fn euler_rzxz(phi1: f64, big_phi: f64, phi2: f64) -> Matrix3<f64> {
    azimuth_mat(phi1) * tilt_mat(big_phi) * azimuth_mat(phi2)
}

/// Precession parameters: cone half-angle and number of azimuthal samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Precession {
    /// Cone half-angle in degrees.
    pub angle: f64,
    /// Number of azimuths sampled over 360 degrees.
    pub samples: usize,
}

impl Precession {
    pub fn new(angle: f64, samples: usize) -> Self {
        Self { angle, samples }
    }

    /// No precession: a single untilted sample.
    pub fn none() -> Self {
        Self {
            angle: 0.0,
            samples: 1,
        }
    }

    /// `(azimuth, tilt)` pairs in degrees.
    ///
    /// Azimuths are `i * 360 / n`. A zero cone angle collapses to `(0, 0)`.
    pub fn schedule(&self) -> Vec<(f64, f64)> {
        if self.angle == 0.0 {
            return vec![(0.0, 0.0)];
        }
        let n = self.samples.max(1);
        (0..n)
            .map(|i| (i as f64 * 360.0 / n as f64, self.angle))
            .collect()
    }

    /// One rotation per schedule entry.
    pub fn rotations(&self) -> Vec<Matrix3<f64>> {
        self.schedule()
            .into_iter()
            .map(|(alpha, theta)| precess_mat(alpha, theta))
            .collect()
    }
}

impl Default for Precession {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn max_abs_diff(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
        (a - b).abs().max()
    }

    fn cos_angle(u: &[f64], v: &[f64]) -> f64 {
        let dot: f64 = u.iter().zip(v).map(|(a, b)| a * b).sum();
        let nu = u.iter().map(|a| a * a).sum::<f64>().sqrt();
        let nv = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        dot / nu / nv
    }

    #[test]
    fn test_precess_mat_cone_angle() {
        for &(alpha, theta) in &[(0.0, 10.0), (10.0, 0.0), (5.0, 10.0), (123.0, 2.5)] {
            let r = precess_mat(alpha, theta);
            let expected = f64::cos(f64::to_radians(theta));
            assert!((r[(2, 2)] - expected).abs() < 1e-5, "alpha={alpha}, theta={theta}");
        }
    }

    #[test]
    fn test_precess_mat_zero_tilt_is_identity() {
        for alpha in [0.0, 10.0, 200.0] {
            assert_eq!(precess_mat(alpha, 0.0), Matrix3::identity());
        }
    }

    #[test]
    fn test_precess_mat_zero_azimuth_is_plain_tilt() {
        let r = precess_mat(0.0, 10.0);
        assert!(max_abs_diff(&r, &tilt_mat(10.0)) < 1e-12);

        // The tilt turns vectors in the y-z plane by theta.
        let x = Vector3::new(-1.0, 1.0, -1.0);
        let y = r * x;
        let c = cos_angle(&[x.y, x.z], &[y.y, y.z]);
        assert!((c - f64::cos(f64::to_radians(10.0))).abs() < 1e-5);
    }

    #[test]
    fn test_precess_mat_conjugation() {
        for &(alpha, theta) in &[(0.0, 10.0), (10.0, 0.0), (5.0, 10.0)] {
            let r = precess_mat(alpha, theta);
            let rz = azimuth_mat(alpha);
            let expected = rz * tilt_mat(theta) * rz.transpose();
            assert!(max_abs_diff(&r, &expected) < 1e-5);

            // The azimuth rotation turns vectors in the x-y plane by alpha.
            let x = Vector3::new(1.0, 2.0, 3.0);
            let y = rz * x;
            let c = cos_angle(&[x.x, x.y], &[y.x, y.y]);
            assert!((c - f64::cos(f64::to_radians(alpha))).abs() < 1e-5);
        }
    }

    #[test]
    fn test_precess_mat_is_proper_rotation() {
        let r = precess_mat(37.0, 1.5);
        assert!(max_abs_diff(&(r * r.transpose()), &Matrix3::identity()) < 1e-12);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_precess_mat_propagates_nan() {
        let r = precess_mat(f64::NAN, 1.0);
        assert!(r.iter().any(|v| v.is_nan()));
    }

    #[test]
    fn test_schedule() {
        assert_eq!(Precession::new(0.0, 20).schedule(), vec![(0.0, 0.0)]);
        assert_eq!(Precession::none().rotations(), vec![Matrix3::identity()]);

        let schedule = Precession::new(1.0, 4).schedule();
        assert_eq!(
            schedule,
            vec![(0.0, 1.0), (90.0, 1.0), (180.0, 1.0), (270.0, 1.0)]
        );
    }

    #[test]
    fn test_euler_rzxz() {
        assert!(max_abs_diff(&euler_rzxz(0.0, 0.0, 0.0), &Matrix3::identity()) < 1e-12);
        assert!(max_abs_diff(&euler_rzxz(30.0, 0.0, 15.0), &azimuth_mat(45.0)) < 1e-12);
        let r = euler_rzxz(10.0, 20.0, 30.0);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }
}
