//! FFI functions for the stateless simulation kernel.

use super::types::{CArrayView, CMutArrayView, CPrecession, CProbe, CProbeEvaluation, DiffsimStatus};
use crate::sim::{get_diffraction_image, precess_mat, sphere_points, GaussianTable};
use ndarray::{Array1, ArrayView2};

/// Precession rotation matrix, written row-major into `out` (9 values).
///
/// # Safety
/// `out` must be valid for 9 writes.
#[no_mangle]
pub unsafe extern "C" fn diffsim_precess_mat(alpha: f64, theta: f64, out: *mut f64) -> DiffsimStatus {
    if out.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let r = precess_mat(alpha, theta);
    for i in 0..3 {
        for j in 0..3 {
            *out.add(3 * i + j) = r[(i, j)];
        }
    }

    DiffsimStatus::Ok
}

/// Detector plane points for two axes, optionally projected on a sphere.
///
/// A `radius` that is zero, negative or infinite gives the flat plane.
/// `out.len` must equal `axis0.len * axis1.len * 3`.
///
/// # Safety
/// Views must be valid for their stated lengths.
#[no_mangle]
pub unsafe extern "C" fn diffsim_sphere_points(
    axis0: CArrayView,
    axis1: CArrayView,
    radius: f64,
    out: CMutArrayView,
) -> DiffsimStatus {
    if out.data.is_null() {
        return DiffsimStatus::NullPointer;
    }
    let axes = match (axis0.to_array(), axis1.to_array()) {
        (Ok(a), Ok(b)) => vec![a, b],
        (Err(status), _) | (_, Err(status)) => return status,
    };
    if out.len != axes[0].len() * axes[1].len() * 3 {
        return DiffsimStatus::LengthMismatch;
    }

    let radius = (radius > 0.0 && radius.is_finite()).then_some(radius);
    let points = sphere_points(&axes, None, radius);
    copy_out(points.iter().copied(), out);

    DiffsimStatus::Ok
}

/// Simulate a diffraction image with the standard scattering table.
///
/// `coords` holds `n_atoms` rows of `(x, y, z)`, `species` the atomic
/// numbers. `axes` points to 2 or 3 axis views. The image is written
/// row-major into `out`, which must hold `len(axes[0]) * len(axes[1])`
/// values.
///
/// # Safety
/// All pointers must be valid for the stated lengths.
#[no_mangle]
pub unsafe extern "C" fn diffsim_diffraction_image(
    coords: *const f64,
    species: *const u8,
    n_atoms: usize,
    axes: *const CArrayView,
    n_axes: usize,
    wavelength: f64,
    precession: CPrecession,
    probe: CProbe,
    evaluation: CProbeEvaluation,
    out: CMutArrayView,
) -> DiffsimStatus {
    if axes.is_null() || out.data.is_null() {
        return DiffsimStatus::NullPointer;
    }
    if n_atoms > 0 && (coords.is_null() || species.is_null()) {
        return DiffsimStatus::NullPointer;
    }

    let axes = match read_axes(axes, n_axes) {
        Ok(axes) => axes,
        Err(status) => return status,
    };
    if axes.len() >= 2 && out.len != axes[0].len() * axes[1].len() {
        return DiffsimStatus::LengthMismatch;
    }
    let probe = match probe.to_probe() {
        Ok(probe) => probe,
        Err(status) => return status,
    };

    let (coords, species): (&[f64], &[u8]) = if n_atoms == 0 {
        (&[], &[])
    } else {
        (
            std::slice::from_raw_parts(coords, n_atoms * 3),
            std::slice::from_raw_parts(species, n_atoms),
        )
    };
    let Ok(coords) = ArrayView2::from_shape((n_atoms, 3), coords) else {
        return DiffsimStatus::LengthMismatch;
    };

    let table = GaussianTable::standard();
    match get_diffraction_image(
        coords,
        species,
        &probe,
        &table,
        &axes,
        wavelength,
        precession.into(),
        evaluation.into(),
    ) {
        Ok(image) => {
            copy_out(image.iter().copied(), out);
            DiffsimStatus::Ok
        }
        Err(err) => {
            log::debug!("diffraction image failed: {err}");
            DiffsimStatus::from(&err)
        }
    }
}

/// Read `n_axes` axis views into owned arrays.
pub(crate) unsafe fn read_axes(
    axes: *const CArrayView,
    n_axes: usize,
) -> Result<Vec<Array1<f64>>, DiffsimStatus> {
    if n_axes == 0 {
        return Ok(Vec::new());
    }
    std::slice::from_raw_parts(axes, n_axes)
        .iter()
        .map(|view| view.to_array())
        .collect()
}

/// Copy values into a caller-provided buffer already checked for length.
pub(crate) unsafe fn copy_out(values: impl Iterator<Item = f64>, out: CMutArrayView) {
    for (i, v) in values.take(out.len).enumerate() {
        *out.data.add(i) = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::CProbeKind;

    fn view(values: &[f64]) -> CArrayView {
        CArrayView {
            data: values.as_ptr(),
            len: values.len(),
        }
    }

    #[test]
    fn test_precess_mat_row_major() {
        let mut out = [0.0; 9];
        let status = unsafe { diffsim_precess_mat(0.0, 30.0, out.as_mut_ptr()) };
        assert_eq!(status, DiffsimStatus::Ok);

        let (s, c) = 30f64.to_radians().sin_cos();
        let expected = [1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }

        assert_eq!(
            unsafe { diffsim_precess_mat(0.0, 30.0, std::ptr::null_mut()) },
            DiffsimStatus::NullPointer
        );
    }

    #[test]
    fn test_sphere_points_flat_and_mismatch() {
        let x = [-1.0, 0.0, 1.0];
        let y = [-2.0, 2.0];
        let mut out = vec![f64::NAN; 18];
        let target = CMutArrayView {
            data: out.as_mut_ptr(),
            len: out.len(),
        };

        let status = unsafe { diffsim_sphere_points(view(&x), view(&y), 0.0, target) };
        assert_eq!(status, DiffsimStatus::Ok);
        assert_eq!(&out[..6], &[-1.0, -2.0, 0.0, -1.0, 2.0, 0.0]);

        let short = CMutArrayView {
            data: out.as_mut_ptr(),
            len: 5,
        };
        let status = unsafe { diffsim_sphere_points(view(&x), view(&y), 0.0, short) };
        assert_eq!(status, DiffsimStatus::LengthMismatch);
    }

    #[test]
    fn test_diffraction_image() {
        let x: Vec<f64> = (0..8).map(|i| -4.0 + i as f64).collect();
        let z: Vec<f64> = (0..4).map(|i| -2.0 + i as f64).collect();
        let axes = [view(&x), view(&x), view(&z)];
        let coords = [0.0, 0.0, 0.0, 1.0, 0.5, 0.0];
        let species = [14u8, 8];
        let mut image = vec![0.0; 64];
        let probe = CProbe {
            kind: CProbeKind::Square,
            parameter: 3.0,
        };
        let precession = CPrecession {
            angle: 0.0,
            samples: 1,
        };

        let status = unsafe {
            diffsim_diffraction_image(
                coords.as_ptr(),
                species.as_ptr(),
                2,
                axes.as_ptr(),
                3,
                0.02508,
                precession,
                probe,
                CProbeEvaluation::Precompute,
                CMutArrayView {
                    data: image.as_mut_ptr(),
                    len: image.len(),
                },
            )
        };
        assert_eq!(status, DiffsimStatus::Ok);
        assert!(image.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(image.iter().any(|&v| v > 0.0));

        let status = unsafe {
            diffsim_diffraction_image(
                coords.as_ptr(),
                species.as_ptr(),
                2,
                axes.as_ptr(),
                3,
                -1.0,
                precession,
                probe,
                CProbeEvaluation::Precompute,
                CMutArrayView {
                    data: image.as_mut_ptr(),
                    len: image.len(),
                },
            )
        };
        assert_eq!(status, DiffsimStatus::InvalidArgument);
    }
}
