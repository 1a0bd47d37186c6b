//! Discrete Fourier transforms over ndarray grids.

use ndarray::{Array, ArrayView1, Axis, Dimension, Slice};
use rustfft::{num_complex::Complex64, FftPlanner};

/// Forward FFT along every axis of `arr`, in place.
pub fn fftn_inplace<D: Dimension>(arr: &mut Array<Complex64, D>, planner: &mut FftPlanner<f64>) {
    for axis in 0..arr.ndim() {
        let n = arr.len_of(Axis(axis));
        if n < 2 {
            continue;
        }
        let fft = planner.plan_fft_forward(n);
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        for mut lane in arr.lanes_mut(Axis(axis)) {
            for (b, v) in buffer.iter_mut().zip(lane.iter()) {
                *b = *v;
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);
            lane.assign(&ArrayView1::from(&buffer[..]));
        }
    }
}

/// Transform a real field, returning `|F|^2 * scale^2`, zero frequency centred.
///
/// `scale` is the volume element that turns the sum into an integral.
pub fn power_spectrum<D: Dimension>(
    field: &Array<f64, D>,
    scale: f64,
    planner: &mut FftPlanner<f64>,
) -> Array<f64, D> {
    let mut spectrum = field.mapv(|v| Complex64::new(v * scale, 0.0));
    fftn_inplace(&mut spectrum, planner);
    fftshift(&spectrum.mapv(|c| c.norm_sqr()))
}

/// Move the zero-frequency entry of every axis to index `n / 2`.
pub fn fftshift<D: Dimension>(arr: &Array<f64, D>) -> Array<f64, D> {
    let mut out = arr.clone();
    for axis in 0..arr.ndim() {
        let ax = Axis(axis);
        let n = out.len_of(ax);
        let shift = n / 2;
        if shift == 0 {
            continue;
        }
        let src = out.clone();
        out.slice_axis_mut(ax, Slice::from(shift..))
            .assign(&src.slice_axis(ax, Slice::from(..n - shift)));
        out.slice_axis_mut(ax, Slice::from(..shift))
            .assign(&src.slice_axis(ax, Slice::from(n - shift..)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2, Array3};

    #[test]
    fn test_fftshift_even_and_odd() {
        let even = array![0.0, 1.0, -2.0, -1.0];
        assert_eq!(fftshift(&even).to_vec(), vec![-2.0, -1.0, 0.0, 1.0]);

        let odd = array![0.0, 1.0, 2.0, -2.0, -1.0];
        assert_eq!(fftshift(&odd).to_vec(), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_fft_of_delta_is_flat() {
        let mut field = Array2::<f64>::zeros((4, 6));
        field[[0, 0]] = 1.0;
        let mut planner = FftPlanner::new();
        let spectrum = power_spectrum(&field, 2.0, &mut planner);
        assert!(spectrum.iter().all(|&v| (v - 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_constant_field_peaks_at_centre() {
        let field = Array1::<f64>::ones(5);
        let mut planner = FftPlanner::new();
        let spectrum = power_spectrum(&field, 1.0, &mut planner);

        assert!((spectrum[2] - 25.0).abs() < 1e-9);
        for (i, &v) in spectrum.iter().enumerate() {
            if i != 2 {
                assert!(v.abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_projection_slice_theorem() {
        // The centred q_z = 0 plane of a 3D transform equals the 2D transform
        // of the field summed along z.
        let field = Array3::from_shape_fn((4, 5, 6), |(i, j, k)| {
            ((i * 7 + j * 3 + k) % 5) as f64 - 1.5
        });
        let mut planner = FftPlanner::new();

        let volume = power_spectrum(&field, 1.0, &mut planner);
        let plane = power_spectrum(&field.sum_axis(Axis(2)), 1.0, &mut planner);

        let slice = volume.index_axis(Axis(2), 3);
        for (a, b) in slice.iter().zip(plane.iter()) {
            assert!((a - b).abs() < 1e-8 * (1.0 + b.abs()));
        }
    }
}
