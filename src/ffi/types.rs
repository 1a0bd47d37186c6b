//! C-compatible type definitions for FFI.

use crate::runtime::RuntimeError;
use crate::sim::{
    DiscProbe, GaussianProbe, PlaneWave, Precession, ProbeEvaluation, ProbeFunction,
    SimulationError, SquareProbe,
};
use ndarray::Array1;
use std::ffi::c_void;
use std::sync::Arc;

/// Result status codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffsimStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer was passed.
    NullPointer = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Array length mismatch.
    LengthMismatch = 3,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 4,
    /// Runtime error.
    RuntimeError = 5,
    /// Operation was cancelled.
    Cancelled = 6,
    /// Resource not found.
    NotFound = 7,
}

impl From<&SimulationError> for DiffsimStatus {
    fn from(err: &SimulationError) -> Self {
        match err {
            SimulationError::Atoms(_) => DiffsimStatus::LengthMismatch,
            _ => DiffsimStatus::InvalidArgument,
        }
    }
}

impl From<&RuntimeError> for DiffsimStatus {
    fn from(err: &RuntimeError) -> Self {
        match err {
            RuntimeError::Simulation(e) => e.into(),
            RuntimeError::Library(_) => DiffsimStatus::LengthMismatch,
            RuntimeError::Io(_) => DiffsimStatus::RuntimeError,
        }
    }
}

/// C-compatible array view (pointer + length).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CArrayView {
    pub data: *const f64,
    pub len: usize,
}

impl CArrayView {
    /// Copy the viewed values into an owned axis.
    ///
    /// # Safety
    /// `data` must be valid for `len` reads, or null with `len == 0`.
    pub unsafe fn to_array(&self) -> Result<Array1<f64>, DiffsimStatus> {
        if self.len == 0 {
            return Ok(Array1::zeros(0));
        }
        if self.data.is_null() {
            return Err(DiffsimStatus::NullPointer);
        }
        Ok(Array1::from(std::slice::from_raw_parts(self.data, self.len).to_vec()))
    }
}

/// C-compatible mutable array view.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CMutArrayView {
    pub data: *mut f64,
    pub len: usize,
}

/// Probe profile selector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CProbeKind {
    /// Uniform illumination, `parameter` unused.
    PlaneWave = 0,
    /// Square aperture, `parameter` is the half width.
    Square = 1,
    /// Circular aperture, `parameter` is the radius.
    Disc = 2,
    /// Gaussian profile, `parameter` is the standard deviation.
    Gaussian = 3,
}

/// C-compatible probe description.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CProbe {
    pub kind: CProbeKind,
    pub parameter: f64,
}

impl CProbe {
    /// Build the probe, rejecting non-positive or non-finite parameters.
    pub fn to_probe(&self) -> Result<Arc<dyn ProbeFunction>, DiffsimStatus> {
        if self.kind != CProbeKind::PlaneWave && !(self.parameter > 0.0 && self.parameter.is_finite())
        {
            return Err(DiffsimStatus::InvalidArgument);
        }
        Ok(match self.kind {
            CProbeKind::PlaneWave => Arc::new(PlaneWave),
            CProbeKind::Square => Arc::new(SquareProbe::new(self.parameter)),
            CProbeKind::Disc => Arc::new(DiscProbe::new(self.parameter)),
            CProbeKind::Gaussian => Arc::new(GaussianProbe::new(self.parameter)),
        })
    }
}

/// Probe evaluation strategy.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CProbeEvaluation {
    Precompute = 0,
    PerAtom = 1,
}

impl From<CProbeEvaluation> for ProbeEvaluation {
    fn from(c: CProbeEvaluation) -> Self {
        match c {
            CProbeEvaluation::Precompute => ProbeEvaluation::Precompute,
            CProbeEvaluation::PerAtom => ProbeEvaluation::PerAtom,
        }
    }
}

/// C-compatible precession parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CPrecession {
    /// Cone half-angle in degrees (0 = no precession).
    pub angle: f64,
    /// Number of azimuthal samples.
    pub samples: usize,
}

impl From<CPrecession> for Precession {
    fn from(c: CPrecession) -> Self {
        Precession::new(c.angle, c.samples)
    }
}

/// Callback function type for completion notifications.
///
/// # Arguments
/// * `user_data` - User-provided context pointer
/// * `status` - Final status of the run
pub type CompletionCallback = extern "C" fn(user_data: *mut c_void, status: DiffsimStatus);

/// Callback for progress updates.
///
/// # Arguments
/// * `user_data` - User-provided context pointer
/// * `completed` - Number of simulated templates
/// * `total` - Total number of queued templates
pub type ProgressCallback = extern "C" fn(user_data: *mut c_void, completed: usize, total: usize);

/// Callback for per-template completion.
///
/// # Arguments
/// * `user_data` - User-provided context pointer
/// * `template_handle` - Owned template, release with `diffsim_template_free`
pub type TemplateCallback = extern "C" fn(user_data: *mut c_void, template_handle: *mut c_void);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AtomSetError;

    #[test]
    fn test_probe_validation() {
        let plane = CProbe {
            kind: CProbeKind::PlaneWave,
            parameter: 0.0,
        };
        assert!(plane.to_probe().is_ok());

        let disc = CProbe {
            kind: CProbeKind::Disc,
            parameter: -1.0,
        };
        assert_eq!(disc.to_probe().err(), Some(DiffsimStatus::InvalidArgument));
    }

    #[test]
    fn test_status_mapping() {
        let err = SimulationError::Atoms(AtomSetError::LengthMismatch {
            positions: 2,
            species: 1,
        });
        assert_eq!(DiffsimStatus::from(&err), DiffsimStatus::LengthMismatch);
        assert_eq!(
            DiffsimStatus::from(&SimulationError::InvalidWavelength(-1.0)),
            DiffsimStatus::InvalidArgument
        );
        assert_eq!(
            DiffsimStatus::from(&RuntimeError::Simulation(SimulationError::AxisCount(1))),
            DiffsimStatus::InvalidArgument
        );
    }

    #[test]
    fn test_array_view() {
        let values = [1.0, 2.0, 3.0];
        let view = CArrayView {
            data: values.as_ptr(),
            len: 3,
        };
        assert_eq!(unsafe { view.to_array() }.unwrap().to_vec(), values.to_vec());

        let null = CArrayView {
            data: std::ptr::null(),
            len: 2,
        };
        assert_eq!(unsafe { null.to_array() }.err(), Some(DiffsimStatus::NullPointer));
    }
}
