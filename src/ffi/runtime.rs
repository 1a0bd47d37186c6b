//! FFI functions for Runtime management.

use super::simulate::{copy_out, read_axes};
use super::types::{
    CMutArrayView, CArrayView, CPrecession, CProbe, CProbeEvaluation, CompletionCallback,
    DiffsimStatus, ProgressCallback, TemplateCallback,
};
use crate::data::{AtomSet, Orientation};
use crate::runtime::{Runtime, RuntimeConfig, Template};
use crate::sim::{GaussianTable, PlaneWave, ProbeFunction, SimulationConfig};
use ndarray::Array2;
use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

/// Runtime keyed by phase name over atomic numbers.
pub type FfiRuntime = Runtime<String, u8>;

/// Template produced by [`FfiRuntime`].
pub type FfiTemplate = Template<String>;

/// Opaque handle to a Runtime.
pub type RuntimeHandle = *mut FfiRuntime;

/// Opaque handle to a Template.
pub type TemplateHandle = *mut FfiTemplate;

/// Configuration for creating a runtime.
///
/// The axes keep their defaults until `diffsim_runtime_set_axes` is called.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct CRuntimeConfig {
    /// Number of worker threads (0 = auto-detect).
    pub worker_count: usize,
    /// Electron wavelength (0 = flat detector).
    pub wavelength: f64,
    /// Precession applied to every template.
    pub precession: CPrecession,
    /// Probe evaluation strategy.
    pub probe_evaluation: CProbeEvaluation,
    /// Parallelise over precession samples.
    pub parallel: bool,
}

impl Default for CRuntimeConfig {
    fn default() -> Self {
        let config = RuntimeConfig::default();
        Self {
            worker_count: 0,
            wavelength: config.geometry.wavelength,
            precession: CPrecession {
                angle: config.geometry.precession.angle,
                samples: config.geometry.precession.samples,
            },
            probe_evaluation: CProbeEvaluation::Precompute,
            parallel: config.simulation.parallel,
        }
    }
}

impl From<CRuntimeConfig> for RuntimeConfig {
    fn from(c: CRuntimeConfig) -> Self {
        let mut config = RuntimeConfig::default();
        if c.worker_count != 0 {
            config.worker_count = c.worker_count;
        }
        config.geometry.wavelength = c.wavelength;
        config.geometry.precession = c.precession.into();
        config.simulation = SimulationConfig {
            probe_evaluation: c.probe_evaluation.into(),
            parallel: c.parallel,
        };
        config
    }
}

/// Create a new runtime using the standard scattering table.
///
/// A null `config` uses defaults; a null `probe` is a plane wave.
///
/// # Safety
/// out_handle must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_create(
    config: *const CRuntimeConfig,
    probe: *const CProbe,
    out_handle: *mut RuntimeHandle,
) -> DiffsimStatus {
    if out_handle.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let cfg = if config.is_null() {
        RuntimeConfig::default()
    } else {
        (*config).clone().into()
    };

    let probe: Arc<dyn ProbeFunction> = if probe.is_null() {
        Arc::new(PlaneWave)
    } else {
        match (*probe).to_probe() {
            Ok(p) => p,
            Err(status) => return status,
        }
    };

    match Runtime::new(cfg, Arc::new(GaussianTable::standard()), probe) {
        Ok(runtime) => {
            *out_handle = Box::into_raw(Box::new(runtime));
            DiffsimStatus::Ok
        }
        Err(err) => {
            log::warn!("failed to create runtime: {err}");
            DiffsimStatus::from(&err)
        }
    }
}

/// Free a runtime handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_free(handle: RuntimeHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Replace the real-space axes of the runtime geometry (2 or 3 axes).
///
/// # Safety
/// Runtime handle and axis views must be valid.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_set_axes(
    runtime: RuntimeHandle,
    axes: *const CArrayView,
    n_axes: usize,
) -> DiffsimStatus {
    if runtime.is_null() || axes.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let axes = match read_axes(axes, n_axes) {
        Ok(axes) => axes,
        Err(status) => return status,
    };

    let rt = &mut *runtime;
    let mut geometry = rt.config().geometry.clone();
    geometry.axes = axes;
    if let Err(err) = geometry.validate() {
        return DiffsimStatus::from(&err);
    }
    rt.config_mut().geometry = geometry;

    DiffsimStatus::Ok
}

/// Queue one template job per orientation of a phase.
///
/// `coords` holds `n_atoms` rows of `(x, y, z)`, `species` the atomic
/// numbers and `orientations` `n_orientations` rows of rzxz Euler angles
/// in degrees.
///
/// # Safety
/// All pointers must be valid for the stated lengths; `phase` must be a
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_add_phase(
    runtime: RuntimeHandle,
    phase: *const c_char,
    coords: *const f64,
    species: *const u8,
    n_atoms: usize,
    orientations: *const f64,
    n_orientations: usize,
) -> DiffsimStatus {
    if runtime.is_null() || phase.is_null() {
        return DiffsimStatus::NullPointer;
    }
    if (n_atoms > 0 && (coords.is_null() || species.is_null()))
        || (n_orientations > 0 && orientations.is_null())
    {
        return DiffsimStatus::NullPointer;
    }

    let phase = match CStr::from_ptr(phase).to_str() {
        Ok(s) => s.to_string(),
        Err(_) => return DiffsimStatus::InvalidUtf8,
    };

    let atoms = if n_atoms == 0 {
        AtomSet::empty()
    } else {
        let positions = std::slice::from_raw_parts(coords, n_atoms * 3).to_vec();
        let species = std::slice::from_raw_parts(species, n_atoms).to_vec();
        let Ok(positions) = Array2::from_shape_vec((n_atoms, 3), positions) else {
            return DiffsimStatus::LengthMismatch;
        };
        match AtomSet::new(positions, species) {
            Ok(atoms) => atoms,
            Err(_) => return DiffsimStatus::LengthMismatch,
        }
    };

    let orientations: Vec<Orientation> = if n_orientations == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(orientations, n_orientations * 3)
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    };

    (*runtime).add_phase(phase, atoms, &orientations);

    DiffsimStatus::Ok
}

/// Run the batch asynchronously.
///
/// This function returns immediately. Each template is handed to
/// `on_template` and must be released with `diffsim_template_free`; the
/// completion callback is invoked once when the queue is drained or the
/// run is cancelled.
///
/// # Safety
/// Runtime handle must be valid. Callbacks and user_data must remain valid
/// until the completion callback is invoked.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_run_async(
    runtime: RuntimeHandle,
    on_complete: CompletionCallback,
    on_progress: ProgressCallback,
    on_template: TemplateCallback,
    user_data: *mut c_void,
) -> DiffsimStatus {
    if runtime.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let rt = &mut *runtime;

    // Raw pointers are not Send; carry the address instead.
    let user_data = user_data as usize;

    let complete_cb = move |status: DiffsimStatus| {
        on_complete(user_data as *mut c_void, status);
    };

    let progress_cb = move |completed: usize, total: usize| {
        on_progress(user_data as *mut c_void, completed, total);
    };

    let template_cb = move |template: FfiTemplate| {
        let handle = Box::into_raw(Box::new(template));
        on_template(user_data as *mut c_void, handle as *mut c_void);
    };

    match rt.run_async(complete_cb, progress_cb, template_cb) {
        Ok(()) => DiffsimStatus::Ok,
        Err(err) => DiffsimStatus::from(&err),
    }
}

/// Run the batch synchronously (blocking).
///
/// # Safety
/// Runtime handle must be valid.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_run_sync(runtime: RuntimeHandle) -> DiffsimStatus {
    if runtime.is_null() {
        return DiffsimStatus::NullPointer;
    }

    match (*runtime).run_sync() {
        Ok(()) => DiffsimStatus::Ok,
        Err(err) => {
            log::warn!("synchronous run failed: {err}");
            DiffsimStatus::from(&err)
        }
    }
}

/// Get the number of completed templates held by the runtime.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_completed_count(runtime: RuntimeHandle) -> usize {
    if runtime.is_null() {
        return 0;
    }
    (*runtime).completed_count()
}

/// Get the number of queued jobs.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_pending_count(runtime: RuntimeHandle) -> usize {
    if runtime.is_null() {
        return 0;
    }
    (*runtime).pending_count()
}

/// Take the oldest completed template from a synchronous run.
///
/// Returns `NotFound` when none is left. The caller owns the handle.
///
/// # Safety
/// Runtime handle and out_handle must be valid.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_take_template(
    runtime: RuntimeHandle,
    out_handle: *mut TemplateHandle,
) -> DiffsimStatus {
    if runtime.is_null() || out_handle.is_null() {
        return DiffsimStatus::NullPointer;
    }

    match (*runtime).pop_template() {
        Some(template) => {
            *out_handle = Box::into_raw(Box::new(template));
            DiffsimStatus::Ok
        }
        None => DiffsimStatus::NotFound,
    }
}

/// Cancel all pending operations.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_cancel(runtime: RuntimeHandle) -> DiffsimStatus {
    if runtime.is_null() {
        return DiffsimStatus::NullPointer;
    }

    (*runtime).cancel();
    DiffsimStatus::Ok
}

/// Reset the runtime for reuse.
#[no_mangle]
pub unsafe extern "C" fn diffsim_runtime_reset(runtime: RuntimeHandle) -> DiffsimStatus {
    if runtime.is_null() {
        return DiffsimStatus::NullPointer;
    }

    (*runtime).reset();
    DiffsimStatus::Ok
}

// ============================================================================
// Template accessors
// ============================================================================

/// Free a template handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn diffsim_template_free(handle: TemplateHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Get the phase name into a buffer.
///
/// The name is truncated to fit and always null-terminated; `out_len`
/// receives the full length.
///
/// # Safety
/// Handle and buffer must be valid.
#[no_mangle]
pub unsafe extern "C" fn diffsim_template_phase(
    handle: TemplateHandle,
    buffer: *mut c_char,
    buffer_len: usize,
    out_len: *mut usize,
) -> DiffsimStatus {
    if handle.is_null() || buffer.is_null() || out_len.is_null() {
        return DiffsimStatus::NullPointer;
    }
    if buffer_len == 0 {
        return DiffsimStatus::InvalidArgument;
    }

    let phase = (*handle).phase.as_bytes();
    let copy_len = phase.len().min(buffer_len - 1);

    std::ptr::copy_nonoverlapping(phase.as_ptr(), buffer as *mut u8, copy_len);
    *buffer.add(copy_len) = 0;
    *out_len = phase.len();

    DiffsimStatus::Ok
}

/// Get the Euler orientation (3 values, degrees).
///
/// # Safety
/// Handle must be valid and `out` valid for 3 writes.
#[no_mangle]
pub unsafe extern "C" fn diffsim_template_orientation(
    handle: TemplateHandle,
    out: *mut f64,
) -> DiffsimStatus {
    if handle.is_null() || out.is_null() {
        return DiffsimStatus::NullPointer;
    }

    std::ptr::copy_nonoverlapping((*handle).orientation.as_ptr(), out, 3);
    DiffsimStatus::Ok
}

/// Get the image shape.
///
/// # Safety
/// All pointers must be valid.
#[no_mangle]
pub unsafe extern "C" fn diffsim_template_shape(
    handle: TemplateHandle,
    out_rows: *mut usize,
    out_cols: *mut usize,
) -> DiffsimStatus {
    if handle.is_null() || out_rows.is_null() || out_cols.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let (rows, cols) = (*handle).image.dim();
    *out_rows = rows;
    *out_cols = cols;
    DiffsimStatus::Ok
}

/// Copy the image row-major into `out` (`rows * cols` values).
///
/// # Safety
/// Handle must be valid and `out` valid for its stated length.
#[no_mangle]
pub unsafe extern "C" fn diffsim_template_image(
    handle: TemplateHandle,
    out: CMutArrayView,
) -> DiffsimStatus {
    if handle.is_null() || out.data.is_null() {
        return DiffsimStatus::NullPointer;
    }

    let image = &(*handle).image;
    if out.len != image.len() {
        return DiffsimStatus::LengthMismatch;
    }
    copy_out(image.iter().copied(), out);

    DiffsimStatus::Ok
}
