//! Atomic scattering tables.
//!
//! The per-species scattering model is an explicit dependency of the image
//! former. The bundled table uses the four-Gaussian parameterisation
//!
//! ```text
//! f(s) = c + sum_i a_i exp(-b_i s^2),    s = sin(theta) / lambda = q / 2
//! ```
//!
//! with coefficients from International Tables for Crystallography,
//! Vol. C, Table 6.1.1.4. In real space each Gaussian becomes
//! `a_i (4 pi / b_i)^(3/2) exp(-4 pi^2 r^2 / b_i)`; the constant `c` is a
//! point term and has no extent on the grid, so it is left out of the
//! real-space potential.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::hash::Hash;

/// Per-species scattering model.
pub trait ScatteringTable<S>: Send + Sync {
    /// Real-space scattering density at squared distance `r2` from the atom.
    fn potential(&self, species: &S, r2: f64) -> f64;

    /// Distance beyond which [`ScatteringTable::potential`] is treated as 0.
    fn cutoff(&self, species: &S) -> f64;

    /// Whether the table knows `species`.
    fn contains(&self, species: &S) -> bool;
}

/// Four-Gaussian form factor coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    pub a: [f64; 4],
    pub b: [f64; 4],
    pub c: f64,
}

impl GaussianParams {
    /// `f(s)` with `s = sin(theta) / lambda`.
    pub fn form_factor_s(&self, s: f64) -> f64 {
        let s2 = s * s;
        self.a
            .iter()
            .zip(&self.b)
            .fold(self.c, |f, (a, b)| f + a * (-b * s2).exp())
    }

    /// Real-space density at squared distance `r2`.
    pub fn potential(&self, r2: f64) -> f64 {
        self.a
            .iter()
            .zip(&self.b)
            .map(|(a, b)| a * (4.0 * PI / b).powf(1.5) * (-4.0 * PI * PI * r2 / b).exp())
            .sum()
    }

    /// Radius at which the widest Gaussian has decayed by `tolerance`.
    pub fn cutoff(&self, tolerance: f64) -> f64 {
        let b_max = self.b.iter().copied().fold(0.0, f64::max);
        (b_max * (1.0 / tolerance).ln()).sqrt() / (2.0 * PI)
    }
}

/// Default relative decay at which atomic potentials are truncated.
pub const DEFAULT_CUTOFF_TOLERANCE: f64 = 1e-4;

/// Scattering table backed by [`GaussianParams`] per species.
#[derive(Debug, Clone)]
pub struct GaussianTable<S> {
    params: HashMap<S, GaussianParams>,
    tolerance: f64,
}

impl<S: Eq + Hash> GaussianTable<S> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            tolerance: DEFAULT_CUTOFF_TOLERANCE,
        }
    }

    /// Set the truncation tolerance used by [`ScatteringTable::cutoff`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Add or replace a species.
    pub fn insert(&mut self, species: S, params: GaussianParams) {
        self.params.insert(species, params);
    }

    pub fn get(&self, species: &S) -> Option<&GaussianParams> {
        self.params.get(species)
    }

    /// Reciprocal-space form factor at scattering vector length `q`
    /// (cycles per unit length), including the constant term. Unknown
    /// species give 0.
    pub fn form_factor(&self, species: &S, q: f64) -> f64 {
        self.params
            .get(species)
            .map_or(0.0, |p| p.form_factor_s(q / 2.0))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<S: Eq + Hash> Default for GaussianTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianTable<u8> {
    /// Standard table keyed by atomic number.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for &(z, params) in STANDARD_ELEMENTS {
            table.insert(z, params);
        }
        table
    }
}

impl<S: Eq + Hash + Send + Sync> ScatteringTable<S> for GaussianTable<S> {
    fn potential(&self, species: &S, r2: f64) -> f64 {
        self.params.get(species).map_or(0.0, |p| p.potential(r2))
    }

    fn cutoff(&self, species: &S) -> f64 {
        self.params
            .get(species)
            .map_or(0.0, |p| p.cutoff(self.tolerance))
    }

    fn contains(&self, species: &S) -> bool {
        self.params.contains_key(species)
    }
}

const fn params(a: [f64; 4], b: [f64; 4], c: f64) -> GaussianParams {
    GaussianParams { a, b, c }
}

/// `(atomic number, coefficients)` for the bundled elements.
const STANDARD_ELEMENTS: &[(u8, GaussianParams)] = &[
    (1, params([0.493002, 0.322912, 0.140191, 0.040810], [10.5109, 26.1257, 3.14236, 57.7997], 0.003038)),
    (2, params([0.8734, 0.6309, 0.3112, 0.1780], [9.1037, 3.3568, 22.9276, 0.9821], 0.0064)),
    (3, params([1.1282, 0.7508, 0.6175, 0.4653], [3.9546, 1.0524, 85.3905, 168.261], 0.0377)),
    (4, params([1.5919, 1.1278, 0.5391, 0.7029], [43.6427, 1.8623, 103.483, 0.5420], 0.0385)),
    (5, params([2.0545, 1.3326, 1.0979, 0.7068], [23.2185, 1.0210, 60.3498, 0.1403], -0.1932)),
    (6, params([2.3100, 1.0200, 1.5886, 0.8650], [20.8439, 10.2075, 0.5687, 51.6512], 0.2156)),
    (8, params([3.0485, 2.2868, 1.5463, 0.8670], [13.2771, 5.7011, 0.3239, 32.9089], 0.2508)),
    (9, params([3.5392, 2.6412, 1.5170, 1.0243], [10.2825, 4.2944, 0.2615, 26.1476], 0.2776)),
    (11, params([4.7626, 3.1736, 1.2674, 1.1128], [3.2850, 8.8422, 0.3136, 129.424], 0.6760)),
    (12, params([5.4204, 2.1735, 1.2269, 2.3073], [2.8275, 79.2611, 0.3808, 7.1937], 0.8584)),
    (13, params([6.4202, 1.9002, 1.5936, 1.9646], [3.0387, 0.7426, 31.5472, 85.0886], 1.1151)),
    (14, params([6.2915, 3.0353, 1.9891, 1.5410], [2.4386, 32.3337, 0.6785, 81.6937], 1.1407)),
    (19, params([8.2186, 7.4398, 1.0519, 0.8659], [12.7949, 0.7748, 213.187, 41.6841], 1.4228)),
    (20, params([8.6266, 7.3873, 1.5899, 1.0211], [10.4421, 0.6599, 85.7484, 178.437], 1.3751)),
    (22, params([9.7595, 7.3558, 1.6991, 1.9021], [7.8508, 0.5000, 35.6338, 116.105], 1.2807)),
    (23, params([10.2971, 7.3511, 2.0703, 2.0571], [6.8657, 0.4385, 26.8938, 102.478], 1.2199)),
    (24, params([10.6406, 7.3537, 3.3240, 1.4922], [6.1038, 0.3920, 20.2626, 98.7399], 1.1832)),
    (26, params([11.7695, 7.3573, 3.5222, 2.3045], [4.7611, 0.3072, 15.3535, 76.8805], 1.0369)),
    (28, params([12.8376, 7.2920, 4.4438, 2.3800], [3.8785, 0.2565, 12.1763, 66.3421], 1.0341)),
    (29, params([13.3380, 7.1676, 5.6158, 1.6735], [3.5828, 0.2470, 11.3966, 64.8126], 1.1910)),
    (31, params([15.2354, 6.7006, 4.3591, 2.9623], [3.0669, 0.2412, 10.7805, 61.4135], 1.7189)),
    (33, params([16.6723, 6.0701, 3.4313, 4.2779], [2.6345, 0.2647, 12.9479, 47.7972], 2.531)),
    (42, params([3.7025, 17.2356, 12.8876, 3.7429], [0.2772, 1.0958, 11.0040, 61.6584], 4.3875)),
    (79, params([16.8819, 18.5913, 25.5582, 5.8600], [0.4611, 8.6216, 1.4826, 36.3956], 12.0658)),
    (83, params([33.3689, 12.9510, 16.5877, 6.4692], [0.7040, 2.9238, 8.7937, 48.0093], 13.5782)),
];
