// src/config.rs

// Paramètres de comparaison
pub const MAX_CURVE_POINTS: usize = 1000;
pub const MIN_VAR_V_DEFAULT: f64 = 0.6;
pub const MIN_VAR_C_DEFAULT: f64 = 0.0002;
pub const DEDUP_EPSILON: f64 = 1e-6;
pub const MIN_SPLINE_POINTS: usize = 4;
pub const CENTRIPETAL_EXPONENT: f64 = 0.5;
pub const SCORE_RATE: f64 = 8.0;

// Diagnostic d'écart maximal
pub const MIN_NORM_V: f64 = 0.1;
pub const MIN_NORM_C: f64 = 0.00005;
pub const MIN_DEVIATION_POINTS: usize = 2;

// Fichiers de référence
pub const FIXTURE_THRESHOLD_RATIO: f64 = 0.001;
pub const FIXTURE_SCORE_TOLERANCE: f64 = 0.05;

// Trames de capture CT220S
pub const REPORT_DATA_SIZE: usize = 64;
pub const READ_SIZE: usize = 65;
pub const POINTS_PER_CURVE: usize = 512;
pub const REPORTS_PER_CURVE: usize = 32;
pub const HEADER_MAGIC: [u8; 2] = [0xf0, 0xff];
