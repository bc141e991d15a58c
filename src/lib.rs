// src/lib.rs

//! Comparaison de signatures V-I (courbes courant-tension).
//!
//! Le noyau produit un score de dissemblance dans `[0, 1)` : 0 pour deux
//! courbes de même forme, proche de 1 pour des composants sans rapport.
//! Les fonctions libres ci-dessous utilisent les seuils globaux ; un
//! [`Comparator`] travaille avec des seuils explicites.

pub mod capture;
pub mod config;
pub mod curve;
pub mod deviation;
pub mod distance;
pub mod error;
pub mod fixture;
pub mod image_export;
pub mod normalize;
pub mod resample;
pub mod score;
pub mod spline;
pub mod thresholds;

pub use curve::{CurveBuffer, IvCurve, Point};
pub use deviation::{compute_max_deviations, MaxDeviations};
pub use error::{Error, Result};
pub use score::{rescale_score, Comparator, Comparison, ComparisonTrace};
pub use thresholds::{
    derive_thresholds_from_curves, set_thresholds, thresholds, Axis, Thresholds, Warning,
};

/// Compare deux courbes avec les seuils globaux.
pub fn compare_curves(a: &IvCurve, b: &IvCurve) -> Result<f64> {
    Comparator::with_default_thresholds().compare(a, b)
}

/// Score de planéité d'une seule courbe avec les seuils globaux.
pub fn score_single_curve(curve: &IvCurve) -> Result<f64> {
    Comparator::with_default_thresholds().flatness(curve)
}

