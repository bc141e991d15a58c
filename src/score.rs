// src/score.rs

//! Score de dissemblance entre courbes V-I.
//!
//! Chaîne de traitement : mise à l'échelle commune ([`crate::normalize`]),
//! suppression des répétitions et ré-échantillonnage par spline fermée
//! ([`crate::resample`]), distance point-segment symétrique
//! ([`crate::distance`]) puis la saturation ci-dessous.

use crate::config::SCORE_RATE;
use crate::curve::{IvCurve, Point};
use crate::distance::symmetric_distance;
use crate::error::{Error, Result};
use crate::normalize::{normalize_pair, normalize_single};
use crate::resample::{deduplicate, resample, resample_distinct};
use crate::thresholds::{self, Thresholds, Warning};

/// Plus grande valeur strictement inférieure à 1.
pub const MAX_SCORE: f64 = 1.0 - f64::EPSILON / 2.0;

/// `1 - exp(-8 x)` : 0 pour deux formes identiques, tend vers 1 sinon.
pub fn rescale_score(x: f64) -> f64 {
    (1.0 - (-SCORE_RATE * x).exp()).clamp(0.0, MAX_SCORE)
}

fn finite(x: f64, what: &'static str) -> Result<f64> {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(Error::NonFinite(what))
    }
}

/// Score d'un appel et avertissements relevés en chemin.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub score: f64,
    pub warnings: Vec<Warning>,
}

/// Une étape de la chaîne, pour les deux courbes.
#[derive(Debug, Clone)]
pub struct TraceStage {
    pub name: &'static str,
    pub title: &'static str,
    pub a: Vec<Point>,
    pub b: Vec<Point>,
}

/// Toutes les courbes intermédiaires d'une comparaison.
#[derive(Debug, Clone)]
pub struct ComparisonTrace {
    pub stages: Vec<TraceStage>,
    pub score: f64,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    thresholds: Thresholds,
}

impl Comparator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Copie des seuils globaux au moment de l'appel.
    pub fn with_default_thresholds() -> Self {
        Self::new(thresholds::thresholds())
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Dissemblance dans `[0, 1)`.
    pub fn compare(&self, a: &IvCurve, b: &IvCurve) -> Result<f64> {
        self.compare_detailed(a, b).map(|c| c.score)
    }

    pub fn compare_detailed(&self, a: &IvCurve, b: &IvCurve) -> Result<Comparison> {
        let mut warnings = self.thresholds.warnings();
        let (na, nb) = normalize_pair(a, b, &self.thresholds, &mut warnings);

        let ra = resample(&na)?;
        let rb = resample(&nb)?;

        let distance = finite(symmetric_distance(&ra.points, &rb.points, true), "distance")?;
        Ok(Comparison {
            score: rescale_score(distance),
            warnings,
        })
    }

    /// Planéité d'une courbe : proche de 0 quand le courant reste nul.
    pub fn flatness(&self, curve: &IvCurve) -> Result<f64> {
        self.flatness_detailed(curve).map(|c| c.score)
    }

    pub fn flatness_detailed(&self, curve: &IvCurve) -> Result<Comparison> {
        let mut warnings = self.thresholds.warnings();
        let resampled = resample(&normalize_single(curve, &self.thresholds, &mut warnings))?;

        let n = resampled.points.len() as f64;
        let mean_c2 = resampled.points.iter().map(|p| p.c * p.c).sum::<f64>() / n;
        Ok(Comparison {
            score: rescale_score(finite(mean_c2, "planéité")?),
            warnings,
        })
    }

    /// Comme [`Comparator::compare_detailed`], en gardant chaque étape.
    pub fn trace(&self, a: &IvCurve, b: &IvCurve) -> Result<ComparisonTrace> {
        let mut warnings = self.thresholds.warnings();
        let (na, nb) = normalize_pair(a, b, &self.thresholds, &mut warnings);

        let da = deduplicate(&na);
        let db = deduplicate(&nb);
        let ra = resample_distinct(&da, a.len())?;
        let rb = resample_distinct(&db, b.len())?;

        let distance = finite(symmetric_distance(&ra.points, &rb.points, true), "distance")?;
        let score = rescale_score(distance);

        let stages = vec![
            TraceStage {
                name: "input",
                title: "Courbes d'entrée",
                a: a.points().collect(),
                b: b.points().collect(),
            },
            TraceStage {
                name: "normalized",
                title: "Après mise à l'échelle",
                a: na.points,
                b: nb.points,
            },
            TraceStage {
                name: "deduplicated",
                title: "Après suppression des répétitions",
                a: da,
                b: db,
            },
            TraceStage {
                name: "resampled",
                title: "Après ré-échantillonnage",
                a: ra.points,
                b: rb.points,
            },
        ];

        Ok(ComparisonTrace {
            stages,
            score,
            warnings,
        })
    }
}
