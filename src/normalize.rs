// src/normalize.rs

use crate::curve::{mean, std_dev, IvCurve, Point};
use crate::thresholds::{Axis, Thresholds, Warning};

/// Courbe centrée et mise à l'échelle.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCurve {
    pub points: Vec<Point>,
}

/// Échelles communes aux deux courbes comparées.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScales {
    pub voltage: f64,
    pub current: f64,
}

impl AxisScales {
    /// Plus grand des écarts types mesurés et du seuil de bruit, par axe.
    pub fn estimate(
        a: &IvCurve,
        b: Option<&IvCurve>,
        thresholds: &Thresholds,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let spread_v = b.map_or(0.0, |b| std_dev(b.voltage()));
        let spread_c = b.map_or(0.0, |b| std_dev(b.current()));

        let voltage = effective_scale(
            std_dev(a.voltage()).max(spread_v).max(thresholds.min_var_v),
            Axis::Voltage,
            warnings,
        );
        let current = effective_scale(
            std_dev(a.current()).max(spread_c).max(thresholds.min_var_c),
            Axis::Current,
            warnings,
        );

        Self { voltage, current }
    }

    /// Centre la courbe sur sa propre moyenne puis divise par les échelles communes.
    pub fn apply(&self, curve: &IvCurve) -> NormalizedCurve {
        let mean_v = mean(curve.voltage());
        let mean_c = mean(curve.current());
        let points = curve
            .points()
            .map(|p| {
                Point::new(
                    center(p.v, mean_v, self.voltage),
                    center(p.c, mean_c, self.current),
                )
            })
            .collect();

        NormalizedCurve { points }
    }
}

/// `(x - mean) / scale`, en divisant d'abord si la différence déborde.
fn center(x: f64, mean: f64, scale: f64) -> f64 {
    let d = x - mean;
    if d.is_finite() {
        d / scale
    } else {
        x / scale - mean / scale
    }
}

fn effective_scale(scale: f64, axis: Axis, warnings: &mut Vec<Warning>) -> f64 {
    if scale > 0.0 && scale.is_finite() {
        scale
    } else {
        warnings.push(Warning::FlatAxis { axis });
        1.0
    }
}

/// Normalise deux courbes avec les mêmes échelles.
pub fn normalize_pair(
    a: &IvCurve,
    b: &IvCurve,
    thresholds: &Thresholds,
    warnings: &mut Vec<Warning>,
) -> (NormalizedCurve, NormalizedCurve) {
    let scales = AxisScales::estimate(a, Some(b), thresholds, warnings);
    (scales.apply(a), scales.apply(b))
}

/// Normalise une courbe seule, pour le score de planéité.
pub fn normalize_single(
    curve: &IvCurve,
    thresholds: &Thresholds,
    warnings: &mut Vec<Warning>,
) -> NormalizedCurve {
    AxisScales::estimate(curve, None, thresholds, warnings).apply(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(voltage: &[f64], current: &[f64]) -> IvCurve {
        IvCurve::new(voltage.to_vec(), current.to_vec()).unwrap()
    }

    #[test]
    fn shared_scale_uses_largest_spread() {
        let a = curve(&[-1.0, 1.0, -1.0, 1.0], &[-2.0, 2.0, -2.0, 2.0]);
        let b = curve(&[-3.0, 3.0, -3.0, 3.0], &[-1.0, 1.0, -1.0, 1.0]);
        let mut warnings = Vec::new();

        let scales = AxisScales::estimate(&a, Some(&b), &Thresholds::new(0.1, 0.1).unwrap(), &mut warnings);

        assert_eq!(scales, AxisScales { voltage: 3.0, current: 2.0 });
        assert!(warnings.is_empty());
    }

    #[test]
    fn threshold_caps_small_spread() {
        let a = curve(&[-0.01, 0.01, -0.01, 0.01], &[-1.0, 1.0, -1.0, 1.0]);
        let mut warnings = Vec::new();

        let na = normalize_single(&a, &Thresholds::new(0.5, 0.1).unwrap(), &mut warnings);

        assert!((na.points[1].v - 0.02).abs() < 1e-12);
        assert!((na.points[1].c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn each_curve_centered_on_its_own_mean() {
        let a = curve(&[9.0, 11.0, 9.0, 11.0], &[0.0, 2.0, 0.0, 2.0]);
        let b = curve(&[-1.0, 1.0, -1.0, 1.0], &[5.0, 7.0, 5.0, 7.0]);
        let mut warnings = Vec::new();

        let (na, nb) = normalize_pair(&a, &b, &Thresholds::DEFAULT, &mut warnings);

        assert_eq!(na.points, nb.points);
        assert!((na.points[0].v + 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_axis_without_threshold_stays_finite() {
        let a = curve(&[-1.0, 1.0, -1.0, 1.0], &[0.0; 4]);
        let mut warnings = Vec::new();

        let na = normalize_single(&a, &Thresholds::new(0.0, 0.0).unwrap(), &mut warnings);

        assert!(na.points.iter().all(|p| p.v.is_finite() && p.c == 0.0));
        assert_eq!(warnings, vec![Warning::FlatAxis { axis: Axis::Current }]);
    }

    #[test]
    fn huge_amplitude_keeps_its_scale() {
        let a = curve(&[-1e200, 1e200, -1e200, 1e200], &[-1e200, 1e200, 1e200, -1e200]);
        let mut warnings = Vec::new();

        let na = normalize_single(&a, &Thresholds::new(0.1, 0.1).unwrap(), &mut warnings);

        assert!(warnings.is_empty());
        assert!((na.points[1].v - 1.0).abs() < 1e-12);
        assert!((na.points[3].c + 1.0).abs() < 1e-12);
    }
}
