// src/resample.rs

use crate::config::DEDUP_EPSILON;
use crate::curve::{remove_repeats, Point};
use crate::error::Result;
use crate::normalize::NormalizedCurve;
use crate::spline::ClosedSpline;

/// Courbe ré-échantillonnée à densité de paramètre uniforme.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledCurve {
    pub points: Vec<Point>,
}

/// Retire les échantillons répétés (écart inférieur à l'epsilon sur les deux axes).
pub fn deduplicate(curve: &NormalizedCurve) -> Vec<Point> {
    remove_repeats(&curve.points, DEDUP_EPSILON)
}

/// Ajuste la spline fermée sur des points déjà dédoublonnés et l'évalue `count` fois.
pub fn resample_distinct(distinct: &[Point], count: usize) -> Result<ResampledCurve> {
    let spline = ClosedSpline::fit(distinct)?;
    Ok(ResampledCurve {
        points: spline.sample(count),
    })
}

/// Même nombre de points qu'à l'entrée, quel que soit le nombre de répétitions retirées.
pub fn resample(curve: &NormalizedCurve) -> Result<ResampledCurve> {
    resample_distinct(&deduplicate(curve), curve.points.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::f64::consts::PI;

    fn ellipse_with_repeats(n: usize) -> NormalizedCurve {
        let mut points = Vec::new();
        for i in 0..n {
            let angle = 2.0 * PI * i as f64 / n as f64;
            let p = Point::new(angle.cos(), 0.5 * angle.sin());
            points.push(p);
            if i % 3 == 0 {
                points.push(p);
            }
        }
        NormalizedCurve { points }
    }

    #[test]
    fn keeps_original_sample_count() {
        let curve = ellipse_with_repeats(30);
        let original = curve.points.len();

        assert_eq!(deduplicate(&curve).len(), 30);

        let resampled = resample(&curve).unwrap();
        assert_eq!(resampled.points.len(), original);
    }

    #[test]
    fn resampled_points_stay_on_shape() {
        let resampled = resample(&ellipse_with_repeats(40)).unwrap();

        for p in &resampled.points {
            let r = p.v * p.v + 4.0 * p.c * p.c;
            assert!((r - 1.0).abs() < 1e-2, "off ellipse: {:?}", p);
        }
    }

    #[test]
    fn flat_curve_is_insufficient() {
        let curve = NormalizedCurve {
            points: vec![Point::new(0.5, 0.0); 50],
        };
        assert!(matches!(
            resample(&curve),
            Err(Error::InsufficientPoints { found: 1, .. })
        ));
    }
}
