// src/deviation.rs

//! Plus grand écart par axe entre une courbe de référence et une mesure.
//!
//! Sert à l'affichage et au débogage, jamais à une décision de conformité.

use crate::config::{DEDUP_EPSILON, MIN_DEVIATION_POINTS, MIN_NORM_C, MIN_NORM_V};
use crate::curve::{remove_repeats, IvCurve, Point};
use crate::distance::{closest_on_segment, segments};
use crate::error::{Error, Result};

/// Écarts maximaux, relatifs à l'amplitude de la référence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxDeviations {
    pub voltage: f64,
    pub current: f64,
}

/// Pour chaque point de référence, cherche le point le plus proche sur la
/// courbe mesurée (fermée); renvoie les plus grandes composantes de ces
/// écarts, divisées par l'amplitude de la référence sur le même axe.
pub fn compute_max_deviations(reference: &IvCurve, test: &IvCurve) -> Result<MaxDeviations> {
    let norm_v = amplitude(reference.voltage()).max(MIN_NORM_V);
    let norm_c = amplitude(reference.current()).max(MIN_NORM_C);

    let reference_points: Vec<Point> = reference.points().collect();
    let test_points: Vec<Point> = test.points().collect();
    let reference_points = remove_repeats(&reference_points, DEDUP_EPSILON);
    let test_points = remove_repeats(&test_points, DEDUP_EPSILON);

    let shortest = reference_points.len().min(test_points.len());
    if shortest < MIN_DEVIATION_POINTS {
        return Err(Error::InsufficientPoints {
            found: shortest,
            required: MIN_DEVIATION_POINTS,
        });
    }

    // Échelle de travail commune aux deux courbes
    let scale_v = working_scale(&reference_points, &test_points, |p| p.v);
    let scale_c = working_scale(&reference_points, &test_points, |p| p.c);
    let scaled = |p: &Point| Point::new(p.v / scale_v, p.c / scale_c);

    let reference_points: Vec<Point> = reference_points.iter().map(scaled).collect();
    let test_points: Vec<Point> = test_points.iter().map(scaled).collect();

    let mut max_v: f64 = 0.0;
    let mut max_c: f64 = 0.0;
    for &p in &reference_points {
        let mut best: Option<(f64, Point)> = None;
        for (a, b) in segments(&test_points, true) {
            let offset = p.sub(closest_on_segment(p, a, b));
            let d = offset.norm2();
            if best.map_or(true, |(min, _)| d < min) {
                best = Some((d, offset));
            }
        }
        if let Some((_, offset)) = best {
            max_v = max_v.max(offset.v.abs());
            max_c = max_c.max(offset.c.abs());
        }
    }

    Ok(MaxDeviations {
        voltage: max_v * scale_v / norm_v,
        current: max_c * scale_c / norm_c,
    })
}

fn amplitude(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

fn working_scale(a: &[Point], b: &[Point], axis: impl Fn(&Point) -> f64) -> f64 {
    let max = a.iter().chain(b.iter()).fold(0.0, |acc: f64, p| acc.max(axis(p).abs()));
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const VOLTAGE_AMPL: f64 = 12.0;
    const CURRENT_AMPL: f64 = 12.0 / 475.0 * 1000.0;
    const N: usize = 1000;

    fn sine_curve(kv: f64, kc: f64, n: usize, shifted: bool) -> IvCurve {
        let phase = |i: usize| 2.0 * PI * i as f64 / n as f64;
        let voltage = (0..n).map(|i| kv * VOLTAGE_AMPL * phase(i).sin()).collect();
        let current = (0..n)
            .map(|i| {
                let x = phase(i);
                kc * CURRENT_AMPL * if shifted { x.cos() } else { x.sin() }
            })
            .collect();
        IvCurve::new(voltage, current).unwrap()
    }

    #[test]
    fn identical_curves_have_no_deviation() {
        let r = sine_curve(0.5, 0.5, N, false);
        let dev = compute_max_deviations(&r, &r).unwrap();
        assert!(dev.voltage < 0.01 && dev.current < 0.01, "{:?}", dev);
    }

    #[test]
    fn open_against_short_circuit() {
        let open = sine_curve(1.0, 0.0, N, false);
        let short = sine_curve(0.0, 1.0, N, false);

        let dev = compute_max_deviations(&open, &short).unwrap();
        assert!((dev.voltage - 1.0).abs() < 0.02 && dev.current < 0.01, "{:?}", dev);

        let dev = compute_max_deviations(&short, &open).unwrap();
        assert!(dev.voltage < 0.01 && (dev.current - 1.0).abs() < 0.02, "{:?}", dev);
    }

    #[test]
    fn resistors_of_different_slope() {
        let r1 = sine_curve(0.5, 0.5, N, false);
        let r2 = sine_curve(0.47, 0.63, N, false);

        let dev = compute_max_deviations(&r1, &r2).unwrap();
        assert!((dev.voltage - 0.14).abs() < 0.03, "{:?}", dev);
        assert!((dev.current - 0.16).abs() < 0.03, "{:?}", dev);
    }

    #[test]
    fn resistor_against_coarse_capacitor() {
        let r1 = sine_curve(0.5, 0.5, N, false);
        let cap = sine_curve(1.0, 1.0, 20, true);

        let dev = compute_max_deviations(&r1, &cap).unwrap();
        assert!(dev.voltage > 1.0 && dev.current > 1.0, "{:?}", dev);
    }

    #[test]
    fn constant_curve_is_insufficient() {
        let r1 = sine_curve(0.5, 0.5, N, false);
        let flat = IvCurve::new(vec![1.0; 10], vec![0.0; 10]).unwrap();

        assert!(matches!(
            compute_max_deviations(&r1, &flat),
            Err(Error::InsufficientPoints { found: 1, required: 2 })
        ));
    }
}
