// src/curve.rs

use crate::config::MAX_CURVE_POINTS;
use crate::error::{Error, Result};

/// Un échantillon (tension, courant).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub v: f64,
    pub c: f64,
}

impl Point {
    pub fn new(v: f64, c: f64) -> Self {
        Self { v, c }
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.v - other.v, self.c - other.c)
    }

    pub fn dot(self, other: Point) -> f64 {
        self.v * other.v + self.c * other.c
    }

    pub fn cross(self, other: Point) -> f64 {
        self.v * other.c - self.c * other.v
    }

    pub fn norm2(self) -> f64 {
        self.dot(self)
    }
}

/// Courbe V-I sur une période du signal de sonde.
///
/// Toujours non vide, tensions et courants de même longueur, valeurs finies.
#[derive(Debug, Clone, PartialEq)]
pub struct IvCurve {
    voltage: Vec<f64>,
    current: Vec<f64>,
}

impl IvCurve {
    pub fn new(voltage: Vec<f64>, current: Vec<f64>) -> Result<Self> {
        if voltage.len() != current.len() {
            return Err(Error::LengthMismatch {
                voltage: voltage.len(),
                current: current.len(),
            });
        }
        if voltage.is_empty() {
            return Err(Error::InvalidInput("courbe sans point".to_string()));
        }
        if let Some(i) = voltage
            .iter()
            .zip(current.iter())
            .position(|(v, c)| !v.is_finite() || !c.is_finite())
        {
            return Err(Error::InvalidInput(format!("échantillon non fini à l'indice {}", i)));
        }

        Ok(Self { voltage, current })
    }

    /// Construit une courbe depuis des tableaux plus grands que la longueur logique.
    pub fn from_buffers(voltages: &[f64], currents: &[f64], length: usize) -> Result<Self> {
        if length > voltages.len() || length > currents.len() {
            return Err(Error::InvalidInput(format!(
                "longueur {} au-delà de la capacité ({} tensions, {} courants)",
                length,
                voltages.len(),
                currents.len()
            )));
        }
        Self::new(voltages[..length].to_vec(), currents[..length].to_vec())
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.voltage
            .iter()
            .zip(self.current.iter())
            .map(|(&v, &c)| Point::new(v, c))
    }
}

/// Représentation à capacité fixe utilisée côté appelant embarqué.
#[derive(Debug, Clone)]
pub struct CurveBuffer {
    pub voltages: [f64; MAX_CURVE_POINTS],
    pub currents: [f64; MAX_CURVE_POINTS],
    pub length: usize,
}

impl Default for CurveBuffer {
    fn default() -> Self {
        Self {
            voltages: [0.0; MAX_CURVE_POINTS],
            currents: [0.0; MAX_CURVE_POINTS],
            length: MAX_CURVE_POINTS,
        }
    }
}

impl CurveBuffer {
    pub fn to_curve(&self) -> Result<IvCurve> {
        IvCurve::from_buffers(&self.voltages, &self.currents, self.length)
    }
}

impl TryFrom<&CurveBuffer> for IvCurve {
    type Error = Error;

    fn try_from(buffer: &CurveBuffer) -> Result<Self> {
        buffer.to_curve()
    }
}

/// Moyenne; repli sur les valeurs réduites si la somme déborde.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let avg = values.iter().sum::<f64>() / n;
    if avg.is_finite() {
        return avg;
    }
    let scale = max_abs(values);
    scale * (values.iter().map(|x| x / scale).sum::<f64>() / n)
}

/// Écart type de population (division par N).
///
/// Les carrés des écarts débordent vers l'infini pour des amplitudes vers
/// 1e160 et s'annulent vers 1e-160 : dans ces cas le calcul est refait sur
/// les valeurs divisées par leur plus grande valeur absolue.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let avg = mean(values);
    let disp = values.iter().map(|x| (x - avg) * (x - avg)).sum::<f64>() / n;
    if disp.is_normal() {
        return disp.sqrt();
    }

    let scale = max_abs(values);
    if scale == 0.0 {
        return 0.0;
    }
    let reduced: Vec<f64> = values.iter().map(|x| x / scale).collect();
    let avg = reduced.iter().sum::<f64>() / n;
    let disp = reduced.iter().map(|x| (x - avg) * (x - avg)).sum::<f64>() / n;
    scale * disp.sqrt()
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// Supprime les points consécutifs quasi identiques, le dernier point est toujours gardé.
pub fn remove_repeats(points: &[Point], eps: f64) -> Vec<Point> {
    let mut out = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        if (next.v - cur.v).abs() > eps || (next.c - cur.c).abs() > eps {
            out.push(cur);
        }
    }
    if let Some(&last) = points.last() {
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_curve() {
        let err = IvCurve::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = IvCurve::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                voltage: 2,
                current: 1
            }
        ));
    }

    #[test]
    fn rejects_non_finite_samples() {
        let err = IvCurve::new(vec![1.0, f64::NAN], vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn buffer_length_selects_logical_curve() {
        let mut buffer = CurveBuffer::default();
        for i in 0..20 {
            buffer.voltages[i] = i as f64;
            buffer.currents[i] = -(i as f64);
        }
        buffer.length = 20;

        let curve = IvCurve::try_from(&buffer).unwrap();
        assert_eq!(curve.len(), 20);
        assert_eq!(curve.voltage()[19], 19.0);
        assert_eq!(curve.current()[19], -19.0);
    }

    #[test]
    fn buffer_length_beyond_capacity_is_invalid() {
        let mut buffer = CurveBuffer::default();
        buffer.length = MAX_CURVE_POINTS + 1;
        assert!(matches!(buffer.to_curve(), Err(Error::InvalidInput(_))));

        buffer.length = 0;
        assert!(matches!(buffer.to_curve(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn population_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
        assert_eq!(std_dev(&[3.0; 10]), 0.0);
    }

    #[test]
    fn std_dev_at_extreme_amplitudes() {
        for amplitude in [1e200, 1e-300, f64::MAX / 2.0] {
            let values: Vec<f64> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
                .iter()
                .map(|x| (x - 5.0) / 4.0 * amplitude)
                .collect();
            let sigma = std_dev(&values);
            assert!((sigma / amplitude - 0.5).abs() < 1e-12, "{} : {}", amplitude, sigma);
        }
        assert!(mean(&[f64::MAX, f64::MAX]).is_finite());
    }

    #[test]
    fn remove_repeats_keeps_last_point() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1e-9),
        ];
        let out = remove_repeats(&points, 1e-6);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(1.0, 1e-9)]);
    }
}
