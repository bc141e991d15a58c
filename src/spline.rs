// src/spline.rs

//! Spline cubique paramétrique fermée (périodique) passant par une boucle de points.
//!
//! La boucle est paramétrée sur une période `[0, 1)` avec des nœuds
//! centripètes : chaque pas est proportionnel à la racine carrée de la corde
//! entre points consécutifs, corde de fermeture comprise. Chaque coordonnée
//! est une spline cubique interpolante de ce paramètre, de classe C2 partout,
//! raccord compris.

use crate::config::{CENTRIPETAL_EXPONENT, DEDUP_EPSILON, MIN_SPLINE_POINTS};
use crate::curve::Point;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ClosedSpline {
    nodes: Vec<Point>,
    /// Paramètre de chaque nœud, `knots[0] == 0`.
    knots: Vec<f64>,
    /// Pas de paramètre du nœud `k` au nœud `k + 1` (modulo len); somme 1.
    steps: Vec<f64>,
    /// Dérivées secondes aux nœuds.
    second: Vec<Point>,
}

impl ClosedSpline {
    /// Construit la spline passant par `points`, lus comme une boucle fermée.
    ///
    /// Les doublons consécutifs exacts sont ignorés. Un dernier point égal au
    /// premier ferme la boucle et est fusionné avec lui.
    pub fn fit(points: &[Point]) -> Result<Self> {
        let mut nodes: Vec<Point> = Vec::with_capacity(points.len());
        for &p in points {
            if nodes.last() != Some(&p) {
                nodes.push(p);
            }
        }
        if nodes.len() > 1 {
            let first = nodes[0];
            let last = nodes[nodes.len() - 1];
            if (last.v - first.v).abs() <= DEDUP_EPSILON && (last.c - first.c).abs() <= DEDUP_EPSILON {
                nodes.pop();
            }
        }

        let m = nodes.len();
        if m < MIN_SPLINE_POINTS {
            return Err(Error::InsufficientPoints {
                found: m,
                required: MIN_SPLINE_POINTS,
            });
        }

        let chords: Vec<f64> = (0..m)
            .map(|k| {
                nodes[(k + 1) % m]
                    .sub(nodes[k])
                    .norm2()
                    .sqrt()
                    .powf(CENTRIPETAL_EXPONENT)
            })
            .collect();
        let total: f64 = chords.iter().sum();
        let steps: Vec<f64> = chords.iter().map(|d| d / total).collect();

        let mut knots = Vec::with_capacity(m);
        let mut t = 0.0;
        for step in &steps {
            knots.push(t);
            t += step;
        }

        let voltage: Vec<f64> = nodes.iter().map(|p| p.v).collect();
        let current: Vec<f64> = nodes.iter().map(|p| p.c).collect();
        let second_v = periodic_second_derivatives(&steps, &voltage);
        let second_c = periodic_second_derivatives(&steps, &current);
        let second = second_v
            .into_iter()
            .zip(second_c)
            .map(|(v, c)| Point::new(v, c))
            .collect();

        Ok(Self {
            nodes,
            knots,
            steps,
            second,
        })
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Position au paramètre `t`, pris modulo 1.
    pub fn evaluate(&self, t: f64) -> Point {
        let (seg, t) = self.locate(t);
        let next = (seg + 1) % self.nodes.len();
        let h = self.steps[seg];
        let a = (self.knots[seg] + h - t) / h;
        let b = (t - self.knots[seg]) / h;

        let blend = |y0: f64, y1: f64, m0: f64, m1: f64| {
            a * y0 + b * y1 + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
        };

        let (p0, p1) = (self.nodes[seg], self.nodes[next]);
        let (m0, m1) = (self.second[seg], self.second[next]);
        Point::new(blend(p0.v, p1.v, m0.v, m1.v), blend(p0.c, p1.c, m0.c, m1.c))
    }

    /// Dérivée première par rapport au paramètre en `t`, pris modulo 1.
    pub fn derivative(&self, t: f64) -> Point {
        let (seg, t) = self.locate(t);
        let next = (seg + 1) % self.nodes.len();
        let h = self.steps[seg];
        let a = (self.knots[seg] + h - t) / h;
        let b = (t - self.knots[seg]) / h;

        let slope = |y0: f64, y1: f64, m0: f64, m1: f64| {
            (y1 - y0) / h - (3.0 * a * a - 1.0) * h * m0 / 6.0 + (3.0 * b * b - 1.0) * h * m1 / 6.0
        };

        let (p0, p1) = (self.nodes[seg], self.nodes[next]);
        let (m0, m1) = (self.second[seg], self.second[next]);
        Point::new(slope(p0.v, p1.v, m0.v, m1.v), slope(p0.c, p1.c, m0.c, m1.c))
    }

    /// `count` points aux paramètres régulièrement espacés `k / count`.
    pub fn sample(&self, count: usize) -> Vec<Point> {
        (0..count)
            .map(|k| self.evaluate(k as f64 / count as f64))
            .collect()
    }

    fn locate(&self, t: f64) -> (usize, f64) {
        let t = t.rem_euclid(1.0);
        let seg = self
            .knots
            .partition_point(|&k| k <= t)
            .saturating_sub(1)
            .min(self.nodes.len() - 1);
        (seg, t)
    }
}

/// Dérivées secondes de la spline cubique périodique interpolante.
///
/// Ligne `i` : `h[i-1] M[i-1] + 2 (h[i-1] + h[i]) M[i] + h[i] M[i+1]
///   = 6 ((y[i+1] - y[i]) / h[i] - (y[i] - y[i-1]) / h[i-1])`, indices modulo n.
fn periodic_second_derivatives(steps: &[f64], values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let prev = |i: usize| (i + n - 1) % n;
    let next = |i: usize| (i + 1) % n;

    let lower: Vec<f64> = (0..n).map(|i| steps[prev(i)]).collect();
    let diag: Vec<f64> = (0..n).map(|i| 2.0 * (steps[prev(i)] + steps[i])).collect();
    let upper: Vec<f64> = steps.to_vec();
    let rhs: Vec<f64> = (0..n)
        .map(|i| {
            6.0 * ((values[next(i)] - values[i]) / steps[i]
                - (values[i] - values[prev(i)]) / steps[prev(i)])
        })
        .collect();

    solve_cyclic(&lower, &diag, &upper, &rhs)
}

/// Système tridiagonal cyclique : Sherman-Morrison sur l'algorithme de Thomas.
///
/// `lower[0]` couple la ligne 0 à la dernière inconnue, `upper[n-1]` la
/// dernière ligne à la première. Diagonale strictement dominante supposée.
fn solve_cyclic(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let alpha = upper[n - 1];
    let beta = lower[0];
    let gamma = -diag[0];

    let mut reduced = diag.to_vec();
    reduced[0] -= gamma;
    reduced[n - 1] -= alpha * beta / gamma;

    let x = solve_tridiagonal(lower, &reduced, upper, rhs);

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = alpha;
    let z = solve_tridiagonal(lower, &reduced, upper, &u);

    let factor = (x[0] + beta * x[n - 1] / gamma) / (1.0 + z[0] + beta * z[n - 1] / gamma);
    x.iter().zip(z.iter()).map(|(xi, zi)| xi - factor * zi).collect()
}

/// Algorithme de Thomas; `lower[0]` et `upper[n-1]` sont ignorés.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - lower[i] * c_prime[i - 1];
        if i < n - 1 {
            c_prime[i] = upper[i] / denom;
        }
        d_prime[i] = (rhs[i] - lower[i] * d_prime[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}
