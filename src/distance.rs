// src/distance.rs

//! Distance géométrique entre deux suites de points.

use crate::curve::Point;

/// Position de la projection de `p` sur `a -> b` : 0 en `a`, 1 en `b`.
/// `None` pour un segment de longueur nulle.
fn projection(p: Point, a: Point, b: Point) -> Option<f64> {
    let dir = b.sub(a);
    let len2 = dir.norm2();
    if len2 == 0.0 {
        None
    } else {
        Some(dir.dot(p.sub(a)) / len2)
    }
}

/// Carré de la distance de `p` au segment `[a, b]`.
pub fn segment_distance2(p: Point, a: Point, b: Point) -> f64 {
    let rel = p.sub(a);
    match projection(p, a, b) {
        None => rel.norm2(),
        Some(t) if t > 1.0 => p.sub(b).norm2(),
        Some(t) if t < 0.0 => rel.norm2(),
        Some(_) => {
            let dir = b.sub(a);
            let cross = dir.cross(rel);
            cross * cross / dir.norm2()
        }
    }
}

/// Point du segment `[a, b]` le plus proche de `p`.
pub fn closest_on_segment(p: Point, a: Point, b: Point) -> Point {
    match projection(p, a, b) {
        None => a,
        Some(t) => {
            let t = t.clamp(0.0, 1.0);
            let dir = b.sub(a);
            Point::new(a.v + t * dir.v, a.c + t * dir.c)
        }
    }
}

/// Indice du point de `curve` le plus proche de `p`; le plus petit en cas d'égalité.
pub fn nearest_index(p: Point, curve: &[Point]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, q) in curve.iter().enumerate() {
        let d = p.sub(*q).norm2();
        if best.map_or(true, |(_, min)| d < min) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Segments `(début, fin)` d'une polyligne; fermée, elle relie aussi le
/// dernier point au premier.
pub fn segments(curve: &[Point], closed: bool) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = curve.len();
    let count = if closed && n > 1 { n } else { n.saturating_sub(1) };
    (0..count).map(move |j| (curve[j], curve[(j + 1) % n]))
}

/// Carré de la distance de `p` à `curve` autour de son point le plus proche :
/// le plus proche des deux segments adjacents.
fn local_distance2(p: Point, curve: &[Point], closed: bool) -> Option<f64> {
    let n = curve.len();
    let k = nearest_index(p, curve)?;

    // ivcmp.c ignore le segment hors bornes en 0 et N-1; ici la courbe fermée boucle
    let prev = if k > 0 {
        Some(k - 1)
    } else if closed && n > 1 {
        Some(n - 1)
    } else {
        None
    };
    let next = if k + 1 < n {
        Some(k + 1)
    } else if closed && n > 1 {
        Some(0)
    } else {
        None
    };

    let before = prev.map(|j| segment_distance2(p, curve[j], curve[k]));
    let after = next.map(|j| segment_distance2(p, curve[k], curve[j]));

    Some(match (before, after) {
        (Some(x), Some(y)) => x.min(y),
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => p.sub(curve[k]).norm2(),
    })
}

/// Moyenne sur `a` du carré de la distance de chaque point à `b`.
///
/// Non symétrique. Une entrée vide donne 0.
pub fn directional_distance(a: &[Point], b: &[Point], closed: bool) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let total: f64 = a
        .iter()
        .filter_map(|&p| local_distance2(p, b, closed))
        .sum();
    total / a.len() as f64
}

/// Moyenne des deux distances orientées.
pub fn symmetric_distance(a: &[Point], b: &[Point], closed: bool) -> f64 {
    (directional_distance(a, b, closed) + directional_distance(b, a, closed)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: f64, c: f64) -> Point {
        Point::new(v, c)
    }

    #[test]
    fn segment_distance_cases() {
        let a = p(0.0, 0.0);
        let b = p(2.0, 0.0);

        assert!((segment_distance2(p(1.0, 3.0), a, b) - 9.0).abs() < 1e-12);
        assert!((segment_distance2(p(-1.0, 1.0), a, b) - 2.0).abs() < 1e-12);
        assert!((segment_distance2(p(4.0, 0.0), a, b) - 4.0).abs() < 1e-12);
        assert!((segment_distance2(p(1.0, 1.0), a, a) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn closest_point_is_clamped() {
        let a = p(0.0, 0.0);
        let b = p(2.0, 2.0);
        assert_eq!(closest_on_segment(p(2.0, 0.0), a, b), p(1.0, 1.0));
        assert_eq!(closest_on_segment(p(5.0, 5.0), a, b), b);
        assert_eq!(closest_on_segment(p(-1.0, 0.0), a, b), a);
    }

    #[test]
    fn nearest_index_prefers_lowest_on_tie() {
        let curve = [p(1.0, 0.0), p(-1.0, 0.0), p(0.0, 1.0)];
        assert_eq!(nearest_index(p(0.0, 0.0), &curve), Some(0));
        assert_eq!(nearest_index(p(0.0, 2.0), &curve), Some(2));
        assert_eq!(nearest_index(p(0.0, 0.0), &[]), None);
    }

    #[test]
    fn closed_curve_uses_wrap_segment() {
        // carré, point extérieur près du côté de fermeture
        let square = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let outside = [p(-0.1, 0.1)];

        let closed = directional_distance(&outside, &square, true);
        let open = directional_distance(&outside, &square, false);

        assert!((closed - 0.01).abs() < 1e-12);
        assert!((open - 0.02).abs() < 1e-12);
    }

    #[test]
    fn symmetric_distance_of_parallel_lines() {
        let a: Vec<Point> = (0..=10).map(|i| p(i as f64, 0.0)).collect();
        let b: Vec<Point> = (0..=10).map(|i| p(i as f64, 0.5)).collect();

        let d = symmetric_distance(&a, &b, false);
        assert!((d - 0.25).abs() < 1e-12);
        assert!((symmetric_distance(&a, &b, false) - symmetric_distance(&b, &a, false)).abs() < 1e-15);
        assert_eq!(symmetric_distance(&a, &a, true), 0.0);
    }

    #[test]
    fn segments_of_open_and_closed_polylines() {
        let curve = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert_eq!(segments(&curve, false).count(), 2);
        let closed: Vec<_> = segments(&curve, true).collect();
        assert_eq!(closed.len(), 3);
        assert_eq!(closed[2], (p(1.0, 1.0), p(0.0, 0.0)));
        assert_eq!(segments(&curve[..1], true).count(), 0);
    }
}
