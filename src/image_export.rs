// src/image_export.rs

//! Rendus PNG de courbes V-I pour le débogage.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use tracing::info;

use crate::curve::{IvCurve, Point};
use crate::error::Result;
use crate::score::ComparisonTrace;

pub type Canvas = ImageBuffer<Rgba<u8>, Vec<u8>>;

pub const OVERLAY_SIZE: u32 = 800;
pub const TRACE_PANEL_SIZE: u32 = 400;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRID_COLOR: Rgba<u8> = Rgba([200, 200, 200, 255]);
const AXIS_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BORDER_COLOR: Rgba<u8> = Rgba([120, 120, 120, 255]);
pub const COLOR_A: Rgba<u8> = Rgba([255, 100, 0, 255]);
pub const COLOR_B: Rgba<u8> = Rgba([0, 100, 255, 255]);

/// Zone rectangulaire de l'image.
#[derive(Debug, Clone, Copy)]
struct Panel {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Panel {
    fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x as i64
            && x < (self.x + self.w) as i64
            && y >= self.y as i64
            && y < (self.y + self.h) as i64
    }

    fn set(&self, img: &mut Canvas, x: i64, y: i64, color: Rgba<u8>) {
        if self.contains(x, y) {
            if let Some(pixel) = img.get_pixel_mut_checked(x as u32, y as u32) {
                *pixel = color;
            }
        }
    }
}

/// Étendue des données, centre et demi-largeur par axe.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    mid_v: f64,
    mid_c: f64,
    half_v: f64,
    half_c: f64,
}

impl Bounds {
    fn of<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut v = (f64::INFINITY, f64::NEG_INFINITY);
        let mut c = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            v = (v.0.min(p.v), v.1.max(p.v));
            c = (c.0.min(p.c), c.1.max(p.c));
        }

        let axis = |(lo, hi): (f64, f64)| {
            if lo > hi {
                return (0.0, 1.0);
            }
            let half = (hi - lo) / 2.0;
            (lo + half, if half > 0.0 { half } else { 1.0 })
        };
        let (mid_v, half_v) = axis(v);
        let (mid_c, half_c) = axis(c);

        Self {
            mid_v,
            mid_c,
            half_v,
            half_c,
        }
    }

    /// Coordonnées pixel d'un point; la courbe occupe 90 % du panneau.
    fn to_pixel(&self, panel: &Panel, p: Point) -> (f64, f64) {
        let cx = panel.x as f64 + panel.w as f64 / 2.0;
        let cy = panel.y as f64 + panel.h as f64 / 2.0;
        let sx = panel.w as f64 * 0.45 / self.half_v;
        let sy = panel.h as f64 * 0.45 / self.half_c;
        (cx + (p.v - self.mid_v) * sx, cy - (p.c - self.mid_c) * sy)
    }
}

fn draw_grid(img: &mut Canvas, panel: &Panel) {
    for i in 0..=10 {
        let x = (panel.x + panel.w * i / 10).min(panel.x + panel.w - 1) as i64;
        let y = (panel.y + panel.h * i / 10).min(panel.y + panel.h - 1) as i64;
        let color = if i == 0 || i == 10 { BORDER_COLOR } else { GRID_COLOR };
        for t in 0..panel.h as i64 {
            panel.set(img, x, panel.y as i64 + t, color);
        }
        for t in 0..panel.w as i64 {
            panel.set(img, panel.x as i64 + t, y, color);
        }
    }
}

/// Axes V = 0 et I = 0 quand ils tombent dans le panneau.
fn draw_axes(img: &mut Canvas, panel: &Panel, bounds: &Bounds) {
    let (x0, y0) = bounds.to_pixel(panel, Point::new(0.0, 0.0));
    let (x0, y0) = (x0.round() as i64, y0.round() as i64);

    for t in 0..panel.h as i64 {
        panel.set(img, x0, panel.y as i64 + t, AXIS_COLOR);
    }
    for t in 0..panel.w as i64 {
        panel.set(img, panel.x as i64 + t, y0, AXIS_COLOR);
    }
}

fn draw_segment(img: &mut Canvas, panel: &Panel, from: (f64, f64), to: (f64, f64), color: Rgba<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as usize;
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        let x = (from.0 + t * (to.0 - from.0)).round() as i64;
        let y = (from.1 + t * (to.1 - from.1)).round() as i64;
        // trait de 2 pixels
        panel.set(img, x, y, color);
        panel.set(img, x + 1, y, color);
        panel.set(img, x, y + 1, color);
    }
}

/// Trace une courbe fermée dans un panneau.
fn draw_curve(img: &mut Canvas, panel: &Panel, bounds: &Bounds, points: &[Point], color: Rgba<u8>) {
    let pixels: Vec<(f64, f64)> = points.iter().map(|&p| bounds.to_pixel(panel, p)).collect();
    match pixels.len() {
        0 => {}
        1 => draw_segment(img, panel, pixels[0], pixels[0], color),
        n => {
            for i in 0..n {
                draw_segment(img, panel, pixels[i], pixels[(i + 1) % n], color);
            }
        }
    }
}

/// Panneau complet : grille, axes et deux courbes sur une échelle commune.
fn draw_pair(img: &mut Canvas, panel: &Panel, a: &[Point], b: &[Point]) {
    let bounds = Bounds::of(a.iter().chain(b.iter()));
    draw_grid(img, panel);
    draw_axes(img, panel, &bounds);
    draw_curve(img, panel, &bounds, a, COLOR_A);
    draw_curve(img, panel, &bounds, b, COLOR_B);
}

pub fn render_overlay(a: &[Point], b: &[Point]) -> Canvas {
    let mut img = ImageBuffer::from_pixel(OVERLAY_SIZE, OVERLAY_SIZE, BACKGROUND);
    let panel = Panel {
        x: 0,
        y: 0,
        w: OVERLAY_SIZE,
        h: OVERLAY_SIZE,
    };
    draw_pair(&mut img, &panel, a, b);
    img
}

/// Une ligne de deux panneaux par paire d'étapes, chacune à sa propre échelle.
pub fn render_trace(trace: &ComparisonTrace) -> Canvas {
    let columns = 2u32;
    let rows = ((trace.stages.len() as u32 + columns - 1) / columns).max(1);
    let mut img = ImageBuffer::from_pixel(
        columns * TRACE_PANEL_SIZE,
        rows * TRACE_PANEL_SIZE,
        BACKGROUND,
    );

    for (i, stage) in trace.stages.iter().enumerate() {
        let i = i as u32;
        let panel = Panel {
            x: (i % columns) * TRACE_PANEL_SIZE,
            y: (i / columns) * TRACE_PANEL_SIZE,
            w: TRACE_PANEL_SIZE,
            h: TRACE_PANEL_SIZE,
        };
        draw_pair(&mut img, &panel, &stage.a, &stage.b);
    }
    img
}

pub fn save_overlay_png<P: AsRef<Path>>(a: &IvCurve, b: &IvCurve, path: P) -> Result<()> {
    let a: Vec<Point> = a.points().collect();
    let b: Vec<Point> = b.points().collect();
    render_overlay(&a, &b).save(path.as_ref())?;
    info!("Image sauvegardée : {}", path.as_ref().display());
    Ok(())
}

pub fn save_trace_png<P: AsRef<Path>>(trace: &ComparisonTrace, path: P) -> Result<()> {
    render_trace(trace).save(path.as_ref())?;
    info!("Image des étapes sauvegardée : {}", path.as_ref().display());
    Ok(())
}
