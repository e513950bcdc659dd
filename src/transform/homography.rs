use rayon::prelude::*;

use crate::foundation::{
    core::{Frame, FrameSize, Point},
    error::{BirdviewError, BirdviewResult},
};

const COLLINEAR_EPS: f64 = 1e-9;
const PIVOT_EPS: f64 = 1e-12;

/// 3x3 projective transform (row-major, `h[8] == 1`) together with its inverse.
#[derive(Clone, Debug, PartialEq)]
pub struct Homography {
    forward: [f64; 9],
    inverse: [f64; 9],
}

impl Homography {
    /// Solve the transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Both quadrilaterals must be non-degenerate: no three of their points may be collinear.
    pub fn from_points(src: [Point; 4], dst: [Point; 4]) -> BirdviewResult<Self> {
        check_quad("source", &src)?;
        check_quad("destination", &dst)?;

        // x' = (h0 x + h1 y + h2) / (h6 x + h7 y + 1)
        // y' = (h3 x + h4 y + h5) / (h6 x + h7 y + 1)
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];
        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let r = i * 2;
            a[r] = [s.x, s.y, 1.0, 0.0, 0.0, 0.0, -d.x * s.x, -d.x * s.y];
            b[r] = d.x;
            a[r + 1] = [0.0, 0.0, 0.0, s.x, s.y, 1.0, -d.y * s.x, -d.y * s.y];
            b[r + 1] = d.y;
        }

        let h = solve_8x8(a, b)?;
        let forward = [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0];
        let inverse = invert_3x3(&forward)?;
        Ok(Self { forward, inverse })
    }

    /// Row-major forward matrix.
    pub fn matrix(&self) -> [f64; 9] {
        self.forward
    }

    /// Map a source point into destination space.
    pub fn map_point(&self, p: Point) -> Point {
        apply(&self.forward, p)
    }

    /// Map a destination point back into source space.
    pub fn inverse_map_point(&self, p: Point) -> Point {
        apply(&self.inverse, p)
    }
}

/// Warp `src` into a new frame of `out` size.
///
/// Every destination pixel is mapped back through the inverse transform and sampled
/// bilinearly; samples falling outside the source blend toward black.
pub fn warp_perspective(src: &Frame, h: &Homography, out: FrameSize) -> BirdviewResult<Frame> {
    let src_size = FrameSize::of(src);
    if src_size.is_empty() {
        return Err(BirdviewError::transform("cannot warp an empty frame"));
    }
    if out.is_empty() {
        return Err(BirdviewError::transform(format!(
            "invalid warp output size {out}"
        )));
    }

    let stride = out.width as usize * 3;
    let mut data = vec![0u8; out.rgb8_len()];
    data.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                // Integer pixel coordinates, no half-pixel offset.
                let p = h.inverse_map_point(Point::new(x as f64, y as f64));
                px.copy_from_slice(&sample_bilinear(src, p.x, p.y));
            }
        });

    Frame::from_raw(out.width, out.height, data)
        .ok_or_else(|| BirdviewError::transform("warp buffer size mismatch (unexpected)"))
}

fn sample_bilinear(src: &Frame, x: f64, y: f64) -> [u8; 3] {
    if !x.is_finite() || !y.is_finite() {
        return [0, 0, 0];
    }
    let (w, h) = (i64::from(src.width()), i64::from(src.height()));
    let x0f = x.floor();
    let y0f = y.floor();
    if x0f < -1.0 || y0f < -1.0 || x0f >= w as f64 || y0f >= h as f64 {
        return [0, 0, 0];
    }

    let (x0, y0) = (x0f as i64, y0f as i64);
    let (fx, fy) = (x - x0f, y - y0f);
    let fetch = |px: i64, py: i64| -> [f64; 3] {
        if px < 0 || py < 0 || px >= w || py >= h {
            return [0.0; 3];
        }
        let p = src.get_pixel(px as u32, py as u32).0;
        [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn apply(m: &[f64; 9], p: Point) -> Point {
    let w = m[6] * p.x + m[7] * p.y + m[8];
    if w.abs() < f64::EPSILON {
        return Point::new(f64::NAN, f64::NAN);
    }
    Point::new(
        (m[0] * p.x + m[1] * p.y + m[2]) / w,
        (m[3] * p.x + m[4] * p.y + m[5]) / w,
    )
}

fn check_quad(which: &str, q: &[Point; 4]) -> BirdviewResult<()> {
    if q.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(BirdviewError::transform(format!(
            "{which} quadrilateral has non-finite points"
        )));
    }
    for (i, j, k) in [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)] {
        let (a, b, c) = (q[i], q[j], q[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross.abs() < COLLINEAR_EPS {
            return Err(BirdviewError::transform(format!(
                "{which} quadrilateral is degenerate: points {i}, {j}, {k} are collinear"
            )));
        }
    }
    Ok(())
}

/// Gaussian elimination with partial pivoting.
fn solve_8x8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> BirdviewResult<[f64; 8]> {
    const N: usize = 8;
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPS {
            return Err(BirdviewError::transform(
                "perspective system is singular (degenerate point configuration)",
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; N];
    for row in (0..N).rev() {
        let tail: f64 = ((row + 1)..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(BirdviewError::transform(
            "perspective solve produced non-finite coefficients",
        ));
    }
    Ok(x)
}

fn invert_3x3(m: &[f64; 9]) -> BirdviewResult<[f64; 9]> {
    let det = m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
        + m[2] * (m[3] * m[7] - m[4] * m[6]);
    if det.abs() < PIVOT_EPS || !det.is_finite() {
        return Err(BirdviewError::transform(
            "perspective matrix is not invertible",
        ));
    }
    let inv_det = 1.0 / det;
    Ok([
        (m[4] * m[8] - m[5] * m[7]) * inv_det,
        (m[2] * m[7] - m[1] * m[8]) * inv_det,
        (m[1] * m[5] - m[2] * m[4]) * inv_det,
        (m[5] * m[6] - m[3] * m[8]) * inv_det,
        (m[0] * m[8] - m[2] * m[6]) * inv_det,
        (m[2] * m[3] - m[0] * m[5]) * inv_det,
        (m[3] * m[7] - m[4] * m[6]) * inv_det,
        (m[1] * m[6] - m[0] * m[7]) * inv_det,
        (m[0] * m[4] - m[1] * m[3]) * inv_det,
    ])
}

#[cfg(test)]
#[path = "../../tests/unit/transform/homography.rs"]
mod tests;
