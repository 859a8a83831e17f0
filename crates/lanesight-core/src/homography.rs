//! Plane-to-plane projective maps and perspective warping.

use crate::{sample_bilinear_rgb, ColorImage, ColorImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// 3x3 projective transform acting on pixel coordinates, scaled so that
/// `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Row-major copy of the matrix.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        let mut rows = [[0.0; 3]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.h[(r, c)];
            }
        }
        rows
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new((q.x / q.z) as f32, (q.y / q.z) as f32)
    }

    /// Inverse map, rescaled to unit `h33`. `None` if singular.
    pub fn inverse(&self) -> Option<Self> {
        self.h
            .try_inverse()
            .and_then(unit_scale)
            .map(Self::new)
    }
}

/// Divide by `h33`; fails when it vanishes (a point maps to infinity).
fn unit_scale(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let h33 = h[(2, 2)];
    (h33.abs() >= 1e-12).then(|| h / h33)
}

/// Similarity moving the quad's centroid to the origin with mean radius
/// `sqrt(2)`. Conditions the 8x8 system for pixel-scale input.
fn conditioning(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let centroid = pts
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| {
            acc + Vector3::new(p.x as f64, p.y as f64, 0.0)
        })
        / 4.0;
    let mean_radius = pts
        .iter()
        .map(|p| (p.x as f64 - centroid.x).hypot(p.y as f64 - centroid.y))
        .sum::<f64>()
        / 4.0;
    let s = if mean_radius > 1e-12 {
        std::f64::consts::SQRT_2 / mean_radius
    } else {
        1.0
    };
    Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    )
}

fn transformed(t: &Matrix3<f64>, p: &Point2<f32>) -> (f64, f64) {
    let q = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    (q.x, q.y)
}

/// Exact homography `dst ~ H * src` through four correspondences.
///
/// Both quads are conditioned first, then the 8 unknowns (with `h33 = 1`) are
/// solved by LU. Returns `None` for degenerate input (repeated points, three
/// collinear points) or a non-finite solution.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut rhs = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = transformed(&t_src, s);
        let (u, v) = transformed(&t_dst, d);
        // u = (h11 x + h12 y + h13) / (h31 x + h32 y + 1), same for v
        a.set_row(
            2 * k,
            &SMatrix::<f64, 1, 8>::from_row_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]),
        );
        a.set_row(
            2 * k + 1,
            &SMatrix::<f64, 1, 8>::from_row_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]),
        );
        rhs[2 * k] = u;
        rhs[2 * k + 1] = v;
    }

    let sol = a.lu().solve(&rhs)?;
    if sol.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let conditioned = Matrix3::new(
        sol[0], sol[1], sol[2], //
        sol[3], sol[4], sol[5], //
        sol[6], sol[7], 1.0,
    );

    let h = unit_scale(t_dst.try_inverse()? * conditioned * t_src)?;
    if h.determinant().abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h))
}

/// Warp a colour frame: for each output pixel, map into the source via
/// `h_src_from_dst` and sample bilinearly. Pixels mapping outside the source
/// are black.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_src_from_dst), fields(w = out_w, h = out_h))
)]
pub fn warp_perspective_rgb(
    src: &ColorImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> ColorImage {
    let mut out = ColorImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            // integer pixel coordinates, matching the corner points the
            // homography was built from
            let ps = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
            if !ps.x.is_finite() || !ps.y.is_finite() {
                continue;
            }
            out.put_pixel(x, y, sample_bilinear_rgb(src, ps.x, ps.y));
        }
    }

    out
}
