//! Face alignment to the canonical 112×112 ArcFace crop.
//!
//! A 4-DOF similarity transform (scale, rotation, translation) is fitted from
//! the five detected landmarks to the InsightFace reference positions by
//! least squares, then the face is resampled with bilinear interpolation.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// ArcFace reference landmarks for a 112×112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [a -b; b a] * src + [tx; ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Least-squares fit of `src` onto `dst`.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        // Normal equations for the rows
        //   [sx, -sy, 1, 0] · [a, b, tx, ty] = dx
        //   [sy,  sx, 0, 1] · [a, b, tx, ty] = dy
        let mut ata = [[0.0f32; 4]; 4];
        let mut atb = [0.0f32; 4];

        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            let r1 = [sx, -sy, 1.0, 0.0];
            let r2 = [sy, sx, 0.0, 1.0];
            for j in 0..4 {
                for k in 0..4 {
                    ata[j][k] += r1[j] * r1[k] + r2[j] * r2[k];
                }
                atb[j] += r1[j] * dx + r2[j] * dy;
            }
        }

        match solve_4x4(ata, atb) {
            Some([a, b, tx, ty]) => Self { a, b, tx, ty },
            None => Self { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 },
        }
    }

    /// Map an output pixel back into source coordinates.
    fn invert_point(&self, ox: f32, oy: f32) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let (dx, dy) = (ox - self.tx, oy - self.ty);
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Gaussian elimination with partial pivoting. `None` when singular.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(a: [[f32; 4]; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&a[i]);
        m[i][4] = b[i];
    }

    for col in 0..4 {
        let pivot_row = (col..4).max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))?;
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        let tail: f32 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (m[i][4] - tail) / m[i][i];
    }
    Some(x)
}

fn bilinear(image: &RgbImage, sx: f32, sy: f32) -> Rgb<u8> {
    let (x0, y0) = (sx.floor() as i64, sy.floor() as i64);
    let (fx, fy) = (sx - x0 as f32, sy - y0 as f32);

    let sample = |x: i64, y: i64| -> [f32; 3] {
        if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
            let p = image.get_pixel(x as u32, y as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32]
        } else {
            [0.0; 3]
        }
    };

    let (tl, tr) = (sample(x0, y0), sample(x0 + 1, y0));
    let (bl, br) = (sample(x0, y0 + 1), sample(x0 + 1, y0 + 1));

    Rgb(std::array::from_fn(|c| {
        let v = tl[c] * (1.0 - fx) * (1.0 - fy)
            + tr[c] * fx * (1.0 - fy)
            + bl[c] * (1.0 - fx) * fy
            + br[c] * fx * fy;
        v.round().clamp(0.0, 255.0) as u8
    }))
}

/// Align a face to a canonical 112×112 crop using its five landmarks.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);

    RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |ox, oy| {
        match transform.invert_point(ox as f32, oy as f32) {
            Some((sx, sy)) => bilinear(image, sx, sy),
            None => Rgb([0, 0, 0]),
        }
    })
}

/// Resize a whole image to the aligned size when no landmarks are available.
pub fn fit_face(image: &RgbImage) -> RgbImage {
    imageops::resize(image, ALIGNED_SIZE, ALIGNED_SIZE, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let pts = REFERENCE_LANDMARKS_112;
        let t = Similarity::estimate(&pts, &pts);
        assert!((t.a - 1.0).abs() < 1e-4, "a = {}", t.a);
        assert!(t.b.abs() < 1e-4, "b = {}", t.b);
        assert!(t.tx.abs() < 1e-3, "tx = {}", t.tx);
        assert!(t.ty.abs() < 1e-3, "ty = {}", t.ty);
    }

    #[test]
    fn test_scaled_transform() {
        let src: [(f32, f32); 5] = std::array::from_fn(|i| {
            let (x, y) = REFERENCE_LANDMARKS_112[i];
            (x * 2.0, y * 2.0)
        });
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS_112);
        assert!((t.a - 0.5).abs() < 0.01, "a = {}, expected ~0.5", t.a);
    }

    #[test]
    fn test_solve_singular() {
        assert!(solve_4x4([[0.0; 4]; 4], [1.0; 4]).is_none());
    }

    #[test]
    fn test_align_face_output_size() {
        let image = RgbImage::from_pixel(640, 480, Rgb([128, 128, 128]));
        let aligned = align_face(&image, &REFERENCE_LANDMARKS_112);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        // Identity mapping inside a uniform image keeps the colour.
        assert_eq!(aligned.get_pixel(56, 56), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_landmark_lands_on_reference() {
        let mut image = RgbImage::new(200, 200);
        let src: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        for dy in 0..5 {
            for dx in 0..5 {
                image.put_pixel(78 + dx, 58 + dy, Rgb([255, 0, 0]));
            }
        }

        let aligned = align_face(&image, &src);
        let (rx, ry) = (
            REFERENCE_LANDMARKS_112[0].0.round() as u32,
            REFERENCE_LANDMARKS_112[0].1.round() as u32,
        );
        let brightest = (rx - 1..=rx + 1)
            .flat_map(|x| (ry - 1..=ry + 1).map(move |y| (x, y)))
            .map(|(x, y)| aligned.get_pixel(x, y)[0])
            .max()
            .unwrap_or(0);
        assert!(brightest > 100, "expected red patch near ({rx}, {ry}), max={brightest}");
    }

    #[test]
    fn test_fit_face_size() {
        let image = RgbImage::new(37, 53);
        assert_eq!(fit_face(&image).dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }
}
