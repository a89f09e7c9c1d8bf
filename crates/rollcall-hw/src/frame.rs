//! Frame type and raw-buffer conversion — YUYV, GREY and MJPEG into RGB.

use image::{GrayImage, Rgb, RgbImage};

/// A captured colour camera frame.
#[derive(Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Driver sequence number; gaps mean dropped frames.
    pub sequence: u32,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("MJPEG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// BT.601 full-range YUV → RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let (y, u, v) = (y as f32, u as f32 - 128.0, v as f32 - 128.0);
    Rgb([
        clamp_u8(y + 1.402 * v),
        clamp_u8(y - 0.344_136 * u - 0.714_136 * v),
        clamp_u8(y + 1.772 * u),
    ])
}

/// Convert packed YUYV (4:2:2) to RGB.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected || width % 2 != 0 {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut image = RgbImage::new(width, height);
    for (i, chunk) in yuyv[..expected].chunks_exact(4).enumerate() {
        let [y0, u, y1, v] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let px = (i as u32 * 2) % width;
        let py = (i as u32 * 2) / width;
        image.put_pixel(px, py, yuv_to_rgb(y0, u, v));
        image.put_pixel(px + 1, py, yuv_to_rgb(y1, u, v));
    }
    Ok(image)
}

/// Expand 8-bit grayscale to RGB.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    let luma = GrayImage::from_raw(width, height, grey.get(..expected).map(<[u8]>::to_vec).unwrap_or_default())
        .ok_or(FrameError::InvalidLength {
            expected,
            actual: grey.len(),
        })?;
    Ok(image::DynamicImage::ImageLuma8(luma).to_rgb8())
}

/// Expand 16-bit little-endian grayscale to RGB, keeping the high byte.
pub fn y16_to_rgb(y16: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let pixels = (width * height) as usize;
    if y16.len() < pixels * 2 {
        return Err(FrameError::InvalidLength {
            expected: pixels * 2,
            actual: y16.len(),
        });
    }
    let high: Vec<u8> = y16[..pixels * 2].chunks_exact(2).map(|p| p[1]).collect();
    grey_to_rgb(&high, width, height)
}

/// Decode one MJPEG frame.
pub fn mjpeg_to_rgb(jpeg: &[u8]) -> Result<RgbImage, FrameError> {
    Ok(image::load_from_memory_with_format(jpeg, image::ImageFormat::Jpeg)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_grey() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_yuyv_red_chroma() {
        let rgb = yuyv_to_rgb(&[76, 85, 76, 255], 2, 1).unwrap();
        let p = rgb.get_pixel(0, 0);
        assert!(p[0] > 240 && p[1] < 20 && p[2] < 20, "got {p:?}");
    }

    #[test]
    fn test_yuyv_multiple_rows() {
        let yuyv: Vec<u8> = [10u8, 128, 20, 128].repeat(4);
        let rgb = yuyv_to_rgb(&yuyv, 4, 2).unwrap();
        assert_eq!(rgb.get_pixel(2, 1), &Rgb([10, 10, 10]));
        assert_eq!(rgb.get_pixel(3, 1), &Rgb([20, 20, 20]));
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_rgb(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = Frame { image: RgbImage::new(640, 480), sequence: 12 };
        assert_eq!((frame.width(), frame.height()), (640, 480));
    }

    #[test]
    fn test_grey_to_rgb() {
        let rgb = grey_to_rgb(&[0, 255], 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 255, 255]));
        assert!(grey_to_rgb(&[0], 2, 1).is_err());
    }

    #[test]
    fn test_y16_keeps_high_byte() {
        let rgb = y16_to_rgb(&[0xff, 0x80, 0x00, 0x10], 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0x80, 0x80, 0x80]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([0x10, 0x10, 0x10]));
    }

    #[test]
    fn test_mjpeg_roundtrip_dimensions() {
        let source = RgbImage::from_pixel(16, 8, Rgb([200, 100, 50]));
        let mut jpeg = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(mjpeg_to_rgb(&jpeg).unwrap().dimensions(), (16, 8));
    }
}
