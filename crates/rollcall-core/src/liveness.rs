//! Size-based liveness gate.
//!
//! A face that is too small in the frame is treated as distant or spoofed
//! (a photo held up to the camera). Only the box size is considered.

use crate::types::FaceRegion;

pub const DEFAULT_MIN_AREA: u64 = 8000;
pub const DEFAULT_MIN_SIDE: u32 = 80;

/// Accepts a face when `width * height > min_area` and both sides of the
/// visible crop exceed `min_side`. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessGate {
    pub min_area: u64,
    pub min_side: u32,
}

impl Default for LivenessGate {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            min_side: DEFAULT_MIN_SIDE,
        }
    }
}

impl LivenessGate {
    /// `crop` is the `(width, height)` of the face after clipping to the frame.
    pub fn is_live(&self, region: &FaceRegion, crop: (u32, u32)) -> bool {
        let (crop_w, crop_h) = crop;
        region.area() > self.min_area && crop_h > self.min_side && crop_w > self.min_side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(w: u32, h: u32) -> bool {
        LivenessGate::default().is_live(&FaceRegion::new(0, 0, w, h), (w, h))
    }

    #[test]
    fn test_area_at_threshold_rejected() {
        // 80 * 100 = 8000, not > 8000
        assert!(!check(80, 100));
    }

    #[test]
    fn test_just_above_threshold_accepted() {
        assert!(check(81, 100));
    }

    #[test]
    fn test_narrow_face_rejected_despite_area() {
        assert!(!check(80, 200));
        assert!(!check(200, 80));
    }

    #[test]
    fn test_clipped_crop_rejected() {
        // Nominal 120x120 box, but only 60 px visible at the frame edge.
        let region = FaceRegion::new(-60, 0, 120, 120);
        assert!(!LivenessGate::default().is_live(&region, (60, 120)));
    }

    #[test]
    fn test_custom_thresholds() {
        let gate = LivenessGate { min_area: 100, min_side: 5 };
        assert!(gate.is_live(&FaceRegion::new(0, 0, 11, 10), (11, 10)));
        assert!(!gate.is_live(&FaceRegion::new(0, 0, 10, 10), (10, 10)));
    }
}
