//! Frame overlay: status-coloured boxes and labels.

use crate::session::{FrameReport, MatchStatus};
use crate::types::FaceRegion;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

pub const MARKED_COLOR: Rgb<u8> = Rgb([255, 200, 0]);
pub const ALREADY_MARKED_COLOR: Rgb<u8> = Rgb([255, 80, 100]);
pub const WARNING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

pub const UNKNOWN_LABEL: &str = "Unknown or spoof!";
pub const NO_FACE_LABEL: &str = "No face detected";

const BOX_THICKNESS: i32 = 2;
const LABEL_OFFSET: i32 = 10;
const LABEL_SCALE: f32 = 24.0;
const ADVISORY_SCALE: f32 = 27.0;
const ADVISORY_POSITION: (i32, i32) = (30, 30);

/// DejaVu Sans, so labels render without any system fonts installed.
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Text and colour shown for a face status.
pub fn label_for(status: &MatchStatus) -> (String, Rgb<u8>) {
    match status {
        MatchStatus::Marked(name) => (format!("Attendance: {name}"), MARKED_COLOR),
        MatchStatus::AlreadyMarked(name) => (format!("Already Marked: {name}"), ALREADY_MARKED_COLOR),
        MatchStatus::NoMatch | MatchStatus::Spoof(_) => (UNKNOWN_LABEL.to_string(), WARNING_COLOR),
    }
}

/// Draws frame reports. Without a font only boxes are drawn.
#[derive(Clone)]
pub struct Renderer {
    font: Option<FontArc>,
}

impl Default for Renderer {
    /// Labels in the bundled font.
    fn default() -> Self {
        let font = FontArc::try_from_slice(EMBEDDED_FONT)
            .map_err(|e| tracing::warn!(error = %e, "bundled overlay font unreadable; drawing boxes only"))
            .ok();
        Self { font }
    }
}

impl Renderer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Label with a TrueType/OpenType font instead of the bundled one.
    pub fn with_font_bytes(bytes: Vec<u8>) -> Result<Self, ab_glyph::InvalidFont> {
        Ok(Self::new(Some(FontArc::try_from_vec(bytes)?)))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw(&self, frame: &mut RgbImage, report: &FrameReport) {
        match report {
            FrameReport::NoFace => {
                let (x, y) = ADVISORY_POSITION;
                self.text(frame, NO_FACE_LABEL, WARNING_COLOR, x, y, ADVISORY_SCALE);
            }
            FrameReport::Faces(outcomes) => {
                for outcome in outcomes {
                    let (label, color) = label_for(&outcome.status);
                    draw_box(frame, &outcome.region, color);
                    let (x, y) = (outcome.region.x, outcome.region.y - LABEL_OFFSET);
                    self.text(frame, &label, color, x, y, LABEL_SCALE);
                }
            }
        }
    }

    /// `y` is the text baseline, like the bottom-left origin of most overlays.
    fn text(&self, frame: &mut RgbImage, text: &str, color: Rgb<u8>, x: i32, y: i32, size: f32) {
        match &self.font {
            Some(font) => {
                let top = y - size as i32;
                draw_text_mut(frame, color, x, top, PxScale::from(size), font, text);
            }
            None => tracing::debug!(label = text, x, y, "overlay label"),
        }
    }
}

fn draw_box(frame: &mut RgbImage, region: &FaceRegion, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let width = region.width as i32 - 2 * inset;
        let height = region.height as i32 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(region.x + inset, region.y + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FaceOutcome;

    fn report(status: MatchStatus) -> FrameReport {
        FrameReport::Faces(vec![FaceOutcome {
            region: FaceRegion::new(20, 30, 40, 50),
            status,
        }])
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            label_for(&MatchStatus::Marked("alice".into())),
            ("Attendance: alice".to_string(), MARKED_COLOR)
        );
        assert_eq!(
            label_for(&MatchStatus::AlreadyMarked("alice".into())),
            ("Already Marked: alice".to_string(), ALREADY_MARKED_COLOR)
        );
        assert_eq!(label_for(&MatchStatus::NoMatch), (UNKNOWN_LABEL.to_string(), WARNING_COLOR));
        assert_eq!(
            label_for(&MatchStatus::Spoof("alice".into())),
            (UNKNOWN_LABEL.to_string(), WARNING_COLOR)
        );
    }

    #[test]
    fn test_box_drawn_two_pixels_thick() {
        let mut frame = RgbImage::new(100, 100);
        Renderer::default().draw(&mut frame, &report(MatchStatus::Marked("alice".into())));

        assert_eq!(frame.get_pixel(20, 30), &MARKED_COLOR);
        assert_eq!(frame.get_pixel(21, 31), &MARKED_COLOR);
        assert_eq!(frame.get_pixel(59, 79), &MARKED_COLOR);
        // Interior untouched.
        assert_eq!(frame.get_pixel(40, 55), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_unknown_uses_warning_colour() {
        let mut frame = RgbImage::new(100, 100);
        Renderer::default().draw(&mut frame, &report(MatchStatus::NoMatch));
        assert_eq!(frame.get_pixel(20, 30), &WARNING_COLOR);
    }

    #[test]
    fn test_box_partly_outside_frame() {
        let mut frame = RgbImage::new(50, 50);
        let report = FrameReport::Faces(vec![FaceOutcome {
            region: FaceRegion::new(-10, -10, 30, 30),
            status: MatchStatus::NoMatch,
        }]);
        Renderer::default().draw(&mut frame, &report);
        assert_eq!(frame.get_pixel(19, 5), &WARNING_COLOR);
    }

    #[test]
    fn test_bundled_font_loads() {
        assert!(Renderer::default().has_font());
    }

    #[test]
    fn test_no_face_advisory_drawn() {
        let mut frame = RgbImage::new(320, 80);
        Renderer::default().draw(&mut frame, &FrameReport::NoFace);

        let black = Rgb([0, 0, 0]);
        let inked = frame.enumerate_pixels().filter(|(x, y, p)| *x >= 30 && *y < 40 && **p != black).count();
        assert!(inked > 50, "only {inked} advisory pixels");
        assert!(frame.enumerate_pixels().all(|(x, y, p)| (x >= 30 && y < 40) || *p == black));
    }

    #[test]
    fn test_face_label_drawn_above_box() {
        let mut frame = RgbImage::new(200, 120);
        let report = FrameReport::Faces(vec![FaceOutcome {
            region: FaceRegion::new(20, 60, 40, 40),
            status: MatchStatus::Marked("alice".into()),
        }]);
        Renderer::default().draw(&mut frame, &report);

        let black = Rgb([0, 0, 0]);
        assert!(frame.enumerate_pixels().any(|(_, y, p)| y < 60 && *p != black));
    }

    #[test]
    fn test_without_font_draws_boxes_only() {
        let mut frame = RgbImage::new(200, 120);
        let report = FrameReport::Faces(vec![FaceOutcome {
            region: FaceRegion::new(20, 60, 40, 40),
            status: MatchStatus::Marked("alice".into()),
        }]);
        Renderer::new(None).draw(&mut frame, &report);

        let black = Rgb([0, 0, 0]);
        assert!(frame.enumerate_pixels().all(|(_, y, p)| y >= 60 || *p == black));
        assert_eq!(frame.get_pixel(20, 60), &MARKED_COLOR);

        let mut empty = RgbImage::new(64, 64);
        Renderer::new(None).draw(&mut empty, &FrameReport::NoFace);
        assert!(empty.pixels().all(|p| p == &black));
    }
}
