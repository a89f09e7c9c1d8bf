//! Frame sinks: a minifb window, or nothing for headless runs.

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use rollcall_core::{CaptureError, FrameSink};

pub const WINDOW_TITLE: &str = "Smart Attendance System";

/// Native window showing annotated frames. Closed when dropped.
pub struct WindowSink {
    window: Window,
    buffer: Vec<u32>,
}

impl WindowSink {
    pub fn open(width: u32, height: u32) -> Result<Self, CaptureError> {
        let window = Window::new(WINDOW_TITLE, width as usize, height as usize, WindowOptions::default())
            .map_err(|e| CaptureError::Display(format!("failed to open window: {e}")))?;
        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }
}

impl FrameSink for WindowSink {
    fn present(&mut self, frame: &RgbImage) -> Result<(), CaptureError> {
        pack_rgb(frame, &mut self.buffer);
        self.window
            .update_with_buffer(&self.buffer, frame.width() as usize, frame.height() as usize)
            .map_err(|e| CaptureError::Display(e.to_string()))
    }

    fn quit_requested(&mut self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}

/// Either a window or headless.
pub enum Sink {
    Window(WindowSink),
    Headless,
}

impl FrameSink for Sink {
    fn present(&mut self, frame: &RgbImage) -> Result<(), CaptureError> {
        match self {
            Sink::Window(window) => window.present(frame),
            Sink::Headless => Ok(()),
        }
    }

    fn quit_requested(&mut self) -> bool {
        match self {
            Sink::Window(window) => window.quit_requested(),
            Sink::Headless => false,
        }
    }
}

/// Pack RGB pixels into minifb's 0RGB u32 layout.
fn pack_rgb(frame: &RgbImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        frame
            .pixels()
            .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
    );
}
