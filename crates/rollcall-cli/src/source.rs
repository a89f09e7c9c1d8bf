//! Camera stream as a capture-loop frame source.

use image::RgbImage;
use rollcall_core::FrameSource;
use rollcall_hw::FrameStream;

pub struct CameraSource<'a> {
    stream: FrameStream<'a>,
}

impl<'a> CameraSource<'a> {
    pub fn new(stream: FrameStream<'a>) -> Self {
        Self { stream }
    }
}

impl FrameSource for CameraSource<'_> {
    /// A failed dequeue ends the stream; corrupt buffers are skipped upstream.
    fn next_frame(&mut self) -> Option<RgbImage> {
        match self.stream.next_frame() {
            Ok(frame) => {
                tracing::trace!(seq = frame.sequence, "frame");
                Some(frame.image)
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera read failed; ending stream");
                None
            }
        }
    }
}
