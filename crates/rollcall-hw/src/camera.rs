//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;
/// Corrupt buffers tolerated in a row before a read is treated as failed.
const MAX_CORRUPT_FRAMES: u32 = 30;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Motion-JPEG, one JPEG per buffer.
    Mjpeg,
    /// 8-bit grayscale.
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"GREY" => Some(Self::Grey),
            b"Y16 " | b"Y16\0" => Some(Self::Y16),
            _ => None,
        }
    }
}

/// Device path for a camera index, e.g. `0` → `/dev/video0`.
pub fn device_path(index: u32) -> String {
    format!("/dev/video{index}")
}

/// V4L2 camera device handle. The device is closed when dropped.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV at VGA; drivers may answer with MJPG or a grey format instead.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let pixel_format = PixelFormat::from_fourcc(negotiated.fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {:?} (need YUYV, MJPG, GREY, or Y16)",
                negotiated.fourcc
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?negotiated.fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            fourcc: negotiated.fourcc,
            pixel_format,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Start streaming. Buffers are unmapped when the stream is dropped.
    pub fn stream(&self) -> Result<FrameStream<'_>, CameraError> {
        let stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;
        Ok(FrameStream { camera: self, stream })
    }

    /// Convert a raw buffer to RGB based on the negotiated format.
    fn buf_to_rgb(&self, buf: &[u8]) -> Result<RgbImage, CameraError> {
        let converted = match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height),
            PixelFormat::Mjpeg => frame::mjpeg_to_rgb(buf),
            PixelFormat::Grey => frame::grey_to_rgb(buf, self.width, self.height),
            PixelFormat::Y16 => frame::y16_to_rgb(buf, self.width, self.height),
        };
        converted.map_err(|e| CameraError::CaptureFailed(format!("{:?} conversion failed: {e}", self.pixel_format)))
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = device_path(i);
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

/// Active capture stream on a [`Camera`].
pub struct FrameStream<'a> {
    camera: &'a Camera,
    stream: MmapStream<'a>,
}

impl FrameStream<'_> {
    /// Block until the next frame is available and convert it to RGB.
    ///
    /// Buffers that fail to convert (a truncated MJPEG, say) are skipped.
    /// Only a failed dequeue or a long run of corrupt buffers is an error.
    pub fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let camera = self.camera;
        let stream = &mut self.stream;
        skip_corrupt(|| {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
            let sequence = meta.sequence;
            Ok(camera.buf_to_rgb(buf).map(|image| Frame { image, sequence }))
        })
    }

    /// Discard `count` frames while auto-exposure settles.
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            if let Err(e) = self.stream.next() {
                tracing::debug!(error = %e, "warmup frame failed");
            }
        }
    }
}

/// Pull until a buffer converts. The outer error (dequeue) is returned at
/// once; inner (conversion) errors are skipped up to [`MAX_CORRUPT_FRAMES`] in a row.
fn skip_corrupt<T>(mut pull: impl FnMut() -> Result<Result<T, CameraError>, CameraError>) -> Result<T, CameraError> {
    let mut corrupt = 0;
    loop {
        match pull()? {
            Ok(frame) => return Ok(frame),
            Err(e) if corrupt < MAX_CORRUPT_FRAMES => {
                corrupt += 1;
                tracing::warn!(error = %e, corrupt, "skipping corrupt frame");
            }
            Err(e) => return Err(e),
        }
    }
}
