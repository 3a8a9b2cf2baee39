//! Core types for the pipeline system

use bytes::Bytes;
use std::time::Duration;

/// Timestamp representation for media frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    /// Microseconds since stream start
    pub micros: i64,
}

impl Timestamp {
    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from duration since stream start
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            micros: duration.as_micros() as i64,
        }
    }

    /// Convert to duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.micros)
    }
}

/// Pixel layout of a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba,
    Bgra,
    Nv12,
    Yuv420p,
    Yuv444p,
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Rgba => write!(f, "rgba"),
            PixelFormat::Bgra => write!(f, "bgra"),
            PixelFormat::Nv12 => write!(f, "nv12"),
            PixelFormat::Yuv420p => write!(f, "yuv420p"),
            PixelFormat::Yuv444p => write!(f, "yuv444p"),
        }
    }
}

/// Sample aspect ratio as a rational number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio { num: 1, den: 1 };

    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

/// Geometry and format of a video link or frame
///
/// Equality on this type drives both stage (re)construction inside a worker
/// and the lazy downstream geometry retag on retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub aspect_ratio: AspectRatio,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            aspect_ratio: AspectRatio::SQUARE,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }
}

impl std::fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} {} sar {}",
            self.width, self.height, self.format, self.aspect_ratio
        )
    }
}

/// One unit of decoded video content moving through the pipeline
///
/// Frames are single-owner values: every queue, slot and worker-local
/// variable holds at most one, and crossing a boundary is always a move.
/// Deliberately not `Clone`; `data` is already cheaply shareable where a
/// stage needs that.
pub struct VideoFrame {
    /// Raw pixel data
    pub data: Bytes,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Pixel layout of `data`
    pub format: PixelFormat,

    /// Sample aspect ratio
    pub aspect_ratio: AspectRatio,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Sequence ticket assigned at admission, `u64::MAX` before admission.
    /// Monotonic over the pipeline's lifetime; the reorder slot index is
    /// `ticket % capacity`.
    pub(crate) ticket: u64,
}

impl VideoFrame {
    /// Create a new frame that has not yet been admitted
    pub fn new(data: Bytes, geometry: FrameGeometry, pts: Timestamp) -> Self {
        Self {
            data,
            width: geometry.width,
            height: geometry.height,
            format: geometry.format,
            aspect_ratio: geometry.aspect_ratio,
            pts,
            ticket: u64::MAX,
        }
    }

    /// Geometry and format of this frame
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
            format: self.format,
            aspect_ratio: self.aspect_ratio,
        }
    }

    /// Get the size of the frame data in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("geometry", &format_args!("{}", self.geometry()))
            .field("pts", &self.pts)
            .field("ticket", &self.ticket)
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_equality_tracks_every_field() {
        let base = FrameGeometry::new(1280, 720, PixelFormat::Yuv420p);
        assert_eq!(base, FrameGeometry::new(1280, 720, PixelFormat::Yuv420p));
        assert_ne!(base, base.with_format(PixelFormat::Nv12));
        assert_ne!(base, base.with_aspect_ratio(AspectRatio::new(4, 3)));
        assert_ne!(base, FrameGeometry::new(1280, 721, PixelFormat::Yuv420p));
    }

    #[test]
    fn frame_reports_its_geometry() {
        let geometry =
            FrameGeometry::new(640, 480, PixelFormat::Rgba).with_aspect_ratio(AspectRatio::new(16, 11));
        let frame = VideoFrame::new(Bytes::from_static(b"pixels"), geometry, Timestamp::from_micros(40_000));

        assert_eq!(frame.geometry(), geometry);
        assert_eq!(frame.size(), 6);
        assert_eq!(frame.ticket, u64::MAX);
    }
}
