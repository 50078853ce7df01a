//! Image-frame subscription
//!
//! Frames arrive as the robot sends them; the subscription throttles them to
//! the requested rate and optionally decodes them before delivery. Decoding
//! itself is left to the `image` crate.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::warn;

use crate::config::{MAX_FPS, MIN_FPS};
use crate::error::{SessionError, SessionResult};
use crate::session::events::ImageData;

/// Parameters of an image-frame subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSubscription {
    decode: bool,
    fps: u32,
}

impl ImageSubscription {
    /// Creates a subscription
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `fps` is outside 1..=30
    pub fn new(decode: bool, fps: i64) -> SessionResult<Self> {
        let fps = u32::try_from(fps)
            .ok()
            .filter(|fps| (MIN_FPS..=MAX_FPS).contains(fps))
            .ok_or_else(|| {
                SessionError::InvalidArgument(format!(
                    "requested FPS must be within [{}, {}], got {}",
                    MIN_FPS, MAX_FPS, fps
                ))
            })?;

        Ok(Self { decode, fps })
    }

    /// Returns true if frames are decoded before delivery
    pub fn decode(&self) -> bool {
        self.decode
    }

    /// Returns the requested frame rate
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Shortest gap between two delivered frames
    pub fn min_frame_gap(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

/// Delivery state of an active subscription
#[derive(Debug, Clone)]
pub(crate) struct ImageStream {
    subscription: ImageSubscription,
    last_delivered: Option<Instant>,
    delivered: u64,
}

impl ImageStream {
    pub(crate) fn new(subscription: ImageSubscription) -> Self {
        Self {
            subscription,
            last_delivered: None,
            delivered: 0,
        }
    }

    pub(crate) fn subscription(&self) -> ImageSubscription {
        self.subscription
    }

    /// Admits a frame arriving at `now`, returning its sequence number, or
    /// None if it comes too soon after the previous delivery
    pub(crate) fn admit(&mut self, now: Instant) -> Option<u64> {
        if let Some(last) = self.last_delivered {
            if now.duration_since(last) < self.subscription.min_frame_gap() {
                return None;
            }
        }

        self.last_delivered = Some(now);
        self.delivered += 1;
        Some(self.delivered)
    }
}

/// Prepares frame bytes for delivery, decoding them if requested
///
/// Returns None if decoding was requested and failed.
pub(crate) fn prepare_frame(data: Bytes, decode: bool) -> Option<ImageData> {
    if !decode {
        return Some(ImageData::Encoded(data));
    }

    match image::load_from_memory(&data) {
        Ok(decoded) => Some(ImageData::Decoded(decoded.to_rgb8())),
        Err(e) => {
            warn!("Dropping undecodable image frame ({} bytes): {}", data.len(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    #[test]
    fn test_fps_bounds() {
        assert!(ImageSubscription::new(true, 1).is_ok());
        assert!(ImageSubscription::new(true, 30).is_ok());
        assert!(matches!(
            ImageSubscription::new(true, 0),
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(ImageSubscription::new(false, 31).is_err());
        assert!(ImageSubscription::new(false, -5).is_err());
    }

    #[test]
    fn test_throttling() {
        let mut stream = ImageStream::new(ImageSubscription::new(false, 10).unwrap());
        let start = Instant::now();

        assert_eq!(stream.admit(start), Some(1));
        assert_eq!(stream.admit(start + Duration::from_millis(50)), None);
        assert_eq!(stream.admit(start + Duration::from_millis(100)), Some(2));
        assert_eq!(stream.admit(start + Duration::from_millis(150)), None);
    }

    #[test]
    fn test_prepare_encoded() {
        let data = Bytes::from_static(b"not an image");
        assert_eq!(
            prepare_frame(data.clone(), false),
            Some(ImageData::Encoded(data))
        );
    }

    #[test]
    fn test_prepare_decoded() {
        match prepare_frame(png_bytes(4, 3), true) {
            Some(ImageData::Decoded(img)) => {
                assert_eq!(img.dimensions(), (4, 3));
                assert_eq!(img.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
            }
            other => panic!("expected decoded frame, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_undecodable() {
        assert_eq!(prepare_frame(Bytes::from_static(b"garbage"), true), None);
    }
}
