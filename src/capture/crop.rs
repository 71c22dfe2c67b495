use crate::dom::BoundingBox;
use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};

/// Largest side length a JPEG frame header can carry
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Crop region in device pixels
///
/// The origin may be negative or past the screenshot edge; only the size is
/// guaranteed non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Scale a viewport box to device pixels, rounding each coordinate
    pub fn from_box(bbox: &BoundingBox, scale_factor: f64) -> Self {
        Self {
            x: to_pixel(bbox.x * scale_factor),
            y: to_pixel(bbox.y * scale_factor),
            width: to_size(bbox.width * scale_factor),
            height: to_size(bbox.height * scale_factor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether a JPEG of this size can be encoded
    pub fn fits_jpeg(&self) -> bool {
        self.width <= MAX_JPEG_DIMENSION && self.height <= MAX_JPEG_DIMENSION
    }

    /// The part of this rectangle inside a `width` x `height` image
    pub fn clip_to(&self, width: u32, height: u32) -> CropRect {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width as i64).min(width as i64);
        let y1 = self.y.saturating_add(self.height as i64).min(height as i64);
        CropRect {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0) as u32,
            height: (y1 - y0).max(0) as u32,
        }
    }
}

fn to_pixel(value: f64) -> i64 {
    if value.is_finite() { value.round() as i64 } else { 0 }
}

fn to_size(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Cut `rect` out of an encoded screenshot and re-encode it as JPEG
///
/// The output has exactly `rect`'s size. Parts of the rectangle that fall
/// outside the screenshot stay black. A rectangle with a side longer than
/// [`MAX_JPEG_DIMENSION`] is clipped to the screenshot instead. An empty
/// rectangle, or an oversized one that misses the screenshot, yields an empty
/// buffer.
pub fn crop_to_jpeg(screenshot: &[u8], rect: CropRect, quality: u8) -> Result<Vec<u8>> {
    if rect.is_empty() {
        return Ok(Vec::new());
    }

    let shot = image::load_from_memory(screenshot)?.to_rgb8();

    let rect = if rect.fits_jpeg() {
        rect
    } else {
        let clipped = rect.clip_to(shot.width(), shot.height());
        log::debug!(
            "Crop {}x{} exceeds JPEG limits, clipped to {}x{}",
            rect.width,
            rect.height,
            clipped.width,
            clipped.height
        );
        clipped
    };
    if rect.is_empty() {
        return Ok(Vec::new());
    }

    let mut canvas = RgbImage::new(rect.width, rect.height);
    // Placing the screenshot at the negated origin copies exactly the overlap
    image::imageops::replace(&mut canvas, &shot, -rect.x, -rect.y);

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(canvas.as_raw(), rect.width, rect.height, ColorType::Rgb8)?;
    Ok(buf)
}
