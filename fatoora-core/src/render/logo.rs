use image::{io::Reader as ImageReader, ImageError, RgbaImage};
use std::path::Path;

/// Largest logo edge kept after decoding, in pixels.
const MAX_EDGE_PX: u32 = 256;

/// Decoded logo as 8-bit RGB rows, alpha flattened onto white.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl LogoImage {
    /// Decodes a PNG or JPEG file and downsizes it to at most
    /// [`MAX_EDGE_PX`] on its longest edge.
    pub fn load(path: &Path) -> Result<Self, ImageError> {
        let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let rgba = if decoded.width() > MAX_EDGE_PX || decoded.height() > MAX_EDGE_PX {
            decoded.thumbnail(MAX_EDGE_PX, MAX_EDGE_PX).to_rgba8()
        } else {
            decoded.to_rgba8()
        };
        Ok(Self::flatten(&rgba))
    }

    fn flatten(rgba: &RgbaImage) -> Self {
        let mut rgb = Vec::with_capacity((rgba.width() * rgba.height() * 3) as usize);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u16::from(a);
            for channel in [r, g, b] {
                let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
                rgb.push(blended as u8);
            }
        }
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgb,
        }
    }

    /// Size of the image scaled to fit a `box_size` square, keeping the
    /// aspect ratio.
    pub fn fit(&self, box_size: f32) -> (f32, f32) {
        let (w, h) = (self.width.max(1) as f32, self.height.max(1) as f32);
        let scale = box_size / w.max(h);
        (w * scale, h * scale)
    }
}
