//! Synthetic "no signal" frame.
//!
//! Rendered once at bootstrap and served on a topic's stream until the
//! first real frame arrives, and as the steady output of a topic whose bus
//! connection never came up.

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgb};

/// Default placeholder width in pixels.
pub const DEFAULT_WIDTH: u32 = 640;
/// Default placeholder height in pixels.
pub const DEFAULT_HEIGHT: u32 = 480;

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 28]);
const BAND: Rgb<u8> = Rgb([66, 66, 74]);

/// Render the placeholder frame and JPEG-encode it.
///
/// The image is a flat dark background with a lighter horizontal band
/// through the center, recognizably "disconnected" on any dashboard tile
/// without pulling in font rendering.
pub fn placeholder_jpeg(
    width: u32,
    height: u32,
) -> Result<Bytes, image::ImageError> {
    let width = width.max(1);
    let height = height.max(1);

    let band_top = height / 2 - height / 8;
    let band_bottom = height / 2 + height / 8;
    let frame = ImageBuffer::from_fn(width, height, |_, y| {
        if (band_top..band_bottom).contains(&y) {
            BAND
        } else {
            BACKGROUND
        }
    });

    let mut encoded = Vec::new();
    frame.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)?;
    Ok(Bytes::from(encoded))
}
