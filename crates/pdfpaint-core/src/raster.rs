//! Renderer-agnostic raster buffers for decoded images.

/// Pixel payload of a decoded image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RasterData {
    /// 8-bit RGBA, row-major, `width * height * 4` bytes.
    Rgba(Vec<u8>),
    /// Baseline JPEG bytes passed through untouched for the presentation
    /// layer's own decoder.
    Jpeg(Vec<u8>),
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub data: RasterData,
}

impl RasterBuffer {
    /// Build an RGBA buffer, checking the byte count against the dimensions.
    pub fn rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            data: RasterData::Rgba(pixels),
        })
    }

    pub fn jpeg(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: RasterData::Jpeg(bytes),
        }
    }

    /// MIME type of the payload.
    pub fn mime_type(&self) -> &'static str {
        match self.data {
            RasterData::Rgba(_) => "image/x-raw-rgba",
            RasterData::Jpeg(_) => "image/jpeg",
        }
    }

    pub fn byte_len(&self) -> usize {
        match &self.data {
            RasterData::Rgba(bytes) | RasterData::Jpeg(bytes) => bytes.len(),
        }
    }
}

/// Expand samples with `channels` components per pixel to opaque RGBA.
///
/// Supports 1 (gray), 3 (RGB) and 4 (already RGBA) channels. Returns
/// `None` when `samples` is shorter than `pixel_count * channels`.
pub fn expand_to_rgba(samples: &[u8], channels: usize, pixel_count: usize) -> Option<Vec<u8>> {
    let needed = pixel_count.checked_mul(channels)?;
    if samples.len() < needed {
        return None;
    }
    let samples = &samples[..needed];
    let mut out = Vec::with_capacity(pixel_count * 4);
    match channels {
        1 => {
            for &g in samples {
                out.extend_from_slice(&[g, g, g, 255]);
            }
        }
        3 => {
            for px in samples.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        4 => out.extend_from_slice(samples),
        _ => return None,
    }
    Some(out)
}
