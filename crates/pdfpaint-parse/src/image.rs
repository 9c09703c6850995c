//! Image XObject and inline image decoding.
//!
//! Supported: `DCTDecode` JPEG (passed through, or decoded to RGBA with the
//! `jpeg-decoding` feature), and unfiltered or `FlateDecode` 8-bit
//! DeviceGray / DeviceRGB samples expanded to opaque RGBA. Everything else
//! is reported as [`ImageError::Unsupported`] and the caller skips the image.

use pdfpaint_core::{RasterBuffer, RenderOptions, expand_to_rgba};
use tracing::trace;

use crate::decode::inflate;
use crate::dictionary::{Dictionary, PdfObject};
use crate::error::ImageError;
use crate::store::filter_names;

/// Image dictionary keys with their inline-image abbreviations.
const WIDTH: &[&str] = &["Width", "W"];
const HEIGHT: &[&str] = &["Height", "H"];
const BITS: &[&str] = &["BitsPerComponent", "BPC"];
const COLOR_SPACE: &[&str] = &["ColorSpace", "CS"];
const FILTER: &[&str] = &["Filter", "F"];
const DECODE_PARMS: &[&str] = &["DecodeParms", "DP"];
const IMAGE_MASK: &[&str] = &["ImageMask", "IM"];

/// Decode an image from its dictionary and filter-encoded data.
///
/// # Errors
///
/// Returns an [`ImageError`] describing why the image cannot be shown.
pub fn decode_image(
    dict: &Dictionary,
    data: &[u8],
    options: &RenderOptions,
) -> Result<RasterBuffer, ImageError> {
    let width = dimension(dict, WIDTH)?;
    let height = dimension(dict, HEIGHT)?;
    let pixels = u64::from(width) * u64::from(height);
    if pixels > options.max_image_pixels {
        return Err(ImageError::TooLarge {
            pixels,
            limit: options.max_image_pixels,
        });
    }
    if dict
        .get_any(IMAGE_MASK)
        .and_then(PdfObject::as_bool)
        .unwrap_or(false)
    {
        return Err(ImageError::Unsupported("stencil mask".to_string()));
    }

    let filters = filter_names(dict.get_any(FILTER));
    if let Some(predictor) = dict
        .get_any(DECODE_PARMS)
        .and_then(first_parms)
        .and_then(|p| p.get_i64("Predictor"))
        .filter(|&p| p > 1)
    {
        return Err(ImageError::Unsupported(format!("predictor {predictor}")));
    }

    match filters.as_slice() {
        ["DCTDecode"] => decode_dct(width, height, data, options),
        [] => decode_samples(dict, width, height, data),
        ["FlateDecode"] => {
            let inflated = inflate(data).map_err(ImageError::Corrupt)?;
            decode_samples(dict, width, height, &inflated)
        }
        [other] => Err(ImageError::Unsupported(format!("filter {other}"))),
        chain => Err(ImageError::Unsupported(format!("filter chain {chain:?}"))),
    }
}

fn dimension(dict: &Dictionary, keys: &[&str]) -> Result<u32, ImageError> {
    let value = dict
        .get_any(keys)
        .and_then(PdfObject::as_i64)
        .ok_or_else(|| ImageError::Malformed(format!("missing /{}", keys[0])))?;
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ImageError::Malformed(format!("/{} is {value}", keys[0]))),
    }
}

/// `/DecodeParms` may be a dictionary or an array matching a filter array.
fn first_parms(value: &PdfObject) -> Option<&Dictionary> {
    match value {
        PdfObject::Dictionary(d) => Some(d),
        PdfObject::Array(items) => items.first().and_then(PdfObject::as_dict),
        _ => None,
    }
}

/// Components per pixel for the supported color spaces.
fn components(dict: &Dictionary) -> Result<usize, ImageError> {
    match dict.get_any(COLOR_SPACE) {
        Some(PdfObject::Name(name)) => match name.as_str() {
            "DeviceGray" | "G" => Ok(1),
            "DeviceRGB" | "RGB" => Ok(3),
            other => Err(ImageError::Unsupported(format!("color space {other}"))),
        },
        Some(PdfObject::Array(items)) => {
            let family = items.first().and_then(PdfObject::as_name).unwrap_or("array");
            Err(ImageError::Unsupported(format!("color space {family}")))
        }
        Some(_) | None => Err(ImageError::Malformed("missing /ColorSpace".to_string())),
    }
}

fn decode_samples(
    dict: &Dictionary,
    width: u32,
    height: u32,
    samples: &[u8],
) -> Result<RasterBuffer, ImageError> {
    let bits = dict.get_any(BITS).and_then(PdfObject::as_i64).unwrap_or(8);
    if bits != 8 {
        return Err(ImageError::Unsupported(format!("{bits} bits per component")));
    }
    let channels = components(dict)?;
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| ImageError::Malformed("dimensions overflow".to_string()))?;
    let needed = pixel_count * channels;
    if samples.len() < needed {
        return Err(ImageError::Corrupt(format!(
            "{} sample bytes for {width}x{height}x{channels}",
            samples.len()
        )));
    }
    let rgba = expand_to_rgba(&samples[..needed], channels, pixel_count)
        .ok_or_else(|| ImageError::Unsupported(format!("{channels} channels")))?;
    trace!(width, height, channels, "decoded raw image samples");
    RasterBuffer::rgba(width, height, rgba)
        .ok_or_else(|| ImageError::Corrupt("pixel buffer size mismatch".to_string()))
}

/// Check JPEG start and end markers. Trailing whitespace after EOI is
/// tolerated.
fn has_jpeg_markers(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0))
        .map_or(0, |i| i + 1);
    data.starts_with(&[0xFF, 0xD8]) && data[..end].ends_with(&[0xFF, 0xD9])
}

fn decode_dct(
    width: u32,
    height: u32,
    data: &[u8],
    options: &RenderOptions,
) -> Result<RasterBuffer, ImageError> {
    if !has_jpeg_markers(data) {
        return Err(ImageError::Corrupt("missing JPEG SOI/EOI markers".to_string()));
    }
    #[cfg(feature = "jpeg-decoding")]
    if options.decode_jpeg {
        return decode_jpeg_rgba(data);
    }
    #[cfg(not(feature = "jpeg-decoding"))]
    let _ = options;
    Ok(RasterBuffer::jpeg(width, height, data.to_vec()))
}

#[cfg(feature = "jpeg-decoding")]
fn decode_jpeg_rgba(data: &[u8]) -> Result<RasterBuffer, ImageError> {
    use std::io::Cursor;
    use zune_jpeg::JpegDecoder;
    use zune_jpeg::zune_core::options::DecoderOptions;

    let options = DecoderOptions::default()
        .set_max_width(u16::MAX as usize)
        .set_max_height(u16::MAX as usize);
    let mut decoder = JpegDecoder::new_with_options(Cursor::new(data), options);
    decoder
        .decode_headers()
        .map_err(|e| ImageError::Corrupt(format!("JPEG header: {e:?}")))?;
    let info = decoder
        .info()
        .ok_or_else(|| ImageError::Corrupt("JPEG has no frame header".to_string()))?;
    let (width, height) = (info.width as u32, info.height as u32);
    if width == 0 || height == 0 {
        return Err(ImageError::Corrupt("JPEG frame has no pixels".to_string()));
    }
    let pixels = decoder
        .decode()
        .map_err(|e| ImageError::Corrupt(format!("JPEG data: {e:?}")))?;
    let pixel_count = width as usize * height as usize;
    let channels = pixels.len().checked_div(pixel_count).unwrap_or(0);
    let rgba = expand_to_rgba(&pixels, channels, pixel_count)
        .ok_or_else(|| ImageError::Unsupported(format!("JPEG with {channels} channels")))?;
    RasterBuffer::rgba(width, height, rgba)
        .ok_or_else(|| ImageError::Corrupt("JPEG pixel buffer size mismatch".to_string()))
}
