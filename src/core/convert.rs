//! WebP re-encoding shared by the upload adapter and the bulk migration.
//!
//! Conversion is best-effort: anything that cannot be decoded or encoded
//! yields a [`SkipReason`] and the caller keeps the original bytes.

use crate::core::paths;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;

/// Lossy quality for every conversion.
pub const WEBP_QUALITY: f32 = 80.0;
/// libwebp default effort, used for opaque images.
pub const RGB_METHOD: i32 = 4;
/// Highest libwebp effort, used when the image carries alpha.
pub const RGBA_METHOD: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputMode {
    Rgb,
    Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncodeSettings {
    pub quality: f32,
    pub method: i32,
}

impl EncodeSettings {
    pub fn for_mode(mode: OutputMode) -> Self {
        let method = match mode {
            OutputMode::Rgb => RGB_METHOD,
            OutputMode::Rgba => RGBA_METHOD,
        };
        Self {
            quality: WEBP_QUALITY,
            method,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub mode: OutputMode,
    pub settings: EncodeSettings,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Key does not end in a convertible extension.
    NotConvertible,
    /// The payload could not be decoded as an image.
    Undecodable(String),
    /// Built without the `webp` feature.
    EncoderUnavailable,
    EncodeFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotConvertible => write!(f, "extension is not convertible"),
            SkipReason::Undecodable(e) => write!(f, "payload is not a decodable image: {}", e),
            SkipReason::EncoderUnavailable => write!(f, "WebP encoder not available in this build"),
            SkipReason::EncodeFailed(e) => write!(f, "WebP encoding failed: {}", e),
        }
    }
}

/// Outcome of running an upload through the converter.
#[derive(Debug, Clone)]
pub enum Conversion {
    Converted { key: String, image: ConvertedImage },
    Passthrough { reason: SkipReason },
}

/// Whether `bytes` is a PNG stored with an indexed (palette) colour type.
///
/// The decoder expands palettes to RGB or RGBA, so this has to be read from
/// the header before decoding.
pub fn is_palette_png(bytes: &[u8]) -> bool {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return false;
    }
    png::Decoder::new(Cursor::new(bytes))
        .read_info()
        .map(|reader| reader.info().color_type == png::ColorType::Indexed)
        .unwrap_or(false)
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Target mode for a decoded image. Palette sources always keep alpha,
/// as do alpha-carrying layouts (grey+alpha, RGBA at any depth); everything
/// else is flattened to RGB.
pub fn normalized_mode(image: &DynamicImage, palette: bool) -> OutputMode {
    if palette || image.color().has_alpha() {
        OutputMode::Rgba
    } else {
        OutputMode::Rgb
    }
}

/// Coerces the image into 8-bit RGB or RGBA.
pub fn normalize(image: DynamicImage, palette: bool) -> (DynamicImage, OutputMode) {
    let mode = normalized_mode(&image, palette);
    let normalized = match (mode, image) {
        (OutputMode::Rgb, img @ DynamicImage::ImageRgb8(_)) => img,
        (OutputMode::Rgba, img @ DynamicImage::ImageRgba8(_)) => img,
        (OutputMode::Rgb, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (OutputMode::Rgba, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
    };
    (normalized, mode)
}

/// Decodes `bytes`, normalises the colour mode and re-encodes as WebP.
pub fn convert_image(bytes: &[u8]) -> Result<ConvertedImage, SkipReason> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| SkipReason::Undecodable(e.to_string()))?;
    let (normalized, mode) = normalize(decoded, is_palette_png(bytes));
    let settings = EncodeSettings::for_mode(mode);
    let (width, height) = normalized.dimensions();

    let bytes = encode_webp(&normalized, mode, settings)?;

    Ok(ConvertedImage {
        bytes,
        mode,
        settings,
        width,
        height,
    })
}

/// Key-aware entry point used at upload and migration time.
pub fn convert_upload(key: &str, bytes: &[u8]) -> Conversion {
    if !paths::is_convertible(key) {
        return Conversion::Passthrough {
            reason: SkipReason::NotConvertible,
        };
    }

    match convert_image(bytes) {
        Ok(image) => Conversion::Converted {
            key: paths::swap_extension(key),
            image,
        },
        Err(reason) => Conversion::Passthrough { reason },
    }
}

#[cfg(feature = "webp")]
fn encode_webp(
    image: &DynamicImage,
    mode: OutputMode,
    settings: EncodeSettings,
) -> Result<Vec<u8>, SkipReason> {
    let (width, height) = image.dimensions();
    let encoder = match (mode, image) {
        (OutputMode::Rgba, DynamicImage::ImageRgba8(buf)) => {
            webp::Encoder::from_rgba(buf.as_raw(), width, height)
        }
        (OutputMode::Rgb, DynamicImage::ImageRgb8(buf)) => {
            webp::Encoder::from_rgb(buf.as_raw(), width, height)
        }
        _ => {
            return Err(SkipReason::EncodeFailed(
                "image was not normalised before encoding".to_string(),
            ))
        }
    };

    let mut config = webp::WebPConfig::new()
        .map_err(|_| SkipReason::EncodeFailed("could not initialise WebP config".to_string()))?;
    config.lossless = 0;
    config.quality = settings.quality;
    config.method = settings.method;

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| SkipReason::EncodeFailed(format!("{:?}", e)))?;
    Ok(memory.to_vec())
}

#[cfg(not(feature = "webp"))]
fn encode_webp(
    _image: &DynamicImage,
    _mode: OutputMode,
    _settings: EncodeSettings,
) -> Result<Vec<u8>, SkipReason> {
    Err(SkipReason::EncoderUnavailable)
}
