//! Image encoding: `RenderedPage` → JPEG bytes, optionally downscaled.
//!
//! Steps, in order:
//!
//! 1. validate quality (1–100) and that the buffer has pixels
//! 2. composite any alpha channel onto white (JPEG has no transparency)
//! 3. downscale to the max width with Lanczos3 if the page is wider
//! 4. baseline JPEG at the requested quality
//!
//! The `image` codec writes baseline, sequential JPEG with its standard
//! Huffman tables. It has no progressive or optimised-table mode, so files
//! are a few percent larger than a progressive encoder would produce for
//! the same quality.
//!
//! Flattening comes first: the resampling filter does not premultiply, so
//! resizing RGBA would bleed transparent black into glyph edges.

use crate::config::MaxWidth;
use crate::error::EncodeError;
use crate::pipeline::render::RenderedPage;
use image::codecs::jpeg::JpegEncoder as JpegCodec;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

/// Compressed output of one page.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A lossy encoding backend.
pub trait ImageEncoder {
    fn encode(
        &self,
        page: &RenderedPage,
        quality: u8,
        max_width: MaxWidth,
    ) -> Result<EncodedPage, EncodeError>;
}

/// JPEG encoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn encode(
        &self,
        page: &RenderedPage,
        quality: u8,
        max_width: MaxWidth,
    ) -> Result<EncodedPage, EncodeError> {
        encode_jpeg(&page.image, quality, max_width)
    }
}

/// Encode `img` as JPEG, downscaling to `max_width` first if needed.
pub fn encode_jpeg(
    img: &DynamicImage,
    quality: u8,
    max_width: MaxWidth,
) -> Result<EncodedPage, EncodeError> {
    if !(1..=100).contains(&quality) {
        return Err(EncodeError::InvalidQuality(quality));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(EncodeError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }

    let flat = DynamicImage::ImageRgb8(flatten_alpha(img));
    let rgb = resize_to_max_width(&flat, max_width)
        .unwrap_or(flat)
        .into_rgb8();

    let mut bytes = Vec::new();
    JpegCodec::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;

    debug!(
        "Encoded {}x{} → {}x{} JPEG q{} ({} bytes)",
        img.width(),
        img.height(),
        rgb.width(),
        rgb.height(),
        quality,
        bytes.len()
    );

    Ok(EncodedPage {
        bytes,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Output size for a `width × height` image under `max_width`.
///
/// Height keeps the aspect ratio, rounded to the nearest pixel, never below 1.
pub fn scaled_dimensions(width: u32, height: u32, max_width: MaxWidth) -> (u32, u32) {
    let target = max_width.target_width(width);
    if target == width {
        return (width, height);
    }
    let h = (f64::from(height) * f64::from(target) / f64::from(width)).round();
    (target, (h as u32).max(1))
}

/// Downscale `img` when it is wider than `max_width`.
///
/// Returns `None` when no resize is needed, so callers can keep borrowing
/// the original.
pub fn resize_to_max_width(img: &DynamicImage, max_width: MaxWidth) -> Option<DynamicImage> {
    let (w, h) = scaled_dimensions(img.width(), img.height(), max_width);
    if w == img.width() {
        return None;
    }
    Some(img.resize_exact(w, h, FilterType::Lanczos3))
}

/// Composite onto an opaque white background and drop the alpha channel.
pub fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn page(img: DynamicImage) -> RenderedPage {
        RenderedPage {
            document_id: "test.pdf".into(),
            page_num: 1,
            image: img,
        }
    }

    /// A page-like test card: white background, dark text-ish stripes and a
    /// diagonal gradient so JPEG has real detail to throw away.
    fn test_card(w: u32, h: u32) -> DynamicImage {
        let img = RgbImage::from_fn(w, h, |x, y| {
            if y % 12 < 3 && x % 40 < 30 {
                Rgb([20, 20, 20])
            } else {
                let v = ((x + y) * 255 / (w + h)) as u8;
                Rgb([255 - v / 4, 250 - v / 3, 240 - v / 2])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn mean_abs_error(a: &DynamicImage, b: &DynamicImage) -> f64 {
        let (a, b) = (a.to_rgb8(), b.to_rgb8());
        let total: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(x, y)| u64::from(x.abs_diff(*y)))
            .sum();
        total as f64 / a.as_raw().len() as f64
    }

    #[test]
    fn output_is_jpeg() {
        let out = JpegEncoder
            .encode(&page(test_card(64, 48)), 65, MaxWidth::Disabled)
            .unwrap();
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8], "SOI marker");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    /// The start-of-frame marker of a JPEG stream, found by walking the
    /// segment headers after SOI.
    fn frame_marker(bytes: &[u8]) -> Option<u8> {
        let mut i = 2;
        while i + 4 <= bytes.len() {
            if bytes[i] != 0xFF {
                return None;
            }
            let marker = bytes[i + 1];
            if (0xC0..=0xCF).contains(&marker) && ![0xC4, 0xC8, 0xCC].contains(&marker) {
                return Some(marker);
            }
            let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
            i += 2 + len;
        }
        None
    }

    #[test]
    fn output_is_baseline_jpeg() {
        let out = JpegEncoder
            .encode(&page(test_card(64, 48)), 65, MaxWidth::Disabled)
            .unwrap();
        assert_eq!(frame_marker(&out.bytes), Some(0xC0), "SOF0 (baseline)");
    }

    #[test]
    fn rejects_bad_quality() {
        let img = test_card(8, 8);
        assert_eq!(
            encode_jpeg(&img, 0, MaxWidth::Disabled).unwrap_err(),
            EncodeError::InvalidQuality(0)
        );
        assert_eq!(
            encode_jpeg(&img, 101, MaxWidth::Disabled).unwrap_err(),
            EncodeError::InvalidQuality(101)
        );
    }

    #[test]
    fn rejects_empty_buffer() {
        let img = DynamicImage::new_rgba8(0, 10);
        assert!(matches!(
            encode_jpeg(&img, 50, MaxWidth::Disabled),
            Err(EncodeError::EmptyImage { width: 0, height: 10 })
        ));
    }

    #[test]
    fn downscales_preserving_aspect() {
        let out = encode_jpeg(&test_card(400, 300), 80, MaxWidth::Limit(100)).unwrap();
        assert_eq!((out.width, out.height), (100, 75));
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 75));
    }

    #[test]
    fn never_upscales() {
        let out = encode_jpeg(&test_card(120, 90), 80, MaxWidth::Limit(1600)).unwrap();
        assert_eq!((out.width, out.height), (120, 90));
    }

    #[test]
    fn scaled_height_rounds_and_stays_positive() {
        assert_eq!(scaled_dimensions(1224, 1584, MaxWidth::Limit(1000)), (1000, 1294));
        assert_eq!(scaled_dimensions(1000, 3, MaxWidth::Limit(10)), (10, 1));
        assert_eq!(scaled_dimensions(300, 200, MaxWidth::Limit(300)), (300, 200));
        assert_eq!(scaled_dimensions(3, 2, MaxWidth::Limit(2)), (2, 1));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let rgba = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert!(flat.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn opaque_pixels_keep_their_colour() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 255]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert!(flat.pixels().all(|p| p.0 == [10, 200, 30]));
    }

    #[test]
    fn half_alpha_blends_toward_white() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        let v = flat.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&v), "got {v}");
    }

    #[test]
    fn higher_quality_means_bigger_and_cleaner() {
        let img = test_card(320, 240);
        let mut last_size = 0usize;
        let mut last_err = f64::MAX;
        for q in [10u8, 40, 70, 95] {
            let out = encode_jpeg(&img, q, MaxWidth::Disabled).unwrap();
            let decoded = image::load_from_memory(&out.bytes).unwrap();
            let err = mean_abs_error(&img, &decoded);
            assert!(
                out.bytes.len() >= last_size,
                "q{q}: size {} < previous {last_size}",
                out.bytes.len()
            );
            assert!(err <= last_err, "q{q}: error {err} > previous {last_err}");
            last_size = out.bytes.len();
            last_err = err;
        }
    }
}
