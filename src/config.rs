//! Configuration types for PDF-to-JPEG conversion.
//!
//! All conversion behaviour is controlled through [`ConversionSettings`],
//! built via its [`ConversionSettingsBuilder`]. The builder only stores what
//! it is given; [`ConversionSettings::validate`] is the single place where
//! values are checked, and the pipeline calls it once before touching any
//! document. Settings that arrive through other routes (struct literals,
//! deserialised JSON) therefore get the same checks.

use crate::error::Pdf2JpgError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings for one conversion run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2jpg::{ConversionSettings, MaxWidth};
///
/// let settings = ConversionSettings::builder()
///     .zoom(2.0)
///     .quality(65)
///     .max_width(MaxWidth::Limit(1600))
///     .prefix("page")
///     .build()
///     .unwrap();
/// assert_eq!(settings.quality, 65);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Scale factor applied to the page's native size before rasterising.
    /// Default: 2.0.
    ///
    /// pdfium lays pages out at 72 points per inch, so zoom 1.0 gives roughly
    /// 72 DPI and 2.0 gives 144 DPI. Pixel count grows with the square of
    /// the zoom, and so does render time.
    pub zoom: f32,

    /// JPEG quality, 1–100. Default: 65.
    ///
    /// 65 keeps scanned forms and IDs legible at a fraction of the size of
    /// 90+. Drop toward 40 for bulk archives; raise toward 85 when fine print
    /// must survive.
    pub quality: u8,

    /// Cap on output pixel width. Default: 1600.
    pub max_width: MaxWidth,

    /// Base for output filenames (`{prefix}_001.jpg`). Default: "page".
    pub prefix: String,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            quality: 65,
            max_width: MaxWidth::Limit(1600),
            prefix: "page".to_string(),
        }
    }
}

impl ConversionSettings {
    /// Create a new builder for `ConversionSettings`.
    pub fn builder() -> ConversionSettingsBuilder {
        ConversionSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Check every field.
    ///
    /// Returns [`Pdf2JpgError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<(), Pdf2JpgError> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(Pdf2JpgError::InvalidConfig(format!(
                "zoom must be a positive number, got {}",
                self.zoom
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Pdf2JpgError::InvalidConfig(format!(
                "quality must be 1–100, got {}",
                self.quality
            )));
        }
        if let MaxWidth::Limit(0) = self.max_width {
            return Err(Pdf2JpgError::InvalidConfig(
                "max width must be ≥ 1 (use MaxWidth::Disabled to turn it off)".into(),
            ));
        }
        if self.prefix.trim().is_empty() {
            return Err(Pdf2JpgError::InvalidConfig(
                "prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionSettings`].
#[derive(Debug)]
pub struct ConversionSettingsBuilder {
    settings: ConversionSettings,
}

impl ConversionSettingsBuilder {
    pub fn zoom(mut self, zoom: f32) -> Self {
        self.settings.zoom = zoom;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.settings.quality = quality;
        self
    }

    pub fn max_width(mut self, max_width: MaxWidth) -> Self {
        self.settings.max_width = max_width;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.prefix = prefix.into();
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ConversionSettings, Pdf2JpgError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Upper bound on output width.
///
/// Pages wider than the limit are scaled down, keeping their aspect ratio.
/// Narrower pages are left alone; images are never upscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxWidth {
    /// Keep the rendered width.
    #[default]
    Disabled,
    /// Scale down to at most this many pixels wide.
    Limit(u32),
}

impl MaxWidth {
    /// Map the command-line convention (`0` disables) onto the enum.
    pub fn from_pixels(px: u32) -> Self {
        if px == 0 {
            MaxWidth::Disabled
        } else {
            MaxWidth::Limit(px)
        }
    }

    /// The width to use for an image `width` pixels wide.
    pub fn target_width(self, width: u32) -> u32 {
        match self {
            MaxWidth::Limit(max) if width > max => max,
            _ => width,
        }
    }
}

impl fmt::Display for MaxWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxWidth::Disabled => f.write_str("disabled"),
            MaxWidth::Limit(px) => write!(f, "{px}px"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ConversionSettings::default();
        assert_eq!(s.zoom, 2.0);
        assert_eq!(s.quality, 65);
        assert_eq!(s.max_width, MaxWidth::Limit(1600));
        assert_eq!(s.prefix, "page");
        s.validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_non_positive_zoom() {
        for zoom in [0.0, -1.5, f32::NAN, f32::INFINITY] {
            let err = ConversionSettings::builder().zoom(zoom).build();
            assert!(
                matches!(err, Err(Pdf2JpgError::InvalidConfig(_))),
                "zoom {zoom} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_quality_out_of_range() {
        assert!(ConversionSettings::builder().quality(0).build().is_err());
        let err = ConversionSettings::builder().quality(150).build().unwrap_err();
        assert!(err.to_string().contains("150"), "got: {err}");
        assert!(ConversionSettings::builder().quality(1).build().is_ok());
        assert!(ConversionSettings::builder().quality(100).build().is_ok());
    }

    #[test]
    fn rejects_blank_prefix() {
        assert!(ConversionSettings::builder().prefix("").build().is_err());
        assert!(ConversionSettings::builder().prefix("   ").build().is_err());
    }

    #[test]
    fn rejects_zero_limit() {
        let err = ConversionSettings::builder()
            .max_width(MaxWidth::Limit(0))
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn max_width_from_pixels() {
        assert_eq!(MaxWidth::from_pixels(0), MaxWidth::Disabled);
        assert_eq!(MaxWidth::from_pixels(1600), MaxWidth::Limit(1600));
    }

    #[test]
    fn target_width_never_upscales() {
        assert_eq!(MaxWidth::Limit(1600).target_width(2400), 1600);
        assert_eq!(MaxWidth::Limit(1600).target_width(800), 800);
        assert_eq!(MaxWidth::Disabled.target_width(5000), 5000);
    }

    #[test]
    fn settings_round_trip_json() {
        let s = ConversionSettings::builder()
            .max_width(MaxWidth::Disabled)
            .prefix("scan")
            .build()
            .unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: ConversionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
