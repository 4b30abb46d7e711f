//! Delivery quality types shared by the policy selector and the transform engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse network bucket used to pick a quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClass {
    /// Unmetered, fast connection.
    Wifi,
    /// Mobile data connection.
    Cellular,
    /// Anything the probe cannot classify. Treated as the slowest tier.
    #[default]
    Unknown,
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Cellular => write!(f, "cellular"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for NetworkClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wifi" | "ethernet" => Ok(Self::Wifi),
            "cellular" | "mobile" => Ok(Self::Cellular),
            "unknown" | "none" => Ok(Self::Unknown),
            other => Err(format!("unknown network class: {other}")),
        }
    }
}

/// Output encoding of a derivative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossy JPEG; honours the quality ratio.
    #[default]
    Jpeg,
    /// Lossless PNG; quality is ignored.
    Png,
}

impl ImageFormat {
    /// File extension used for cached derivatives.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(format!("unsupported image format: {other}")),
        }
    }
}

/// Width/quality/format tuple chosen for a network class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityProfile {
    /// Target width in pixels.
    pub width: u32,
    /// Lossy compression ratio in `[0, 1]`.
    pub quality: f32,
    /// Output encoding.
    pub format: ImageFormat,
}

impl QualityProfile {
    /// Quality expressed as an integer percentage, as used in query strings.
    #[must_use]
    pub fn quality_percent(&self) -> u8 {
        quality_to_percent(self.quality)
    }
}

/// Caller-supplied overrides merged over a [`QualityProfile`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformOverrides {
    /// Target width. `Some(0)` disables resizing on this axis.
    pub width: Option<u32>,
    /// Target height. `Some(0)` disables resizing on this axis.
    pub height: Option<u32>,
    /// Compression ratio in `[0, 1]`.
    pub quality: Option<f32>,
    /// Output encoding.
    pub format: Option<ImageFormat>,
}

/// Fully resolved transform request handed to the transform engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOptions {
    /// Target width; `None` keeps the source width unless height forces a scale.
    pub width: Option<u32>,
    /// Target height; `None` keeps the aspect ratio derived from width.
    pub height: Option<u32>,
    /// Compression ratio, always within `[0, 1]`.
    pub quality: f32,
    /// Output encoding.
    pub format: ImageFormat,
}

impl TransformOptions {
    /// Creates options, normalising zero dimensions to "unset" and clamping quality.
    #[must_use]
    pub fn new(width: Option<u32>, height: Option<u32>, quality: f32, format: ImageFormat) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
            quality: clamp_quality(quality),
            format,
        }
    }

    /// Returns true if no resize is requested, only a re-encode.
    #[must_use]
    pub const fn is_recompress_only(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Quality expressed as an integer percentage.
    #[must_use]
    pub fn quality_percent(&self) -> u8 {
        quality_to_percent(self.quality)
    }

    /// Canonical text form, stable across runs; feeds the cache key.
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!(
            "w={};h={};q={};f={}",
            self.width.unwrap_or(0),
            self.height.unwrap_or(0),
            self.quality_percent(),
            self.format
        )
    }
}

/// Same-image URLs differing only in requested resolution and quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityLadder {
    /// Placeholder-grade rendition.
    pub low_quality: String,
    /// Intermediate rendition.
    pub medium_quality: String,
    /// Rendition matching the current network class.
    pub high_quality: String,
    /// Untouched origin URI.
    pub original: String,
}

fn clamp_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        1.0
    } else {
        quality.clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quality_to_percent(quality: f32) -> u8 {
    (clamp_quality(quality) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimensions_mean_no_resize() {
        let options = TransformOptions::new(Some(0), Some(0), 0.7, ImageFormat::Jpeg);
        assert!(options.is_recompress_only());
    }

    #[test]
    fn test_quality_is_clamped() {
        assert!((TransformOptions::new(None, None, 1.7, ImageFormat::Png).quality - 1.0).abs() < f32::EPSILON);
        assert!(TransformOptions::new(None, None, -0.5, ImageFormat::Png).quality.abs() < f32::EPSILON);
        assert_eq!(TransformOptions::new(None, None, 0.7, ImageFormat::Jpeg).quality_percent(), 70);
    }

    #[test]
    fn test_descriptor_distinguishes_tiers() {
        let low = TransformOptions::new(Some(600), None, 0.6, ImageFormat::Jpeg);
        let high = TransformOptions::new(Some(1200), None, 0.8, ImageFormat::Jpeg);
        assert_eq!(low.descriptor(), "w=600;h=0;q=60;f=jpeg");
        assert_ne!(low.descriptor(), high.descriptor());
    }

    #[test]
    fn test_parse_network_class() {
        assert_eq!("WiFi".parse::<NetworkClass>(), Ok(NetworkClass::Wifi));
        assert_eq!("cellular".parse::<NetworkClass>(), Ok(NetworkClass::Cellular));
        assert!("carrier-pigeon".parse::<NetworkClass>().is_err());
    }

    #[test]
    fn test_ladder_serializes_camel_case() {
        let ladder = QualityLadder {
            low_quality: "a".into(),
            medium_quality: "b".into(),
            high_quality: "c".into(),
            original: "d".into(),
        };
        let json = serde_json::to_value(&ladder).unwrap();
        assert_eq!(json["lowQuality"], "a");
        assert_eq!(json["highQuality"], "c");
    }
}
