//! Network-aware quality selection and delivery ladders.
//!
//! Everything here is pure: no filesystem, no network.

use url::Url;

use crate::domain::entities::{
    ImageFormat, NetworkClass, QualityLadder, QualityProfile, TransformOptions,
    TransformOverrides,
};

/// Host substrings that accept `width`/`quality` query parameters by default.
pub const DEFAULT_TRANSFORM_HOSTS: &[&str] = &["supabase.co", "storage."];

/// Query keys this policy owns; existing values are replaced.
const OWNED_PARAMS: &[&str] = &["width", "height", "quality"];

/// Picks delivery quality from the network class and decorates URLs for
/// hosts that resize on the server.
#[derive(Debug, Clone)]
pub struct QualityPolicy {
    transform_hosts: Vec<String>,
    default_format: ImageFormat,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_TRANSFORM_HOSTS.iter().map(|h| (*h).to_string()),
            ImageFormat::Jpeg,
        )
    }
}

impl QualityPolicy {
    /// Creates a policy for the given transform-capable host patterns.
    #[must_use]
    pub fn new(
        transform_hosts: impl IntoIterator<Item = String>,
        default_format: ImageFormat,
    ) -> Self {
        Self {
            transform_hosts: transform_hosts.into_iter().collect(),
            default_format,
        }
    }

    /// Returns the quality profile for a network class.
    #[must_use]
    pub const fn profile_for(&self, class: NetworkClass) -> QualityProfile {
        let (width, quality) = match class {
            NetworkClass::Wifi => (1200, 0.80),
            NetworkClass::Cellular => (800, 0.70),
            NetworkClass::Unknown => (600, 0.60),
        };
        QualityProfile {
            width,
            quality,
            format: self.default_format,
        }
    }

    /// Merges caller overrides over the profile for `class`.
    #[must_use]
    pub fn resolve(&self, class: NetworkClass, overrides: &TransformOverrides) -> TransformOptions {
        let profile = self.profile_for(class);
        TransformOptions::new(
            overrides.width.or(Some(profile.width)),
            overrides.height,
            overrides.quality.unwrap_or(profile.quality),
            overrides.format.unwrap_or(profile.format),
        )
    }

    /// Returns true if the URI's host resizes images on request.
    #[must_use]
    pub fn supports_transforms(&self, uri: &str) -> bool {
        Url::parse(uri)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| self.transform_hosts.iter().any(|p| host.contains(p.as_str())))
    }

    /// Appends width/quality parameters for transform-capable hosts.
    ///
    /// Unrecognised hosts and unparsable URIs come back unchanged.
    #[must_use]
    pub fn decorate(&self, uri: &str, width: u32, quality_percent: u8) -> String {
        if !self.supports_transforms(uri) {
            return uri.to_string();
        }
        let Ok(mut url) = Url::parse(uri) else {
            return uri.to_string();
        };

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !OWNED_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("quality", &quality_percent.to_string())
            .extend_pairs(kept);

        url.into()
    }

    /// Builds the low/medium/high/original ladder for `class`.
    ///
    /// High matches the class profile, medium is half its width, low a quarter
    /// of its width at 50% quality.
    #[must_use]
    pub fn build_ladder(&self, uri: &str, class: NetworkClass) -> QualityLadder {
        let profile = self.profile_for(class);
        let pct = profile.quality_percent();

        QualityLadder {
            low_quality: self.decorate(uri, (profile.width / 4).max(1), 50),
            medium_quality: self.decorate(uri, (profile.width / 2).max(1), pct),
            high_quality: self.decorate(uri, profile.width, pct),
            original: uri.to_string(),
        }
    }
}
