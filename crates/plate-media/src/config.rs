use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::media::MediaKind;

pub const DEFAULT_IMAGE_MIN_WIDTH: u32 = 100;
pub const DEFAULT_VIDEO_MIN_WIDTH: u32 = 320;
pub const DEFAULT_EMBED_BASE_URL: &str = "https://www.youtube.com/embed/";

/// Tunables for the media surface. Zero or empty values fall back to the
/// defaults, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub image_min_width: u32,
    pub video_min_width: u32,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub embed_base_url: String,
    pub show_width_readout: bool,
    pub max_paste_nesting: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_min_width: DEFAULT_IMAGE_MIN_WIDTH,
            video_min_width: DEFAULT_VIDEO_MIN_WIDTH,
            placeholder_width: 320,
            placeholder_height: 180,
            embed_base_url: DEFAULT_EMBED_BASE_URL.to_string(),
            show_width_readout: true,
            max_paste_nesting: 32,
        }
    }
}

impl MediaConfig {
    pub fn from_json_str(s: &str) -> Result<Self, MediaError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }

    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.image_min_width == 0 {
            self.image_min_width = defaults.image_min_width;
        }
        if self.video_min_width == 0 {
            self.video_min_width = defaults.video_min_width;
        }
        if self.placeholder_width == 0 {
            self.placeholder_width = defaults.placeholder_width;
        }
        if self.placeholder_height == 0 {
            self.placeholder_height = defaults.placeholder_height;
        }
        if self.embed_base_url.trim().is_empty() {
            self.embed_base_url = defaults.embed_base_url;
        }
        if self.max_paste_nesting == 0 {
            self.max_paste_nesting = defaults.max_paste_nesting;
        }
        self
    }

    /// Minimum width in pixels for `kind`.
    pub fn floor(&self, kind: MediaKind) -> u32 {
        match kind {
            MediaKind::Image => self.image_min_width,
            MediaKind::Video => self.video_min_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MediaConfig::from_json_str(r#"{ "video_min_width": 400 }"#).unwrap();
        assert_eq!(config.video_min_width, 400);
        assert_eq!(config.image_min_width, DEFAULT_IMAGE_MIN_WIDTH);
        assert!(config.show_width_readout);
    }

    #[test]
    fn zero_values_fall_back() {
        let config = MediaConfig::from_json_str(r#"{ "image_min_width": 0, "embed_base_url": " " }"#)
            .unwrap();
        assert_eq!(config.floor(MediaKind::Image), DEFAULT_IMAGE_MIN_WIDTH);
        assert_eq!(config.embed_base_url, DEFAULT_EMBED_BASE_URL);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            MediaConfig::from_json_str("{ nope"),
            Err(MediaError::Config(_))
        ));
    }
}
