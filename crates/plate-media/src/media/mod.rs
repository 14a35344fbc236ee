mod attrs;
mod controller;
mod embed;
mod view;

use serde::{Deserialize, Serialize};

pub use attrs::{Alignment, MediaAttrs, Rotation};
pub use controller::{LoadFailure, MediaController, Notice};
pub use embed::{EmbedCache, EmbedError, embed_reference};
pub use view::{MediaContent, MediaView};

pub const IMAGE_KIND: &str = "image";
pub const VIDEO_KIND: &str = "video";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            IMAGE_KIND => Some(MediaKind::Image),
            VIDEO_KIND => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            MediaKind::Image => IMAGE_KIND,
            MediaKind::Video => VIDEO_KIND,
        }
    }

    pub fn supports_rotation(self) -> bool {
        self == MediaKind::Image
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
