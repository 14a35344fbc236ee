use super::{Alignment, MediaKind, Rotation};

/// Framework-neutral description of what a media node shows on this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaView {
    pub kind: MediaKind,
    pub alignment: Alignment,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content: MediaContent,
    /// In-progress width label, only while a resize drag is live.
    pub readout: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaContent {
    Image {
        src: String,
        alt: Option<String>,
        rotation: Rotation,
    },
    Video {
        embed_url: String,
    },
    Placeholder {
        message: String,
        width: u32,
        height: u32,
    },
}

impl MediaView {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, MediaContent::Placeholder { .. })
    }
}
