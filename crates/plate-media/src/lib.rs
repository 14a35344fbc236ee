//! Embedded media and paste conversion for the plate editing surface.
//!
//! Media nodes (`image`, `video`) get a controller that drives resize drags
//! from mouse or touch input, alignment, rotation and delete, and falls back
//! to a placeholder when the asset cannot be shown. Plain-text pastes that
//! look like markdown are converted into structured blocks.

pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod input;
pub mod media;
pub mod paste;
pub mod plugin;
pub mod renderer;
pub mod surface;

pub use config::MediaConfig;
pub use engine::DocumentCommands;
pub use error::MediaError;
pub use gesture::{DragSession, GestureTracker};
pub use input::{
    InputSurface, ListenerGuard, ListenerKind, OwnerId, PointerEvent, PointerPhase,
    PointerSource, PointerSurface,
};
pub use media::{
    Alignment, EmbedCache, EmbedError, LoadFailure, MediaAttrs, MediaContent, MediaController,
    MediaKind, MediaView, Notice, Rotation, embed_reference,
};
pub use paste::{
    ClipboardEntry, ClipboardPayload, MarkupSignal, PasteDecision, PasteInterceptor,
    TranslateError,
};
pub use plugin::MediaPlugin;
pub use renderer::{NodeRenderer, RendererContext, RendererRegistry};
pub use surface::{EditingSurface, PasteOutcome};
