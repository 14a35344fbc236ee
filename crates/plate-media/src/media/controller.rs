use std::rc::Rc;

use plate_core::{AttrPatch, Attrs, Path};
use serde_json::json;

use super::{Alignment, EmbedCache, MediaAttrs, MediaContent, MediaKind, MediaView, Rotation};
use crate::config::MediaConfig;
use crate::engine::DocumentCommands;
use crate::error::MediaError;
use crate::gesture::{DragSession, GestureTracker};
use crate::input::{InputSurface, OwnerId, PointerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    MissingSource,
    AssetUnavailable,
    UnrecognizedVideo,
}

impl LoadFailure {
    pub fn message(self, kind: MediaKind) -> &'static str {
        match (self, kind) {
            (LoadFailure::MissingSource, _) => "No media source",
            (LoadFailure::AssetUnavailable, MediaKind::Image) => "Image could not be loaded",
            (LoadFailure::AssetUnavailable, MediaKind::Video) => "Video could not be loaded",
            (LoadFailure::UnrecognizedVideo, _) => "Unsupported video link",
        }
    }
}

/// A user-visible notice raised by a media node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub path: Path,
    pub kind: MediaKind,
    pub message: String,
}

/// Interactive behavior for one embedded image or video node.
///
/// The controller mirrors the node's attributes. Alignment, rotation and
/// delete go to the engine immediately; a resize drag updates the mirrored
/// width on every move and reaches the engine as one patch when it ends.
pub struct MediaController {
    kind: MediaKind,
    path: Path,
    owner: OwnerId,
    attrs: MediaAttrs,
    tracker: GestureTracker,
    session: Option<DragSession>,
    width_before_drag: Option<u32>,
    input: Rc<dyn InputSurface>,
    embed: EmbedCache,
    load_failure: Option<LoadFailure>,
    removed: bool,
    embed_base_url: String,
    placeholder_size: (u32, u32),
    show_readout: bool,
}

impl MediaController {
    pub fn new(
        kind: MediaKind,
        path: Path,
        attrs: &Attrs,
        owner: OwnerId,
        input: Rc<dyn InputSurface>,
        config: &MediaConfig,
    ) -> Self {
        let floor = config.floor(kind);
        let mut controller = Self {
            kind,
            path,
            owner,
            attrs: MediaAttrs::from_attrs(attrs).normalized(kind, floor),
            tracker: GestureTracker::new(floor),
            session: None,
            width_before_drag: None,
            input,
            embed: EmbedCache::default(),
            load_failure: None,
            removed: false,
            embed_base_url: config.embed_base_url.clone(),
            placeholder_size: (config.placeholder_width, config.placeholder_height),
            show_readout: config.show_width_readout,
        };
        controller.refresh_source();
        controller
    }

    fn refresh_source(&mut self) {
        self.load_failure = None;
        if self.attrs.src.is_empty() {
            self.load_failure = Some(LoadFailure::MissingSource);
            return;
        }
        if self.kind == MediaKind::Video {
            if let Err(err) = self.resolve_embed() {
                tracing::warn!(path = ?self.path, %err, "video has no embeddable reference");
                self.load_failure = Some(LoadFailure::UnrecognizedVideo);
            }
        }
    }

    fn resolve_embed(&mut self) -> Result<(), MediaError> {
        self.embed
            .resolve(&self.attrs.src, &self.embed_base_url)
            .clone()?;
        Ok(())
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn attrs(&self) -> &MediaAttrs {
        &self.attrs
    }

    pub fn floor(&self) -> u32 {
        self.tracker.floor()
    }

    pub fn is_resizing(&self) -> bool {
        self.session.as_ref().is_some_and(DragSession::is_live)
    }

    pub fn load_failure(&self) -> Option<LoadFailure> {
        self.load_failure
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn embed_url(&self) -> Option<&str> {
        match self.embed.current() {
            Some(Ok(url)) => Some(url),
            _ => None,
        }
    }

    pub fn embed_derivations(&self) -> usize {
        self.embed.derivations()
    }

    pub fn set_alignment(
        &mut self,
        alignment: Alignment,
        engine: &mut dyn DocumentCommands,
    ) -> Result<(), MediaError> {
        if self.removed {
            return Ok(());
        }
        engine.patch_node(
            &self.path,
            AttrPatch::set("textAlign", json!(alignment.as_str())),
            "media.set_align",
        )?;
        self.attrs.alignment = alignment;
        Ok(())
    }

    pub fn rotate(&mut self, engine: &mut dyn DocumentCommands) -> Result<Rotation, MediaError> {
        if !self.kind.supports_rotation() {
            return Err(MediaError::RotationUnsupported { kind: self.kind });
        }
        if self.removed {
            return Ok(self.attrs.rotation);
        }
        let rotation = self.attrs.rotation.next();
        engine.patch_node(
            &self.path,
            AttrPatch::set("rotation", json!(rotation.degrees())),
            "media.rotate",
        )?;
        self.attrs.rotation = rotation;
        Ok(rotation)
    }

    /// Starts a resize drag from `event`, using the element's current
    /// rendered width as the baseline. A second begin while a drag is live
    /// is ignored.
    pub fn begin_resize(&mut self, event: &PointerEvent, measured_width: u32) -> bool {
        if self.removed {
            return false;
        }
        if self.is_resizing() {
            tracing::debug!(path = ?self.path, "ignored begin while a drag is live");
            return false;
        }
        match self
            .tracker
            .begin(event, measured_width, self.owner, self.input.clone())
        {
            Some(session) => {
                self.session = Some(session);
                self.width_before_drag = self.attrs.width;
                true
            }
            None => false,
        }
    }

    pub fn resize_by(&mut self, event: &PointerEvent) -> Option<u32> {
        let session = self.session.as_mut()?;
        let width = self.tracker.on_move(session, event)?;
        self.attrs.width = Some(width);
        Some(width)
    }

    /// Ends the drag and commits its last width to the engine. Returns the
    /// committed width, or `None` when no drag was live or the drag ended
    /// where it started; the stored width is shown again in that case.
    pub fn end_resize(
        &mut self,
        engine: &mut dyn DocumentCommands,
    ) -> Result<Option<u32>, MediaError> {
        let Some(mut session) = self.session.take() else {
            return Ok(None);
        };
        if !self.tracker.end(&mut session) || session.value() == session.baseline() {
            self.attrs.width = self.width_before_drag;
            return Ok(None);
        }

        let width = self.tracker.clamp(session.value());
        if let Err(err) = engine.patch_node(
            &self.path,
            AttrPatch::set("width", json!(width)),
            "media.resize",
        ) {
            self.attrs.width = self.width_before_drag;
            return Err(err);
        }
        self.attrs.width = Some(width);
        Ok(Some(width))
    }

    pub fn delete(&mut self, engine: &mut dyn DocumentCommands) -> Result<(), MediaError> {
        if self.removed {
            return Ok(());
        }
        self.cancel_session();
        engine.remove_node(&self.path)?;
        self.removed = true;
        Ok(())
    }

    /// Latches the load-failure state. Only the first report for an image
    /// yields a notice; video failures stay inline.
    pub fn report_load_failure(&mut self) -> Option<Notice> {
        if self.load_failure.is_some() {
            return None;
        }
        let failure = LoadFailure::AssetUnavailable;
        self.load_failure = Some(failure);
        tracing::warn!(path = ?self.path, kind = %self.kind, src = %self.attrs.src, "media failed to load");

        (self.kind == MediaKind::Image).then(|| Notice {
            path: self.path.clone(),
            kind: self.kind,
            message: failure.message(self.kind).to_string(),
        })
    }

    pub fn render(&self) -> MediaView {
        let content = match (self.load_failure, self.kind) {
            (Some(failure), kind) => MediaContent::Placeholder {
                message: failure.message(kind).to_string(),
                width: self.placeholder_size.0,
                height: self.placeholder_size.1,
            },
            (None, MediaKind::Image) => MediaContent::Image {
                src: self.attrs.src.clone(),
                alt: self.attrs.alt.clone(),
                rotation: self.attrs.rotation,
            },
            (None, MediaKind::Video) => MediaContent::Video {
                embed_url: self.embed_url().unwrap_or_default().to_string(),
            },
        };

        let readout = self
            .session
            .as_ref()
            .filter(|session| session.is_live() && self.show_readout)
            .map(|session| format!("{}px", session.value()));

        MediaView {
            kind: self.kind,
            alignment: self.attrs.alignment,
            width: self.attrs.width,
            height: self.attrs.height,
            content,
            readout,
        }
    }

    /// Rebinds to a fresh attribute snapshot from the engine. A live drag
    /// keeps its own width; a changed source clears the failure latch.
    pub fn sync_attrs(&mut self, path: &[usize], attrs: &Attrs) {
        self.path = path.to_vec();
        let next = MediaAttrs::from_attrs(attrs).normalized(self.kind, self.tracker.floor());
        let source_changed = next.src != self.attrs.src;
        let live_width = self.is_resizing().then_some(self.attrs.width);

        self.attrs = next;
        if let Some(width) = live_width {
            self.width_before_drag = self.attrs.width;
            self.attrs.width = width;
        }
        if source_changed {
            self.refresh_source();
        }
    }

    fn cancel_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.tracker.end(&mut session);
            self.attrs.width = self.width_before_drag;
        }
    }

    pub fn teardown(&mut self) {
        self.cancel_session();
    }
}
