//! Per-kind rendering strategies. Media kinds register a factory here
//! instead of the surface hard-coding them.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use plate_core::{Attrs, Path};

use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::input::{InputSurface, OwnerId};
use crate::media::{MediaController, MediaKind, MediaView};

/// Everything a renderer needs when it is bound to a node.
pub struct RendererContext<'a> {
    pub kind: &'a str,
    pub path: Path,
    pub attrs: &'a Attrs,
    pub owner: OwnerId,
    pub input: Rc<dyn InputSurface>,
    pub config: &'a MediaConfig,
}

pub trait NodeRenderer: Any {
    fn render(&self) -> MediaView;
    fn on_attribute_change(&mut self, path: &[usize], attrs: &Attrs);
    fn on_destroy(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl NodeRenderer for MediaController {
    fn render(&self) -> MediaView {
        MediaController::render(self)
    }

    fn on_attribute_change(&mut self, path: &[usize], attrs: &Attrs) {
        self.sync_attrs(path, attrs);
    }

    fn on_destroy(&mut self) {
        self.teardown();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub type RendererFactory = Box<dyn Fn(RendererContext<'_>) -> Box<dyn NodeRenderer>>;

#[derive(Default)]
pub struct RendererRegistry {
    factories: HashMap<String, RendererFactory>,
}

impl RendererRegistry {
    /// A registry with the image and video renderers.
    pub fn media() -> Self {
        let mut registry = Self::default();
        for kind in [MediaKind::Image, MediaKind::Video] {
            // Fresh registry, so the two kinds cannot collide.
            let _ = registry.register(kind.tag(), move |cx: RendererContext<'_>| {
                Box::new(MediaController::new(
                    kind, cx.path, cx.attrs, cx.owner, cx.input, cx.config,
                )) as Box<dyn NodeRenderer>
            });
        }
        registry
    }

    pub fn register(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(RendererContext<'_>) -> Box<dyn NodeRenderer> + 'static,
    ) -> Result<(), MediaError> {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            return Err(MediaError::DuplicateRenderer(kind));
        }
        tracing::debug!(%kind, "registered renderer");
        self.factories.insert(kind, Box::new(factory));
        Ok(())
    }

    pub fn has(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn create(&self, cx: RendererContext<'_>) -> Option<Box<dyn NodeRenderer>> {
        let factory = self.factories.get(cx.kind)?;
        Some(factory(cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut registry = RendererRegistry::media();
        assert!(registry.has("image") && registry.has("video"));

        let err = registry
            .register("image", |cx: RendererContext<'_>| {
                Box::new(MediaController::new(
                    MediaKind::Image,
                    cx.path,
                    cx.attrs,
                    cx.owner,
                    cx.input,
                    cx.config,
                )) as Box<dyn NodeRenderer>
            })
            .unwrap_err();
        assert!(matches!(err, MediaError::DuplicateRenderer(kind) if kind == "image"));
    }
}
