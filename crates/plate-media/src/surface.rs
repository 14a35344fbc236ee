//! The composed editing surface: the document engine with the media plugin
//! registered, media renderers bound to their nodes, pointer routing for
//! resize drags, and paste interception.

use std::collections::BTreeMap;
use std::rc::Rc;

use plate_core::{
    Attrs, Document, Editor, Path, PlateValue, PluginRegistry, Point, Selection, rebase_path_through,
};
use serde_json::json;

use crate::config::MediaConfig;
use crate::engine::DocumentCommands;
use crate::error::MediaError;
use crate::input::{InputSurface, ListenerKind, OwnerId, PointerEvent, PointerSurface};
use crate::media::{Alignment, MediaController, MediaView, Notice, Rotation};
use crate::paste::{ClipboardPayload, PasteInterceptor, normalize_line_endings};
use crate::plugin::MediaPlugin;
use crate::renderer::{NodeRenderer, RendererContext, RendererRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// The payload was markup and went in as structured blocks.
    Converted { blocks: usize },
    /// The default paste ran: the text went in literally.
    PlainText,
    /// The payload had no plain-text item.
    Ignored,
}

struct BoundNode {
    owner: OwnerId,
    kind: String,
    renderer: Box<dyn NodeRenderer>,
}

pub type ChangeListener = Box<dyn FnMut(&PlateValue)>;

pub struct EditingSurface {
    editor: Editor,
    config: MediaConfig,
    renderers: RendererRegistry,
    input: Rc<PointerSurface>,
    interceptor: PasteInterceptor,
    bound: BTreeMap<Path, BoundNode>,
    next_owner: u64,
    notices: Vec<Notice>,
    listeners: Vec<ChangeListener>,
    last_emitted: Option<PlateValue>,
}

impl EditingSurface {
    pub fn new(config: MediaConfig) -> Result<Self, MediaError> {
        let config = config.with_defaults();
        let registry = Self::registry(&config)?;
        Ok(Self::assemble(Editor::empty(registry), config))
    }

    pub fn with_document(document: Document, config: MediaConfig) -> Result<Self, MediaError> {
        let config = config.with_defaults();
        let registry = Self::registry(&config)?;
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Ok(Self::assemble(
            Editor::new(document, selection, registry),
            config,
        ))
    }

    pub fn from_value(value: PlateValue, config: MediaConfig) -> Result<Self, MediaError> {
        Self::with_document(value.into_document(), config)
    }

    fn registry(config: &MediaConfig) -> Result<PluginRegistry, MediaError> {
        let mut registry = PluginRegistry::core();
        registry
            .register_plugin(Box::new(MediaPlugin::new(config.clone())))
            .map_err(MediaError::Registration)?;
        Ok(registry)
    }

    fn assemble(mut editor: Editor, config: MediaConfig) -> Self {
        editor.record_ops();
        let mut surface = Self {
            editor,
            interceptor: PasteInterceptor::new(&config),
            renderers: RendererRegistry::media(),
            input: PointerSurface::new(),
            config,
            bound: BTreeMap::new(),
            next_owner: 0,
            notices: Vec::new(),
            listeners: Vec::new(),
            last_emitted: None,
        };
        surface.sync();
        surface.last_emitted = Some(surface.value());
        surface
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn input(&self) -> &PointerSurface {
        &self.input
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.editor.set_selection(selection);
    }

    pub fn value(&self) -> PlateValue {
        PlateValue::from(&self.editor)
    }

    /// Calls `listener` with the serialized document after every change.
    pub fn subscribe(&mut self, listener: impl FnMut(&PlateValue) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn bound_paths(&self) -> Vec<Path> {
        self.bound.keys().cloned().collect()
    }

    pub fn controller(&self, path: &[usize]) -> Option<&MediaController> {
        self.bound
            .get(path)?
            .renderer
            .as_any()
            .downcast_ref::<MediaController>()
    }

    /// Views for every bound media node, in document order.
    pub fn render(&self) -> Vec<(Path, MediaView)> {
        self.bound
            .iter()
            .map(|(path, bound)| (path.clone(), bound.renderer.render()))
            .collect()
    }

    /// Rebinds renderers to the current tree. Bindings first follow their
    /// node through the structural ops applied since the last sync, so a
    /// node keeps its renderer (and any live drag) when siblings move. Nodes
    /// that still match path and kind receive the fresh attributes; the rest
    /// are destroyed or created.
    fn sync(&mut self) {
        let ops = self.editor.take_applied_ops();
        let mut rebased = BTreeMap::new();
        for (path, mut bound) in std::mem::take(&mut self.bound) {
            match rebase_path_through(&path, &ops) {
                Some(next) => {
                    if next != path {
                        tracing::debug!(from = ?path, to = ?next, "renderer followed its node");
                    }
                    if let Some(mut displaced) = rebased.insert(next, bound) {
                        displaced.renderer.on_destroy();
                    }
                }
                None => bound.renderer.on_destroy(),
            }
        }
        self.bound = rebased;

        let live: Vec<(Path, String, Attrs)> = self
            .editor
            .doc()
            .void_nodes()
            .into_iter()
            .filter(|(_, node)| self.renderers.has(&node.kind))
            .map(|(path, node)| (path, node.kind.clone(), node.attrs.clone()))
            .collect();

        let mut next = BTreeMap::new();
        for (path, kind, attrs) in live {
            match self.bound.remove(&path) {
                Some(mut bound) if bound.kind == kind => {
                    bound.renderer.on_attribute_change(&path, &attrs);
                    next.insert(path, bound);
                }
                stale => {
                    if let Some(mut stale) = stale {
                        stale.renderer.on_destroy();
                    }
                    self.next_owner += 1;
                    let owner = OwnerId(self.next_owner);
                    let input: Rc<dyn InputSurface> = self.input.clone();
                    let cx = RendererContext {
                        kind: &kind,
                        path: path.clone(),
                        attrs: &attrs,
                        owner,
                        input,
                        config: &self.config,
                    };
                    if let Some(renderer) = self.renderers.create(cx) {
                        tracing::debug!(?path, %kind, ?owner, "bound renderer");
                        next.insert(
                            path,
                            BoundNode {
                                owner,
                                kind,
                                renderer,
                            },
                        );
                    }
                }
            }
        }

        for (path, mut bound) in std::mem::take(&mut self.bound) {
            tracing::debug!(?path, kind = %bound.kind, "destroyed renderer");
            bound.renderer.on_destroy();
        }
        self.bound = next;
    }

    fn emit_change(&mut self) {
        let value = self.value();
        if self.last_emitted.as_ref() == Some(&value) {
            return;
        }
        for listener in &mut self.listeners {
            listener(&value);
        }
        self.last_emitted = Some(value);
    }

    fn after_edit(&mut self) {
        self.sync();
        self.emit_change();
    }

    fn controller_in<'a>(
        bound: &'a mut BTreeMap<Path, BoundNode>,
        path: &[usize],
    ) -> Result<&'a mut MediaController, MediaError> {
        bound
            .get_mut(path)
            .and_then(|b| b.renderer.as_any_mut().downcast_mut::<MediaController>())
            .ok_or_else(|| MediaError::NotBound {
                path: path.to_vec(),
            })
    }

    /// Pointer-down on the resize handle of the node at `path`.
    pub fn pointer_down(
        &mut self,
        path: &[usize],
        event: &PointerEvent,
        measured_width: u32,
    ) -> Result<bool, MediaError> {
        let controller = Self::controller_in(&mut self.bound, path)?;
        Ok(controller.begin_resize(event, measured_width))
    }

    /// Routes a surface-wide move or end event to the controllers listening
    /// for it.
    pub fn pointer_event(&mut self, event: &PointerEvent) -> Result<(), MediaError> {
        let Some(kind) = ListenerKind::for_phase(event.phase) else {
            return Ok(());
        };
        let owners = self.input.listeners(kind);
        if owners.is_empty() {
            return Ok(());
        }

        let mut committed = false;
        let mut failure = None;
        for owner in owners {
            let Some(controller) = self
                .bound
                .values_mut()
                .find(|b| b.owner == owner)
                .and_then(|b| b.renderer.as_any_mut().downcast_mut::<MediaController>())
            else {
                continue;
            };
            match kind {
                ListenerKind::Move => {
                    controller.resize_by(event);
                }
                ListenerKind::End => match controller.end_resize(&mut self.editor) {
                    Ok(Some(_)) => committed = true,
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(%err, "resize commit failed");
                        failure = Some(err);
                    }
                },
            }
        }

        if committed {
            self.after_edit();
        }
        failure.map_or(Ok(()), Err)
    }

    pub fn set_alignment(&mut self, path: &[usize], alignment: Alignment) -> Result<(), MediaError> {
        let controller = Self::controller_in(&mut self.bound, path)?;
        controller.set_alignment(alignment, &mut self.editor)?;
        self.after_edit();
        Ok(())
    }

    pub fn rotate(&mut self, path: &[usize]) -> Result<Rotation, MediaError> {
        let controller = Self::controller_in(&mut self.bound, path)?;
        let rotation = controller.rotate(&mut self.editor)?;
        self.after_edit();
        Ok(rotation)
    }

    /// Removes the media node at `path`. Deleting an unbound path is a no-op.
    pub fn delete(&mut self, path: &[usize]) -> Result<(), MediaError> {
        let Ok(controller) = Self::controller_in(&mut self.bound, path) else {
            return Ok(());
        };
        controller.delete(&mut self.editor)?;
        if let Some(mut bound) = self.bound.remove(path) {
            bound.renderer.on_destroy();
        }
        self.after_edit();
        Ok(())
    }

    /// Asset-failure callback for the node at `path`. Returns the notice the
    /// first failure of an image raises.
    pub fn report_load_failure(&mut self, path: &[usize]) -> Result<Option<Notice>, MediaError> {
        let controller = Self::controller_in(&mut self.bound, path)?;
        let notice = controller.report_load_failure();
        if let Some(notice) = &notice {
            self.notices.push(notice.clone());
        }
        Ok(notice)
    }

    pub fn insert_image(
        &mut self,
        src: &str,
        alt: Option<&str>,
        width: Option<u32>,
    ) -> Result<(), MediaError> {
        self.run_command(
            "image.insert",
            Some(json!({ "src": src, "alt": alt, "width": width })),
        )
    }

    pub fn insert_video(&mut self, src: &str, width: Option<u32>) -> Result<(), MediaError> {
        self.run_command("video.insert", Some(json!({ "src": src, "width": width })))
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), MediaError> {
        self.editor.run_command(id, args)?;
        self.after_edit();
        Ok(())
    }

    /// Pastes `payload` at the caret. Markup becomes structured blocks; any
    /// other text, or markup that fails to convert, is inserted literally.
    pub fn paste(&mut self, payload: &ClipboardPayload) -> Result<PasteOutcome, MediaError> {
        let decision = self.interceptor.try_intercept(payload);
        if let Some(fragment) = decision.fragment.filter(|_| decision.handled) {
            let blocks = fragment.len();
            match self.editor.insert_fragment(fragment) {
                Ok(()) => {
                    self.after_edit();
                    return Ok(PasteOutcome::Converted { blocks });
                }
                Err(err) => tracing::warn!(%err, "converted paste was rejected, pasting as text"),
            }
        }

        let Some(text) = payload.first_plain_text() else {
            return Ok(PasteOutcome::Ignored);
        };
        let text = normalize_line_endings(text);
        self.editor.insert_text(&text)?;
        self.after_edit();
        Ok(PasteOutcome::PlainText)
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.editor.undo();
        if undone {
            self.after_edit();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.editor.redo();
        if redone {
            self.after_edit();
        }
        redone
    }

    /// Destroys every bound renderer, releasing any live drag listeners.
    pub fn teardown(&mut self) {
        for (_, mut bound) in std::mem::take(&mut self.bound) {
            bound.renderer.on_destroy();
        }
    }
}

impl Drop for EditingSurface {
    fn drop(&mut self) {
        self.teardown();
    }
}
