use plate_core::{
    AttrPatch, CommandError, CommandSpec, Document, Editor, Node, NodeSpec, NormalizePass, Op,
    PlatePlugin, PluginRegistry, Point, Selection, Transaction, parse_path_arg,
};
use serde_json::json;

use crate::config::MediaConfig;
use crate::media::{Alignment, MediaAttrs, MediaKind};

/// Registers the `image` and `video` void kinds, their attribute
/// normalization and the insert/align/rotate/delete commands.
pub struct MediaPlugin {
    config: MediaConfig,
}

impl MediaPlugin {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

impl PlatePlugin for MediaPlugin {
    fn id(&self) -> &'static str {
        "media"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::void_block(MediaKind::Image.tag()),
            NodeSpec::void_block(MediaKind::Video.tag()),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeMediaAttrs {
            image_floor: self.config.floor(MediaKind::Image),
            video_floor: self.config.floor(MediaKind::Video),
        })]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let image_floor = self.config.floor(MediaKind::Image);
        let video_floor = self.config.floor(MediaKind::Video);

        vec![
            CommandSpec::new("image.insert", "Insert image", move |editor, args| {
                let src = src_arg(args.as_ref())?;
                let alt = args
                    .as_ref()
                    .and_then(|v| v.get("alt"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let attrs = MediaAttrs::new(src)
                    .alt(alt)
                    .width(width_arg(args.as_ref()))
                    .normalized(MediaKind::Image, image_floor);
                insert_media(editor, MediaKind::Image, attrs)
            })
            .description("Insert a block image node (void) followed by an empty paragraph.")
            .keywords(["image", "img", "media", "void"])
            .args_example(json!({ "src": "https://example.com/image.png", "alt": "Alt text" })),
            CommandSpec::new("video.insert", "Insert video", move |editor, args| {
                let src = src_arg(args.as_ref())?;
                let attrs = MediaAttrs::new(src)
                    .width(width_arg(args.as_ref()))
                    .normalized(MediaKind::Video, video_floor);
                insert_media(editor, MediaKind::Video, attrs)
            })
            .description("Insert a block video embed (void) followed by an empty paragraph.")
            .keywords(["video", "youtube", "embed", "media"])
            .args_example(json!({ "src": "https://youtu.be/abc123", "width": 640 })),
            CommandSpec::new("media.set_align", "Align media", |editor, args| {
                let path = media_path_arg(editor, args.as_ref())?.0;
                let align = args
                    .as_ref()
                    .and_then(|v| v.get("align"))
                    .and_then(|v| v.as_str())
                    .and_then(Alignment::parse)
                    .ok_or_else(|| CommandError::new("Missing or invalid args.align"))?;
                set_media_attr(editor, path, "textAlign", json!(align.as_str()), "media.set_align")
            })
            .description("Set textAlign (left/center/right) on the media node at args.path.")
            .keywords(["align", "image", "video", "left", "center", "right"])
            .args_example(json!({ "path": [1], "align": "left" })),
            CommandSpec::new("media.rotate", "Rotate image", |editor, args| {
                let (path, kind) = media_path_arg(editor, args.as_ref())?;
                if !kind.supports_rotation() {
                    return Err(CommandError::new(format!("{kind} nodes cannot be rotated")));
                }
                let current = editor
                    .doc()
                    .node(&path)
                    .and_then(|node| node.attrs())
                    .map(MediaAttrs::from_attrs)
                    .map(|attrs| attrs.rotation)
                    .unwrap_or_default();
                let next = current.next();
                set_media_attr(editor, path, "rotation", json!(next.degrees()), "media.rotate")
            })
            .description("Rotate the image at args.path by a clockwise quarter turn.")
            .keywords(["rotate", "image", "turn"])
            .args_example(json!({ "path": [1] })),
            CommandSpec::new("media.delete", "Delete media", |editor, args| {
                let path = parse_path_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.path"))?;
                let is_media = editor
                    .doc()
                    .node(&path)
                    .and_then(|node| node.kind())
                    .and_then(MediaKind::from_tag)
                    .is_some();
                if !is_media {
                    return Ok(());
                }
                editor
                    .apply(Transaction::new(vec![Op::RemoveNode { path }]).source("media.delete"))
                    .map_err(|e| CommandError::new(format!("Failed to delete media: {e}")))
            })
            .description("Remove the media node at args.path; missing nodes are ignored.")
            .keywords(["delete", "remove", "image", "video"])
            .args_example(json!({ "path": [1] })),
        ]
    }
}

fn src_arg(args: Option<&serde_json::Value>) -> Result<String, CommandError> {
    args.and_then(|v| v.get("src"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| CommandError::new("Missing args.src"))
}

fn width_arg(args: Option<&serde_json::Value>) -> Option<u32> {
    args.and_then(|v| v.get("width"))
        .and_then(|v| v.as_u64())
        .filter(|&w| w > 0)
        .map(|w| u32::try_from(w).unwrap_or(u32::MAX))
}

fn media_path_arg(
    editor: &Editor,
    args: Option<&serde_json::Value>,
) -> Result<(Vec<usize>, MediaKind), CommandError> {
    let path = parse_path_arg(args).ok_or_else(|| CommandError::new("Missing args.path"))?;
    let kind = editor
        .doc()
        .node(&path)
        .and_then(|node| node.kind())
        .and_then(MediaKind::from_tag)
        .ok_or_else(|| CommandError::new(format!("No media node at {path:?}")))?;
    Ok((path, kind))
}

fn set_media_attr(
    editor: &mut Editor,
    path: Vec<usize>,
    key: &str,
    value: serde_json::Value,
    source: &str,
) -> Result<(), CommandError> {
    let patch = AttrPatch::set(key, value);
    editor
        .apply(Transaction::new(vec![Op::SetNodeAttrs { path, patch }]).source(source))
        .map_err(|e| CommandError::new(format!("Failed to update media: {e}")))
}

fn insert_media(editor: &mut Editor, kind: MediaKind, attrs: MediaAttrs) -> Result<(), CommandError> {
    let focus = editor.selection().focus.clone();
    let block_path = focus.path.split_last().map(|(_, p)| p).unwrap_or(&[]);

    let (parent_path, insert_at) = match block_path.split_last() {
        None => (Vec::new(), editor.doc().children.len()),
        Some((block_ix, parent)) => (parent.to_vec(), block_ix + 1),
    };

    let mut media_path = parent_path.clone();
    media_path.push(insert_at);
    let mut paragraph_path = parent_path;
    paragraph_path.push(insert_at + 1);
    let mut caret_path = paragraph_path.clone();
    caret_path.push(0);

    let tx = Transaction::new(vec![
        Op::InsertNode {
            path: media_path,
            node: attrs.into_node(kind),
        },
        Op::InsertNode {
            path: paragraph_path,
            node: Node::paragraph(""),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
    .source(format!("command:{}.insert", kind.tag()));

    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("Failed to insert {kind}: {e}")))
}

/// Brings every media node to the full persistence shape with its
/// invariants applied.
struct NormalizeMediaAttrs {
    image_floor: u32,
    video_floor: u32,
}

impl NormalizePass for NormalizeMediaAttrs {
    fn id(&self) -> &'static str {
        "media.normalize_attrs"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for (path, node) in doc.void_nodes() {
            let Some(kind) = MediaKind::from_tag(&node.kind) else {
                continue;
            };
            let floor = match kind {
                MediaKind::Image => self.image_floor,
                MediaKind::Video => self.video_floor,
            };
            let patch = MediaAttrs::from_attrs(&node.attrs)
                .normalized(kind, floor)
                .patch_from(&node.attrs);
            if !patch.is_empty() {
                ops.push(Op::SetNodeAttrs { path, patch });
            }
        }
        ops
    }
}
