use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Attrs, Document, Editor, Node, Point, Selection};
use crate::ops::{Op, Path, Transaction};

#[derive(Debug, Clone)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<serde_json::Value>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: serde_json::Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl NodeSpec {
    pub fn text_block(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }
    }

    pub fn void_block(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugin_ids: Vec<&'static str>,
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        let mut registry = Self::default();
        registry.register_core();
        registry
    }

    fn register_core(&mut self) {
        // Core plugin ids and kinds are distinct, so registration cannot collide.
        let plugins: Vec<Box<dyn PlatePlugin>> = vec![
            Box::new(CoreBlocksPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(CoreCommandsPlugin),
        ];
        for plugin in plugins {
            if let Err(err) = self.register_plugin(plugin) {
                tracing::error!(%err, "core plugin registration failed");
            }
        }
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), String> {
        if self.plugin_ids.contains(&plugin.id()) {
            return Err(format!("Duplicate plugin id: {}", plugin.id()));
        }

        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        tracing::debug!(plugin = plugin.id(), "registered plugin");
        self.plugin_ids.push(plugin.id());
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            ops.extend(pass.run(doc, self));
        }
        ops
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(&doc.children, Vec::new()).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor = resolve_text_point(doc, &selection.anchor)
            .or_else(|| resolve_text_point(doc, &selection.focus))
            .unwrap_or_else(|| fallback.clone());
        let focus = resolve_text_point(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    pub fn is_void_kind(&self, kind: &str) -> bool {
        self.node_specs.get(kind).is_some_and(|spec| spec.is_void)
    }
}

fn first_text_point(children: &[Node], base: Path) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        let mut path = base.clone();
        path.push(ix);
        match node {
            Node::Text(_) => return Some(Point::new(path, 0)),
            Node::Element(el) => {
                if let Some(point) = first_text_point(&el.children, path) {
                    return Some(point);
                }
            }
            Node::Void(_) => {}
        }
    }
    None
}

fn last_text_point(node: &Node, path: Path) -> Option<Point> {
    match node {
        Node::Text(t) => Some(Point::new(path, t.text.len())),
        Node::Element(el) => el.children.iter().enumerate().rev().find_map(|(ix, child)| {
            let mut child_path = path.clone();
            child_path.push(ix);
            last_text_point(child, child_path)
        }),
        Node::Void(_) => None,
    }
}

/// Resolves `point` to the nearest existing text leaf, clamping indices and
/// the offset.
fn resolve_text_point(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() {
        return None;
    }

    let mut resolved: Path = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                let mut offset = point.offset.min(t.text.len());
                while offset > 0 && !t.text.is_char_boundary(offset) {
                    offset -= 1;
                }
                return Some(Point::new(resolved, offset));
            }
            Node::Element(el) => children = &el.children,
            Node::Void(_) => return None,
        }
    }

    first_text_point(children, resolved)
}

struct CoreBlocksPlugin;

impl PlatePlugin for CoreBlocksPlugin {
    fn id(&self) -> &'static str {
        "core.blocks"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::text_block("paragraph"),
            NodeSpec::text_block("heading"),
            NodeSpec::text_block("list_item"),
            NodeSpec::text_block("code_block"),
            NodeSpec {
                kind: "blockquote".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::BlockOnly,
            },
            NodeSpec::void_block("divider"),
        ]
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureTextBlockHasLeaf),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if !doc.children.is_empty() {
            return Vec::new();
        }
        vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph(""),
        }]
    }
}

struct EnsureTextBlockHasLeaf;

impl NormalizePass for EnsureTextBlockHasLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(children: &[Node], path: &mut Path, registry: &PluginRegistry, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                let inline_only = registry
                    .node_specs()
                    .get(&el.kind)
                    .is_some_and(|spec| spec.children == ChildConstraint::InlineOnly);
                if inline_only && el.children.is_empty() {
                    let mut leaf_path = path.clone();
                    leaf_path.push(0);
                    ops.push(Op::InsertNode {
                        path: leaf_path,
                        node: Node::text(""),
                    });
                } else {
                    walk(&el.children, path, registry, ops);
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct CoreCommandsPlugin;

impl PlatePlugin for CoreCommandsPlugin {
    fn id(&self) -> &'static str {
        "core.commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("text.insert", "Insert text", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CommandError::new("Missing args.text"))?
                    .to_string();
                let tx = insert_text_at_caret(editor, &text).map_err(CommandError::new)?;
                editor
                    .apply(tx)
                    .map_err(|e| CommandError::new(format!("Failed to insert text: {e}")))
            })
            .description("Insert literal text at the caret, replacing a selection inside one leaf.")
            .keywords(["text", "insert", "type"])
            .args_example(serde_json::json!({ "text": "hello" })),
            CommandSpec::new("fragment.insert", "Insert fragment", |editor, args| {
                let nodes = args
                    .as_ref()
                    .and_then(|v| v.get("nodes"))
                    .cloned()
                    .ok_or_else(|| CommandError::new("Missing args.nodes"))?;
                let nodes: Vec<Node> = serde_json::from_value(nodes)
                    .map_err(|e| CommandError::new(format!("Invalid args.nodes: {e}")))?;
                let tx = insert_fragment_at_caret(editor, nodes).map_err(CommandError::new)?;
                editor
                    .apply(tx)
                    .map_err(|e| CommandError::new(format!("Failed to insert fragment: {e}")))
            })
            .description("Insert block nodes after the caret's block.")
            .keywords(["fragment", "insert", "paste", "blocks"]),
            CommandSpec::new("node.remove", "Remove node", |editor, args| {
                let path = parse_path_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.path"))?;
                if editor.doc().node(&path).is_none() {
                    return Ok(());
                }
                editor
                    .apply(Transaction::new(vec![Op::RemoveNode { path }]).source("command:node.remove"))
                    .map_err(|e| CommandError::new(format!("Failed to remove node: {e}")))
            })
            .description("Remove the node at args.path; missing nodes are ignored.")
            .keywords(["delete", "remove", "node"])
            .args_example(serde_json::json!({ "path": [1] })),
        ]
    }
}

pub fn parse_path_arg(args: Option<&serde_json::Value>) -> Option<Path> {
    let arr = args?.get("path")?.as_array()?;
    arr.iter()
        .map(|v| v.as_u64().and_then(|n| usize::try_from(n).ok()))
        .collect()
}

/// Builds a transaction inserting literal `text` at the focus point.
pub fn insert_text_at_caret(editor: &Editor, text: &str) -> Result<Transaction, String> {
    let selection = editor.selection();
    let focus = &selection.focus;
    let Some(Node::Text(leaf)) = editor.doc().node(&focus.path) else {
        return Err("Caret is not inside a text leaf".into());
    };

    let mut offset = focus.offset.min(leaf.text.len());
    let mut ops = Vec::new();
    if !selection.is_collapsed() && selection.anchor.path == focus.path {
        let start = selection.anchor.offset.min(offset);
        let end = selection.anchor.offset.max(offset).min(leaf.text.len());
        ops.push(Op::RemoveText {
            path: focus.path.clone(),
            range: start..end,
        });
        offset = start;
    }
    ops.push(Op::InsertText {
        path: focus.path.clone(),
        offset,
        text: text.to_string(),
    });

    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(
            focus.path.clone(),
            offset + text.len(),
        )))
        .source("command:text.insert"))
}

/// Builds a transaction inserting `fragment` as sibling blocks after the
/// caret's block. An empty paragraph holding the caret is replaced. When the
/// fragment ends in a void node an empty paragraph follows it so the caret
/// has a home.
pub fn insert_fragment_at_caret(editor: &Editor, fragment: Vec<Node>) -> Result<Transaction, String> {
    if fragment.is_empty() {
        return Err("Empty fragment".into());
    }

    let doc = editor.doc();
    let focus_path = &editor.selection().focus.path;
    let block_path: Path = if focus_path.len() >= 2 {
        focus_path[..focus_path.len() - 1].to_vec()
    } else {
        Vec::new()
    };

    let mut ops = Vec::new();
    let (parent_path, mut insert_at) = match block_path.split_last() {
        None => (Vec::new(), doc.children.len()),
        Some((block_ix, parent)) => {
            let replace = doc.node(&block_path).is_some_and(|node| {
                node.kind() == Some("paragraph") && node.plain_text().is_empty()
            });
            if replace {
                ops.push(Op::RemoveNode {
                    path: block_path.clone(),
                });
                (parent.to_vec(), *block_ix)
            } else {
                (parent.to_vec(), block_ix + 1)
            }
        }
    };

    let mut caret: Option<Point> = None;
    let trailing_void = matches!(fragment.last(), Some(Node::Void(_)));
    for node in fragment {
        let mut path = parent_path.clone();
        path.push(insert_at);
        caret = last_text_point(&node, path.clone()).or(caret);
        ops.push(Op::InsertNode { path, node });
        insert_at += 1;
    }

    if trailing_void {
        let mut path = parent_path.clone();
        path.push(insert_at);
        let mut text_path = path.clone();
        text_path.push(0);
        caret = Some(Point::new(text_path, 0));
        ops.push(Op::InsertNode {
            path,
            node: Node::paragraph(""),
        });
    }

    let mut tx = Transaction::new(ops).source("command:fragment.insert");
    if let Some(caret) = caret {
        tx = tx.selection_after(Selection::collapsed(caret));
    }
    Ok(tx)
}

/// Attribute map helper used by node constructors.
pub fn attrs_from<I, K>(entries: I) -> Attrs
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
