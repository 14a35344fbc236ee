use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry};

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Void(_) | Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// All void nodes in document order, with their paths.
    pub fn void_nodes(&self) -> Vec<(Path, &VoidNode)> {
        fn walk<'a>(children: &'a [Node], path: &mut Path, out: &mut Vec<(Path, &'a VoidNode)>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Void(v) => out.push((path.clone(), v)),
                    Node::Element(el) => walk(&el.children, path, out),
                    Node::Text(_) => {}
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element("paragraph", Attrs::default(), vec![Node::text(text)])
    }

    pub fn divider() -> Self {
        Node::void("divider", Attrs::default())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn element(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children,
        })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Void(v) => Some(&v.kind),
            Node::Text(_) => None,
        }
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Void(v) => Some(&v.attrs),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of all leaves below this node.
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Element(el) => el.children.iter().map(Node::plain_text).collect(),
            Node::Void(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    op_log: Option<Vec<Op>>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            registry,
            config: config.with_defaults(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            op_log: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_core_plugins() -> Self {
        Self::empty(PluginRegistry::core())
    }

    /// An editor holding a single empty paragraph with the caret inside it.
    pub fn empty(registry: PluginRegistry) -> Self {
        let doc = Document::new(vec![Node::paragraph("")]);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, selection, registry)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// The source tag of the most recent undoable transaction.
    pub fn last_undo_source(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|r| r.source.as_deref())
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };
        let selection = record.selection_before.clone();
        let record = self.replay(record, selection);
        self.redo_stack.push(record);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };
        let selection = record.selection_after.clone();
        let record = self.replay(record, selection);
        self.undo_stack.push(record);
        true
    }

    fn replay(&mut self, record: UndoRecord, selection: Selection) -> UndoRecord {
        let mut inverse_ops: Vec<Op> = Vec::with_capacity(record.inverse_ops.len());
        for op in record.inverse_ops {
            match self.apply_op(op) {
                Ok(inv) => inverse_ops.push(inv),
                Err(err) => {
                    // Stop mutating once the history no longer matches the tree.
                    tracing::warn!(?err, "history replay stopped");
                    break;
                }
            }
        }
        inverse_ops.reverse();

        self.selection = selection;
        self.normalize_in_place();

        UndoRecord {
            inverse_ops,
            selection_before: record.selection_before,
            selection_after: record.selection_after,
            source: record.source,
        }
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection.clone();
        let source = tx.meta.source.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops {
            match self.apply_op(op) {
                Ok(inv) => inverse_ops.push(inv),
                Err(err) => {
                    self.rollback(inverse_ops, selection_before);
                    return Err(err);
                }
            }
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        let mut inverse_normalize = self.normalize_with_inverse_ops()?;
        inverse_ops.append(&mut inverse_normalize);
        inverse_ops.reverse();

        self.normalize_selection_in_place();

        tracing::trace!(source = source.as_deref(), ops = inverse_ops.len(), "applied transaction");

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
            source,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        Ok(())
    }

    fn rollback(&mut self, applied_inverse: Vec<Op>, selection: Selection) {
        for op in applied_inverse.into_iter().rev() {
            if self.apply_op(op).is_err() {
                break;
            }
        }
        self.selection = selection;
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    /// Decodes the attributes of the node at `path` into `T`.
    pub fn node_attrs<T>(&self, path: &[usize]) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let attrs = self.doc.node(path)?.attrs()?;
        let value = serde_json::to_value(attrs).ok()?;
        serde_json::from_value(value).ok()
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            tracing::warn!(?err, "normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self
            .registry
            .normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            for op in ops {
                let inv = self.apply_op(op)?;
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        let logged = self.op_log.is_some().then(|| op.clone());
        let inverse = apply_op_to(&mut self.doc, &mut self.selection, op)?;
        if let (Some(log), Some(op)) = (self.op_log.as_mut(), logged) {
            log.push(op);
        }
        Ok(inverse)
    }

    /// Starts recording every op that reaches the tree, including
    /// normalization, rollback and history replay.
    pub fn record_ops(&mut self) {
        self.op_log.get_or_insert_with(Vec::new);
    }

    /// Drains the ops recorded since the last call.
    pub fn take_applied_ops(&mut self) -> Vec<Op> {
        self.op_log.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed: String = text_node.text.drain(start..end).collect();
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            let (parent, index) = split_path(&path)?;
            let children = children_mut(doc, parent)?;
            if index > children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Insert index out of bounds: {index} > {}",
                    children.len()
                )));
            }
            children.insert(index, node);
            transform_selection_shift(selection, parent, index, true);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let (parent, index) = split_path(&path)?;
            let children = children_mut(doc, parent)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Remove index out of bounds: {index} >= {}",
                    children.len()
                )));
            }
            let removed = children.remove(index);
            transform_selection_shift(selection, parent, index, false);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeAttrs { path, patch } => {
            let old = match node_mut(doc, &path)? {
                Node::Element(el) => patch_apply(&mut el.attrs, &patch),
                Node::Void(v) => patch_apply(&mut v.attrs, &patch),
                Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no attrs".into())),
            };
            Ok(Op::SetNodeAttrs { path, patch: old })
        }
    }
}

#[derive(Debug)]
pub enum ApplyError {
    InvalidPath(String),
    NormalizeDidNotConverge,
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::InvalidPath(msg) => write!(f, "invalid path: {msg}"),
            ApplyError::NormalizeDidNotConverge => write!(f, "normalization did not converge"),
        }
    }
}

impl std::error::Error for ApplyError {}

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize), ApplyError> {
    match path.split_last() {
        Some((index, parent)) => Ok((parent, *index)),
        None => Err(ApplyError::InvalidPath("Empty path".into())),
    }
}

fn children_mut<'a>(doc: &'a mut Document, parent: &[usize]) -> Result<&'a mut Vec<Node>, ApplyError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in parent.iter().enumerate() {
        let len = children.len();
        children = match children.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(_) => {
                return Err(ApplyError::InvalidPath(format!(
                    "Non-container node at depth {depth}"
                )));
            }
            None => {
                return Err(ApplyError::InvalidPath(format!(
                    "Path out of bounds at depth {depth}: {ix} >= {len}"
                )));
            }
        };
    }
    Ok(children)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (parent, index) = split_path(path)?;
    let children = children_mut(doc, parent)?;
    let len = children.len();
    children.get_mut(index).ok_or_else(|| {
        ApplyError::InvalidPath(format!("Path out of bounds: {index} >= {len}"))
    })
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(ApplyError::InvalidPath("Expected Text node".into())),
    }
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset -= removed_len;
        } else {
            point.offset = range.start;
        }
    }
}

/// Shifts sibling indices after a node was inserted or removed at
/// `parent ++ [index]`. Points inside a removed subtree land on the previous
/// sibling and are resolved by selection normalization.
fn transform_selection_shift(selection: &mut Selection, parent: &[usize], index: usize, inserted: bool) {
    let depth = parent.len();
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent) {
            continue;
        }
        let ix = point.path[depth];
        if inserted {
            if ix >= index {
                point.path[depth] = ix + 1;
            }
        } else if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut patch = Self::default();
        patch.set.insert(key.into(), value);
        patch
    }

    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.set.insert(key.into(), value);
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old = AttrPatch::default();

    for (k, v) in &patch.set {
        match attrs.insert(k.clone(), v.clone()) {
            Some(prev) => {
                old.set.insert(k.clone(), prev);
            }
            None => old.remove.push(k.clone()),
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old.set.insert(key.clone(), prev);
        }
    }

    old
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_apply_returns_inverse() {
        let mut attrs = Attrs::new();
        attrs.insert("a".into(), serde_json::json!(1));

        let patch = AttrPatch::set("a", serde_json::json!(2))
            .with("b", serde_json::json!(true))
            .remove("missing");
        let inverse = patch_apply(&mut attrs, &patch);

        assert_eq!(attrs.get("a"), Some(&serde_json::json!(2)));
        assert_eq!(inverse.set.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(inverse.remove, vec!["b".to_string()]);

        patch_apply(&mut attrs, &inverse);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn clamp_respects_char_boundaries() {
        let s = "héllo";
        assert_eq!(clamp_to_char_boundary(s, 2), 1);
        assert_eq!(clamp_to_char_boundary(s, 99), s.len());
    }
}
