use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::{AttrPatch, Node, Selection};

/// Child indices from the document root down to a node.
pub type Path = Vec<usize>;

/// One primitive edit. Applying an op yields its inverse.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        #[serde(default)]
        path: Path,
        range: Range<usize>,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    SetNodeAttrs {
        #[serde(default)]
        path: Path,
        patch: AttrPatch,
    },
}

impl Op {
    pub fn path(&self) -> &[usize] {
        match self {
            Op::InsertText { path, .. }
            | Op::RemoveText { path, .. }
            | Op::InsertNode { path, .. }
            | Op::RemoveNode { path }
            | Op::SetNodeAttrs { path, .. } => path,
        }
    }

    /// Where the node at `path` lives once this op has been applied, or
    /// `None` when the op removes it (or one of its ancestors). Text and
    /// attribute ops never move nodes.
    pub fn rebase_path(&self, path: &[usize]) -> Option<Path> {
        let (insert, target) = match self {
            Op::InsertNode { path, .. } => (true, path.as_slice()),
            Op::RemoveNode { path } => (false, path.as_slice()),
            Op::InsertText { .. } | Op::RemoveText { .. } | Op::SetNodeAttrs { .. } => {
                return Some(path.to_vec());
            }
        };
        let Some((&index, parent)) = target.split_last() else {
            return Some(path.to_vec());
        };
        let depth = parent.len();
        if path.len() <= depth || path[..depth] != *parent {
            return Some(path.to_vec());
        }

        let mut rebased = path.to_vec();
        if insert {
            if rebased[depth] >= index {
                rebased[depth] += 1;
            }
        } else if rebased[depth] == index {
            return None;
        } else if rebased[depth] > index {
            rebased[depth] -= 1;
        }
        Some(rebased)
    }
}

/// Follows `path` through `ops` in order.
pub fn rebase_path_through<'a>(
    path: &[usize],
    ops: impl IntoIterator<Item = &'a Op>,
) -> Option<Path> {
    let mut current = path.to_vec();
    for op in ops {
        current = op.rebase_path(&current)?;
    }
    Some(current)
}

/// Provenance recorded with each history entry, e.g. `media.resize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_follows_sibling_inserts_and_removes() {
        let insert = Op::InsertNode {
            path: vec![1],
            node: Node::paragraph(""),
        };
        assert_eq!(insert.rebase_path(&[1]), Some(vec![2]));
        assert_eq!(insert.rebase_path(&[0]), Some(vec![0]));
        assert_eq!(insert.rebase_path(&[3, 0]), Some(vec![4, 0]));

        let remove = Op::RemoveNode { path: vec![1] };
        assert_eq!(remove.rebase_path(&[1]), None);
        assert_eq!(remove.rebase_path(&[1, 2]), None);
        assert_eq!(remove.rebase_path(&[2]), Some(vec![1]));
    }

    #[test]
    fn nested_ops_leave_other_branches_alone() {
        let insert = Op::InsertNode {
            path: vec![0, 0],
            node: Node::paragraph(""),
        };
        assert_eq!(insert.rebase_path(&[1, 0]), Some(vec![1, 0]));
        assert_eq!(insert.rebase_path(&[0]), Some(vec![0]));

        let ops = [
            Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            },
            Op::RemoveNode { path: vec![0] },
        ];
        assert_eq!(rebase_path_through(&[2], &ops), Some(vec![2]));
    }
}
