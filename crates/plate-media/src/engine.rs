use plate_core::{
    AttrPatch, CommandError, Editor, Node, Op, Transaction, insert_fragment_at_caret,
    insert_text_at_caret,
};

use crate::error::MediaError;

/// The document operations media controllers and the paste path need from
/// the editing engine.
pub trait DocumentCommands {
    /// Applies `patch` to the node at `path` as one history entry. Empty
    /// patches are a no-op.
    fn patch_node(&mut self, path: &[usize], patch: AttrPatch, source: &str)
    -> Result<(), MediaError>;

    /// Removes the node at `path`. A missing node is not an error.
    fn remove_node(&mut self, path: &[usize]) -> Result<(), MediaError>;

    /// Inserts structured blocks at the caret.
    fn insert_fragment(&mut self, fragment: Vec<Node>) -> Result<(), MediaError>;

    /// Inserts literal text at the caret.
    fn insert_text(&mut self, text: &str) -> Result<(), MediaError>;
}

impl DocumentCommands for Editor {
    fn patch_node(
        &mut self,
        path: &[usize],
        patch: AttrPatch,
        source: &str,
    ) -> Result<(), MediaError> {
        if patch.is_empty() {
            return Ok(());
        }
        let tx = Transaction::new(vec![Op::SetNodeAttrs {
            path: path.to_vec(),
            patch,
        }])
        .source(source);
        self.apply(tx)
            .map_err(|e| CommandError::new(format!("Failed to patch node: {e}")))?;
        Ok(())
    }

    fn remove_node(&mut self, path: &[usize]) -> Result<(), MediaError> {
        if self.doc().node(path).is_none() {
            tracing::debug!(?path, "remove skipped, node already gone");
            return Ok(());
        }
        let tx = Transaction::new(vec![Op::RemoveNode {
            path: path.to_vec(),
        }])
        .source("media.delete");
        self.apply(tx)
            .map_err(|e| CommandError::new(format!("Failed to remove node: {e}")))?;
        Ok(())
    }

    fn insert_fragment(&mut self, fragment: Vec<Node>) -> Result<(), MediaError> {
        let tx = insert_fragment_at_caret(self, fragment).map_err(CommandError::new)?;
        self.apply(tx.source("paste:fragment"))
            .map_err(|e| CommandError::new(format!("Failed to insert fragment: {e}")))?;
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), MediaError> {
        let tx = insert_text_at_caret(self, text).map_err(CommandError::new)?;
        self.apply(tx.source("paste:text"))
            .map_err(|e| CommandError::new(format!("Failed to insert text: {e}")))?;
        Ok(())
    }
}
