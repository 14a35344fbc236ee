use plate_core::{Attrs, Document, Editor, Node, PluginRegistry, Point, Selection};

fn heading(text: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), serde_json::json!(1));
    Node::element("heading", attrs, vec![Node::text(text)])
}

#[test]
fn fragment_replaces_empty_paragraph_under_caret() {
    let mut editor = Editor::with_core_plugins();

    editor
        .run_command(
            "fragment.insert",
            Some(serde_json::json!({
                "nodes": [heading("Title"), Node::paragraph("body")]
            })),
        )
        .unwrap();

    let children = &editor.doc().children;
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].kind(), Some("heading"));
    assert_eq!(children[1].plain_text(), "body");
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 4));
}

#[test]
fn fragment_goes_after_non_empty_block() {
    let doc = Document::new(vec![Node::paragraph("keep"), Node::paragraph("tail")]);
    let selection = Selection::collapsed(Point::new(vec![0, 0], 2));
    let mut editor = Editor::new(doc, selection, PluginRegistry::core());

    editor
        .run_command(
            "fragment.insert",
            Some(serde_json::json!({ "nodes": [Node::divider()] })),
        )
        .unwrap();

    let kinds: Vec<_> = editor.doc().children.iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![Some("paragraph"), Some("divider"), Some("paragraph"), Some("paragraph")]
    );
    assert_eq!(editor.doc().children[2].plain_text(), "");
    assert_eq!(editor.selection().focus, Point::new(vec![2, 0], 0));
}

#[test]
fn text_insert_replaces_selection_within_leaf() {
    let doc = Document::new(vec![Node::paragraph("hello world")]);
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 6),
        focus: Point::new(vec![0, 0], 11),
    };
    let mut editor = Editor::new(doc, selection, PluginRegistry::core());

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "there" })))
        .unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("hello there")]);
    assert_eq!(editor.selection().focus.offset, 11);
}

#[test]
fn node_remove_ignores_missing_path() {
    let mut editor = Editor::with_core_plugins();
    editor
        .run_command("node.remove", Some(serde_json::json!({ "path": [5] })))
        .unwrap();
    assert!(!editor.can_undo());

    let err = editor.run_command("node.remove", None).unwrap_err();
    assert!(err.message().contains("path"));
}
