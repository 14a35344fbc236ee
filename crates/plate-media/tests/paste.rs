use std::cell::RefCell;
use std::rc::Rc;

use plate_core::{Document, Node, Point, Selection};
use plate_media::{
    ClipboardEntry, ClipboardPayload, EditingSurface, MediaConfig, PasteInterceptor,
    PasteOutcome,
};

fn interceptor() -> PasteInterceptor {
    PasteInterceptor::new(&MediaConfig::default())
}

#[test]
fn heading_markup_is_converted() {
    let decision = interceptor().try_intercept(&ClipboardPayload::from_text("# Hello"));
    assert!(decision.handled);
    let fragment = decision.fragment.unwrap();
    assert_eq!(fragment.len(), 1);
    assert_eq!(fragment[0].kind(), Some("heading"));
    assert_eq!(fragment[0].plain_text(), "Hello");
}

#[test]
fn plain_sentence_is_not_handled() {
    let decision = interceptor().try_intercept(&ClipboardPayload::from_text("plain sentence."));
    assert!(!decision.handled);
    assert!(decision.fragment.is_none());
}

#[test]
fn bold_anywhere_is_handled() {
    let decision =
        interceptor().try_intercept(&ClipboardPayload::from_text("make this **bold** please"));
    assert!(decision.handled);
}

#[test]
fn payload_without_plain_text_is_not_handled() {
    let payload = ClipboardPayload::new(vec![
        ClipboardEntry::Html("<h1>x</h1>".into()),
        ClipboardEntry::File {
            name: "a.png".into(),
            mime: "image/png".into(),
        },
    ]);
    assert!(!interceptor().try_intercept(&payload).handled);
}

#[test]
fn nesting_past_limit_falls_through() {
    let config = MediaConfig {
        max_paste_nesting: 2,
        ..MediaConfig::default()
    };
    let decision = PasteInterceptor::new(&config)
        .try_intercept(&ClipboardPayload::from_text("> > > too deep"));
    assert!(!decision.handled);
}

#[test]
fn crlf_payload_converts_per_line() {
    let decision =
        interceptor().try_intercept(&ClipboardPayload::from_text("- one\r\n- two\r\n"));
    let fragment = decision.fragment.unwrap();
    assert_eq!(fragment.len(), 2);
    assert_eq!(fragment[1].plain_text(), "two");
}

#[test]
fn surface_inserts_converted_blocks_at_caret() {
    let mut surface = EditingSurface::new(MediaConfig::default()).unwrap();
    let outcome = surface
        .paste(&ClipboardPayload::from_text("# Title\n\nbody with ![cat](https://e.com/cat.png)"))
        .unwrap();

    assert_eq!(outcome, PasteOutcome::Converted { blocks: 3 });
    let kinds: Vec<Option<&str>> = surface
        .editor()
        .doc()
        .children
        .iter()
        .map(Node::kind)
        .collect();
    assert_eq!(
        kinds,
        vec![Some("heading"), Some("paragraph"), Some("image"), Some("paragraph")]
    );
    assert_eq!(surface.bound_paths(), vec![vec![2]]);
}

#[test]
fn plain_paste_inserts_literal_text() {
    let doc = Document::new(vec![Node::paragraph("ab")]);
    let mut surface = EditingSurface::with_document(doc, MediaConfig::default()).unwrap();
    surface.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1)));

    let outcome = surface
        .paste(&ClipboardPayload::from_text("plain\r\ntext"))
        .unwrap();
    assert_eq!(outcome, PasteOutcome::PlainText);
    assert_eq!(surface.editor().doc().children[0].plain_text(), "aplain\ntextb");
}

#[test]
fn empty_payload_is_ignored() {
    let mut surface = EditingSurface::new(MediaConfig::default()).unwrap();
    let outcome = surface.paste(&ClipboardPayload::default()).unwrap();
    assert_eq!(outcome, PasteOutcome::Ignored);
}

#[test]
fn subscribers_see_each_change() {
    let mut surface = EditingSurface::new(MediaConfig::default()).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    surface.subscribe(move |value| sink.borrow_mut().push(value.document.children.len()));

    surface.paste(&ClipboardPayload::from_text("hello")).unwrap();
    surface.paste(&ClipboardPayload::from_text("- a\n- b")).unwrap();

    assert_eq!(*seen.borrow(), vec![1, 3]);
}
