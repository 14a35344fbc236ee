use plate_core::{Document, Node};
use plate_media::{
    Alignment, EditingSurface, MediaAttrs, MediaConfig, MediaKind, PointerEvent,
};
use serde_json::json;

fn surface_with_image() -> EditingSurface {
    let doc = Document::new(vec![
        Node::paragraph("intro"),
        MediaAttrs::new("https://e.com/a.png").into_node(MediaKind::Image),
        Node::paragraph(""),
    ]);
    EditingSurface::with_document(doc, MediaConfig::default()).unwrap()
}

fn width_at(surface: &EditingSurface, path: &[usize]) -> Option<serde_json::Value> {
    surface
        .editor()
        .doc()
        .node(path)
        .and_then(|n| n.attrs())
        .and_then(|a| a.get("width"))
        .cloned()
}

#[test]
fn mouse_drag_commits_final_clamped_width_once() {
    let mut surface = surface_with_image();
    let undo_before = surface.editor().undo_len();

    assert!(surface.pointer_down(&[1], &PointerEvent::mouse_down(500.0), 300).unwrap());
    assert_eq!(surface.input().active_count(), 2);

    for x in [560.0, 420.0, 200.0] {
        surface.pointer_event(&PointerEvent::mouse_move(x)).unwrap();
    }
    // Live widths stay out of the document until release.
    assert_eq!(width_at(&surface, &[1]), Some(json!(null)));
    assert_eq!(surface.controller(&[1]).unwrap().attrs().width, Some(100));

    surface.pointer_event(&PointerEvent::mouse_up(200.0)).unwrap();
    assert_eq!(width_at(&surface, &[1]), Some(json!(100)));
    assert_eq!(surface.editor().undo_len(), undo_before + 1);
    assert_eq!(surface.editor().last_undo_source(), Some("media.resize"));
    assert_eq!(surface.input().active_count(), 0);
}

#[test]
fn touch_drag_uses_first_contact() {
    let mut surface = surface_with_image();

    assert!(surface.pointer_down(&[1], &PointerEvent::touch_start(vec![100.0]), 300).unwrap());
    surface
        .pointer_event(&PointerEvent::touch_move(vec![180.0, 900.0]))
        .unwrap();
    surface.pointer_event(&PointerEvent::touch_end()).unwrap();

    assert_eq!(width_at(&surface, &[1]), Some(json!(380)));
}

#[test]
fn second_release_has_no_effect() {
    let mut surface = surface_with_image();
    surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(50.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(50.0)).unwrap();
    let undo_after_first = surface.editor().undo_len();

    surface.pointer_event(&PointerEvent::mouse_up(80.0)).unwrap();
    surface.pointer_event(&PointerEvent::touch_cancel()).unwrap();

    assert_eq!(surface.editor().undo_len(), undo_after_first);
    assert_eq!(width_at(&surface, &[1]), Some(json!(350)));
    assert_eq!(surface.input().detached_total(), 2);
}

#[test]
fn second_begin_while_live_is_ignored() {
    let mut surface = surface_with_image();
    assert!(surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap());
    assert!(!surface.pointer_down(&[1], &PointerEvent::mouse_down(90.0), 500).unwrap());

    surface.pointer_event(&PointerEvent::mouse_move(10.0)).unwrap();
    assert_eq!(surface.controller(&[1]).unwrap().attrs().width, Some(310));
    assert_eq!(surface.input().attached_total(), 2);
}

#[test]
fn readout_is_shown_only_while_dragging() {
    let mut surface = surface_with_image();
    surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(25.0)).unwrap();

    let (_, view) = &surface.render()[0];
    assert_eq!(view.readout.as_deref(), Some("325px"));

    surface.pointer_event(&PointerEvent::mouse_up(25.0)).unwrap();
    let (_, view) = &surface.render()[0];
    assert_eq!(view.readout, None);
    assert_eq!(view.width, Some(325));
}

#[test]
fn alignment_change_mid_drag_keeps_dragging() {
    let mut surface = surface_with_image();
    surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(40.0)).unwrap();

    surface.set_alignment(&[1], Alignment::Right).unwrap();
    let controller = surface.controller(&[1]).unwrap();
    assert!(controller.is_resizing());
    assert_eq!(controller.attrs().width, Some(340));
    assert_eq!(controller.attrs().alignment, Alignment::Right);

    surface.pointer_event(&PointerEvent::mouse_move(60.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(60.0)).unwrap();
    assert_eq!(width_at(&surface, &[1]), Some(json!(360)));
}

#[test]
fn deleting_mid_drag_releases_listeners() {
    let mut surface = surface_with_image();
    surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap();
    assert_eq!(surface.input().active_count(), 2);

    surface.delete(&[1]).unwrap();
    surface.delete(&[1]).unwrap();

    assert_eq!(surface.input().active_count(), 0);
    assert_eq!(surface.editor().doc().children.len(), 2);
    assert!(surface.bound_paths().is_empty());
}

#[test]
fn video_drag_respects_video_floor() {
    let doc = Document::new(vec![
        MediaAttrs::new("https://youtu.be/abc123")
            .width(Some(640))
            .into_node(MediaKind::Video),
        Node::paragraph(""),
    ]);
    let mut surface = EditingSurface::with_document(doc, MediaConfig::default()).unwrap();

    surface.pointer_down(&[0], &PointerEvent::mouse_down(700.0), 640).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(0.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(0.0)).unwrap();

    assert_eq!(width_at(&surface, &[0]), Some(json!(320)));
}

fn src_at(surface: &EditingSurface, path: &[usize]) -> Option<serde_json::Value> {
    surface
        .editor()
        .doc()
        .node(path)
        .and_then(|n| n.attrs())
        .and_then(|a| a.get("src"))
        .cloned()
}

#[test]
fn drag_follows_its_node_when_blocks_are_inserted_above() {
    let mut surface = surface_with_image();
    surface.pointer_down(&[1], &PointerEvent::mouse_down(0.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(50.0)).unwrap();

    surface.insert_image("https://e.com/b.png", None, None).unwrap();
    assert_eq!(src_at(&surface, &[3]), Some(json!("https://e.com/a.png")));
    assert!(surface.controller(&[3]).unwrap().is_resizing());
    assert!(!surface.controller(&[1]).unwrap().is_resizing());

    surface.pointer_event(&PointerEvent::mouse_move(80.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(80.0)).unwrap();

    assert_eq!(width_at(&surface, &[3]), Some(json!(380)));
    assert_eq!(width_at(&surface, &[1]), Some(json!(null)));
    assert_eq!(surface.input().active_count(), 0);
}

#[test]
fn undo_during_drag_keeps_the_binding() {
    let mut surface = surface_with_image();
    surface.insert_image("https://e.com/b.png", None, None).unwrap();
    assert_eq!(src_at(&surface, &[3]), Some(json!("https://e.com/a.png")));

    surface.pointer_down(&[3], &PointerEvent::mouse_down(0.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(20.0)).unwrap();
    assert!(surface.undo());

    assert_eq!(src_at(&surface, &[1]), Some(json!("https://e.com/a.png")));
    assert_eq!(surface.bound_paths(), vec![vec![1]]);
    assert!(surface.controller(&[1]).unwrap().is_resizing());

    surface.pointer_event(&PointerEvent::mouse_move(40.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(40.0)).unwrap();
    assert_eq!(width_at(&surface, &[1]), Some(json!(340)));
}

#[test]
fn release_at_start_point_restores_stored_width() {
    let doc = Document::new(vec![
        MediaAttrs::new("https://e.com/a.png")
            .width(Some(400))
            .into_node(MediaKind::Image),
        Node::paragraph(""),
    ]);
    let mut surface = EditingSurface::with_document(doc, MediaConfig::default()).unwrap();
    let undo_before = surface.editor().undo_len();

    surface.pointer_down(&[0], &PointerEvent::mouse_down(100.0), 300).unwrap();
    surface.pointer_event(&PointerEvent::mouse_move(150.0)).unwrap();
    assert_eq!(surface.controller(&[0]).unwrap().attrs().width, Some(350));
    surface.pointer_event(&PointerEvent::mouse_move(100.0)).unwrap();
    surface.pointer_event(&PointerEvent::mouse_up(100.0)).unwrap();

    assert_eq!(surface.controller(&[0]).unwrap().attrs().width, Some(400));
    assert_eq!(surface.render()[0].1.width, Some(400));
    assert_eq!(width_at(&surface, &[0]), Some(json!(400)));
    assert_eq!(surface.editor().undo_len(), undo_before);
}
