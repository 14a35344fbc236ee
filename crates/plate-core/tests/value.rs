use plate_core::{Editor, Node, PlateValue, ValueError};

#[test]
fn value_round_trips_through_json() {
    let editor = Editor::with_core_plugins();
    let value = PlateValue::from(&editor);
    let json = value.to_json_pretty().unwrap();

    let parsed = PlateValue::from_json_str(&json).unwrap();
    assert_eq!(parsed.into_document().children, vec![Node::paragraph("")]);
}

#[test]
fn value_rejects_foreign_schema_and_future_version() {
    let foreign = r#"{ "schema": "other", "version": 1, "document": { "children": [] } }"#;
    assert!(matches!(
        PlateValue::from_json_str(foreign),
        Err(ValueError::UnsupportedSchema(s)) if s == "other"
    ));

    let future = r#"{ "version": 9, "document": { "children": [] } }"#;
    assert!(matches!(
        PlateValue::from_json_str(future),
        Err(ValueError::UnsupportedVersion(9))
    ));
}
