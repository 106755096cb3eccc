// tests/accessor_tests.rs

use serde_json::json;
use sprig::{AccessErrorKind, AccessOp, Accessor, Parser, Value};

fn doc(v: serde_json::Value) -> Value {
    Value::from(v)
}

fn json_of(v: &Value) -> serde_json::Value {
    v.to_json()
}

// ============================================================================
// Get
// ============================================================================

#[test]
fn test_get_field() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    assert_eq!(accessor.get(&doc(json!({"a": {"b": 7}}))), Value::Integer(7));
}

#[test]
fn test_get_is_best_effort() {
    let expr = Parser::parse("a.b.c").unwrap();
    let accessor = Accessor::new(&expr);
    assert_eq!(accessor.get(&doc(json!({"a": 5}))), Value::Null);
    assert_eq!(accessor.get(&doc(json!([1, 2]))), Value::Null);
}

#[test]
fn test_get_strict_reports_type_mismatch() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    let err = accessor.get_strict(&doc(json!({"a": 5}))).unwrap_err();
    assert_eq!(err.operation, AccessOp::Get);
    assert_eq!(err.path, "a.b");
    assert!(matches!(err.kind, AccessErrorKind::TypeMismatch { expected: "object", .. }));
}

#[test]
fn test_get_strict_allows_missing_leaf() {
    // A present parent with an absent field is structurally fine: null value
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    assert_eq!(accessor.get_strict(&doc(json!({"a": {}}))).unwrap(), Value::Null);
}

#[test]
fn test_one_accessor_many_documents() {
    let expr = Parser::parse("count").unwrap();
    let accessor = Accessor::new(&expr);
    assert_eq!(accessor.get(&doc(json!({"count": 1}))), Value::Integer(1));
    assert_eq!(accessor.get(&doc(json!({"count": 2}))), Value::Integer(2));
}

// ============================================================================
// is_valid_context
// ============================================================================

#[test]
fn test_is_valid_context() {
    let expr = Parser::parse("[0]").unwrap();
    let accessor = Accessor::new(&expr);
    assert!(accessor.is_valid_context(&doc(json!([1]))));
    assert!(!accessor.is_valid_context(&doc(json!([]))));
    assert!(!accessor.is_valid_context(&doc(json!({"a": 1}))));
}

#[test]
fn test_is_valid_context_ignores_null_values() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    // b absent but a is an object: valid
    assert!(accessor.is_valid_context(&doc(json!({"a": {}}))));
    assert!(accessor.is_valid_context(&doc(json!({"a": {"b": null}}))));
    assert!(!accessor.is_valid_context(&doc(json!({"a": 1}))));
    assert!(!accessor.is_valid_context(&doc(json!({}))));
}

// ============================================================================
// Set
// ============================================================================

#[test]
fn test_set_field() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {"b": 1}}));
    accessor.set(&mut data, Value::Integer(9));
    assert_eq!(json_of(&data), json!({"a": {"b": 9}}));
}

#[test]
fn test_set_creates_missing_leaf_field() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {}}));
    accessor.set(&mut data, Value::Integer(1));
    assert_eq!(json_of(&data), json!({"a": {"b": 1}}));
}

#[test]
fn test_set_missing_parent_is_a_noop_or_error() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);

    let mut data = doc(json!({"x": 1}));
    accessor.set(&mut data, Value::Integer(9));
    assert_eq!(json_of(&data), json!({"x": 1}));

    let err = accessor.set_strict(&mut data, Value::Integer(9)).unwrap_err();
    assert_eq!(err.operation, AccessOp::Set);
    assert_eq!(err.kind, AccessErrorKind::MissingParent);
    assert_eq!(err.path, "a");
}

#[test]
fn test_set_negative_index() {
    let expr = Parser::parse("[-1]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3]));
    accessor.set(&mut data, Value::Integer(9));
    assert_eq!(json_of(&data), json!([1, 2, 9]));
}

#[test]
fn test_set_by_id() {
    let expr = Parser::parse("['x']").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([{"id": "x", "v": 1}, {"id": "y", "v": 2}]));
    accessor.set(&mut data, doc(json!({"id": "x", "v": 99})));
    assert_eq!(
        json_of(&data),
        json!([{"id": "x", "v": 99}, {"id": "y", "v": 2}])
    );
}

#[test]
fn test_set_strict_missing_id() {
    let expr = Parser::parse("['zzz']").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([{"id": "x"}]));
    let err = accessor.set_strict(&mut data, Value::Null).unwrap_err();
    assert_eq!(err.kind, AccessErrorKind::MissingId("zzz".to_string()));
}

#[test]
fn test_set_through_projection() {
    let expr = Parser::parse("items[*].price").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"items": [{"price": 1}, {"price": 2}]}));
    accessor.set(&mut data, Value::Integer(0));
    assert_eq!(
        json_of(&data),
        json!({"items": [{"price": 0}, {"price": 0}]})
    );
}

#[test]
fn test_set_projection_without_continuation_refills_array() {
    let expr = Parser::parse("a[*]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": [1, 2, 3]}));
    accessor.set(&mut data, doc(json!([9, 9])));
    assert_eq!(json_of(&data), json!({"a": [9, 9]}));
}

#[test]
fn test_set_object_projection_overwrites_every_value() {
    let expr = Parser::parse("a.*").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {"x": 1, "y": 2}}));
    accessor.set(&mut data, Value::Integer(0));
    assert_eq!(json_of(&data), json!({"a": {"x": 0, "y": 0}}));
}

#[test]
fn test_set_flatten_replaces_with_coerced_array() {
    let expr = Parser::parse("a[]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": [[1], [2, 3]]}));
    accessor.set(&mut data, Value::Integer(5));
    assert_eq!(json_of(&data), json!({"a": [5]}));
}

#[test]
fn test_set_through_pipe() {
    let expr = Parser::parse("a | b").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {"b": 1}}));
    accessor.set(&mut data, Value::Integer(2));
    assert_eq!(json_of(&data), json!({"a": {"b": 2}}));
}

#[test]
fn test_set_not_writable() {
    let expr = Parser::parse("length(@)").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2]));

    accessor.set(&mut data, Value::Integer(0));
    assert_eq!(json_of(&data), json!([1, 2]));

    let err = accessor.set_strict(&mut data, Value::Integer(0)).unwrap_err();
    assert_eq!(err.kind, AccessErrorKind::NotWritable);
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_field() {
    let expr = Parser::parse("a.b").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {"b": 1, "c": 2}}));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"a": {"c": 2}}));
}

#[test]
fn test_delete_is_idempotent() {
    let expr = Parser::parse("a").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": 1, "b": 2}));
    accessor.delete(&mut data);
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"b": 2}));
}

#[test]
fn test_delete_index_splices() {
    let expr = Parser::parse("[1]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3]));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([1, 3]));
}

#[test]
fn test_delete_strict_out_of_range_index() {
    let expr = Parser::parse("[10]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3]));
    let err = accessor.delete_strict(&mut data).unwrap_err();
    assert_eq!(err.operation, AccessOp::Delete);
    assert_eq!(err.kind, AccessErrorKind::IndexOutOfBounds { index: 10, len: 3 });
}

#[test]
fn test_delete_by_id_then_get_yields_null() {
    let expr = Parser::parse("['x']").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([{"id": "x", "v": 1}]));

    assert_eq!(accessor.get(&data), doc(json!({"id": "x", "v": 1})));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([]));
    assert_eq!(accessor.get(&data), Value::Null);
}

#[test]
fn test_delete_through_projection() {
    let expr = Parser::parse("items[*].tmp").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"items": [{"tmp": 1, "keep": 2}, {"tmp": 3}]}));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"items": [{"keep": 2}, {}]}));
}

#[test]
fn test_delete_flatten_empties_array() {
    let expr = Parser::parse("a[]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": [[1], 2]}));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"a": []}));
}

// ============================================================================
// Filter and slice inversion
// ============================================================================

#[test]
fn test_filter_write_inversion() {
    let expr = Parser::parse("[?@ > `3`]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3, 4, 5]));

    assert_eq!(accessor.get(&data), doc(json!([4, 5])));

    accessor.set(&mut data, doc(json!([9])));
    assert_eq!(json_of(&data), json!([1, 2, 3, 9]));
    // The same selector now selects exactly the new values
    assert_eq!(accessor.get(&data), doc(json!([9])));
}

#[test]
fn test_filter_delete_keeps_complement() {
    let expr = Parser::parse("[?@ > `3`]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 5, 2, 4]));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([1, 2]));
    // Get after delete through the same selector is empty
    assert_eq!(accessor.get(&data), doc(json!([])));
}

#[test]
fn test_filter_delete_is_idempotent() {
    let expr = Parser::parse("[?@ > `3`]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 5, 2, 4]));
    accessor.delete(&mut data);
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([1, 2]));
}

#[test]
fn test_filter_inversion_on_field() {
    let expr = Parser::parse("nums[?@ == `2`]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"nums": [1, 2, 3, 2]}));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"nums": [1, 3]}));
}

#[test]
fn test_slice_write_inversion() {
    let expr = Parser::parse("[1:3]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3, 4]));

    assert_eq!(accessor.get(&data), doc(json!([2, 3])));
    accessor.set(&mut data, doc(json!([9])));
    assert_eq!(json_of(&data), json!([1, 4, 9]));
}

#[test]
fn test_slice_delete_keeps_complement() {
    let expr = Parser::parse("[1:3]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([1, 2, 3, 4]));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([1, 4]));
}

#[test]
fn test_filter_projection_set_writes_selected_elements() {
    let expr = Parser::parse("items[?on].v").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({
        "items": [
            {"on": true, "v": 1},
            {"on": false, "v": 2},
            {"on": true, "v": 3}
        ]
    }));
    accessor.set(&mut data, Value::Integer(0));
    assert_eq!(
        json_of(&data),
        json!({
            "items": [
                {"on": true, "v": 0},
                {"on": false, "v": 2},
                {"on": true, "v": 0}
            ]
        })
    );
}

#[test]
fn test_slice_projection_delete_writes_selected_elements() {
    let expr = Parser::parse("[0:2].tmp").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!([{"tmp": 1, "a": 1}, {"tmp": 2}, {"tmp": 3}]));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!([{"a": 1}, {}, {"tmp": 3}]));
}

// ============================================================================
// Root references in the write path
// ============================================================================

#[test]
fn test_root_is_writable_at_top_level() {
    let expr = Parser::parse("$.a").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": 1}));
    accessor.set(&mut data, Value::Integer(2));
    assert_eq!(json_of(&data), json!({"a": 2}));
}

#[test]
fn test_root_is_not_writable_inside_pipe_right() {
    let expr = Parser::parse("a | $.b").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"a": {"b": 1}, "b": 2}));
    let err = accessor.set_strict(&mut data, Value::Integer(9)).unwrap_err();
    assert_eq!(err.kind, AccessErrorKind::NotWritable);
}

#[test]
fn test_filter_condition_may_reference_root() {
    let expr = Parser::parse("items[?@ > $.limit]").unwrap();
    let accessor = Accessor::new(&expr);
    let mut data = doc(json!({"limit": 2, "items": [1, 2, 3, 4]}));
    accessor.delete(&mut data);
    assert_eq!(json_of(&data), json!({"limit": 2, "items": [1, 2]}));
}
