// tests/evaluator_tests.rs

use serde_json::json;
use sprig::{Error, EvalError, Value, search};

fn doc(v: serde_json::Value) -> Value {
    Value::from(v)
}

fn eval(selector: &str, v: serde_json::Value) -> Value {
    search(selector, &doc(v)).unwrap()
}

fn eval_err(selector: &str, v: serde_json::Value) -> EvalError {
    match search(selector, &doc(v)) {
        Err(Error::Eval(e)) => e,
        other => panic!("expected eval error, got {:?}", other),
    }
}

// ============================================================================
// Field, index, and id access
// ============================================================================

#[test]
fn test_field_access() {
    assert_eq!(eval("name", json!({"name": "John"})), doc(json!("John")));
    assert_eq!(eval("user.email", json!({"user": {"email": "a@b"}})), doc(json!("a@b")));
}

#[test]
fn test_field_access_on_non_object_yields_null() {
    assert_eq!(eval("a.b", json!({"a": 5})), Value::Null);
    assert_eq!(eval("a", json!([1, 2])), Value::Null);
    assert_eq!(eval("missing", json!({})), Value::Null);
}

#[test]
fn test_index_access() {
    assert_eq!(eval("[1]", json!(["a", "b", "c"])), doc(json!("b")));
    assert_eq!(eval("[-1]", json!(["a", "b", "c"])), doc(json!("c")));
}

#[test]
fn test_index_out_of_range_yields_null() {
    assert_eq!(eval("[5]", json!([1, 2])), Value::Null);
    assert_eq!(eval("[-5]", json!([1, 2])), Value::Null);
    assert_eq!(eval("[0]", json!({"a": 1})), Value::Null);
}

#[test]
fn test_id_access() {
    let data = json!([{"id": "x", "v": 1}, {"id": "y", "v": 2}]);
    assert_eq!(eval("['y'].v", data.clone()), Value::Integer(2));
    assert_eq!(eval("['zzz']", data), Value::Null);
    assert_eq!(eval("['x']", json!({"id": "x"})), Value::Null);
}

// ============================================================================
// Projections
// ============================================================================

#[test]
fn test_wildcard_projection_drops_nulls() {
    assert_eq!(
        eval("[*]", json!([1, null, 2])),
        doc(json!([1, 2]))
    );
}

#[test]
fn test_projection_sub_expression() {
    let data = json!({"people": [{"name": "a"}, {"age": 3}, {"name": "b"}]});
    // Elements without the field project to null and are dropped
    assert_eq!(eval("people[*].name", data), doc(json!(["a", "b"])));
}

#[test]
fn test_projection_over_non_array_yields_null() {
    assert_eq!(eval("a[*]", json!({"a": 5})), Value::Null);
    assert_eq!(eval("a[*]", json!({"a": {"b": 1}})), Value::Null);
}

#[test]
fn test_object_projection() {
    let mut values = match eval("a.*", json!({"a": {"x": 1, "y": 2, "z": null}})) {
        Value::Array(values) => values,
        other => panic!("expected array, got {:?}", other),
    };
    // Null values are dropped; object iteration order is unspecified
    values.sort_by_key(|v| v.as_int().unwrap());
    assert_eq!(values, vec![Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn test_object_projection_over_non_object_yields_null() {
    assert_eq!(eval("a.*", json!({"a": [1, 2]})), Value::Null);
}

#[test]
fn test_pipe_stops_projection() {
    let data = json!({"a": [{"b": 1}, {"b": 2}]});
    assert_eq!(eval("a[*].b | [0]", data), Value::Integer(1));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_filter() {
    assert_eq!(
        eval("[?@ > `2`]", json!([1, 2, 3, 4])),
        doc(json!([3, 4]))
    );
}

#[test]
fn test_filter_condition_truthiness() {
    // Numbers (including zero) are truthy; empty containers are not
    assert_eq!(
        eval("[?@]", json!([0, "", false, null, [], {}, 1, "a"])),
        doc(json!([0, 1, "a"]))
    );
}

#[test]
fn test_filter_on_non_array_yields_null() {
    assert_eq!(eval("a[?@]", json!({"a": {"b": 1}})), Value::Null);
}

#[test]
fn test_filter_keeps_original_elements() {
    let data = json!({"items": [{"v": 1, "keep": true}, {"v": 2}]});
    assert_eq!(
        eval("items[?keep].v", data),
        doc(json!([1]))
    );
}

// ============================================================================
// Slices
// ============================================================================

#[test]
fn test_slice_negative_start_equivalence() {
    let data = json!([10, 20, 30, 40, 50]);
    assert_eq!(eval("[-2:]", data.clone()), eval("[3:5]", data));
}

#[test]
fn test_slice_clamping() {
    assert_eq!(eval("[1:10]", json!([1, 2, 3])), doc(json!([2, 3])));
    assert_eq!(eval("[-10:2]", json!([1, 2, 3])), doc(json!([1, 2])));
}

#[test]
fn test_slice_negative_step() {
    assert_eq!(eval("[::-1]", json!([1, 2, 3])), doc(json!([3, 2, 1])));
    assert_eq!(eval("[::-2]", json!([1, 2, 3, 4, 5])), doc(json!([5, 3, 1])));
}

#[test]
fn test_slice_step() {
    assert_eq!(eval("[::2]", json!([1, 2, 3, 4, 5])), doc(json!([1, 3, 5])));
}

#[test]
fn test_slice_zero_step_is_an_error() {
    assert_eq!(eval_err("[::0]", json!([1, 2])), EvalError::ZeroSliceStep);
}

#[test]
fn test_slice_of_non_array_yields_null() {
    assert_eq!(eval("a[0:2]", json!({"a": "str"})), Value::Null);
}

// ============================================================================
// Flatten
// ============================================================================

#[test]
fn test_flatten_one_level() {
    assert_eq!(
        eval("[]", json!([[1, 2], 3, [4]])),
        doc(json!([1, 2, 3, 4]))
    );
    assert_eq!(
        eval("[]", json!([[1, [2]], 3])),
        doc(json!([1, [2], 3]))
    );
}

#[test]
fn test_flatten_non_array_yields_null() {
    assert_eq!(eval("a[]", json!({"a": 5})), Value::Null);
}

// ============================================================================
// Logic and truthiness
// ============================================================================

#[test]
fn test_and_or_return_operand_values() {
    assert_eq!(eval("a && b", json!({"a": 1, "b": 2})), Value::Integer(2));
    assert_eq!(eval("a && b", json!({"a": "", "b": 2})), doc(json!("")));
    assert_eq!(eval("a || b", json!({"a": "", "b": 2})), Value::Integer(2));
    assert_eq!(eval("a || b", json!({"a": 1, "b": 2})), Value::Integer(1));
}

#[test]
fn test_not() {
    assert_eq!(eval("!a", json!({"a": ""})), Value::Boolean(true));
    assert_eq!(eval("!a", json!({"a": 0})), Value::Boolean(false));
    assert_eq!(eval("!a", json!({"a": []})), Value::Boolean(true));
}

#[test]
fn test_ternary_evaluates_only_taken_branch() {
    // The untaken branch would divide by zero
    assert_eq!(
        eval("`1` ? `2` : `1` / `0`", json!({})),
        Value::Integer(2)
    );
    assert_eq!(
        eval("`` ? `1` / `0` : `3`", json!({})),
        Value::Integer(3)
    );
}

#[test]
fn test_ternary_pipe_precedence() {
    // (a ? b : c) | d, never a ? b : (c | d)
    let data = json!({"a": true, "b": {"d": 1}, "c": {"d": 2}});
    assert_eq!(eval("a ? b : c | d", data), Value::Integer(1));
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_equality_is_deep() {
    assert_eq!(eval("a == b", json!({"a": [1, {"x": 2}], "b": [1, {"x": 2}]})), Value::Boolean(true));
    assert_eq!(eval("a == b", json!({"a": [1], "b": [2]})), Value::Boolean(false));
}

#[test]
fn test_comparison_type_policy() {
    // Ordering on mixed types yields null, equality yields a boolean
    assert_eq!(eval("`1` < '1'", json!({})), Value::Null);
    assert_eq!(eval("`1` == '1'", json!({})), Value::Boolean(false));
    assert_eq!(eval("`1` == `1`", json!({})), Value::Boolean(true));
    assert_eq!(eval("`1` == `1.0`", json!({})), Value::Boolean(true));
}

#[test]
fn test_numeric_ordering() {
    assert_eq!(eval("`2` > `1`", json!({})), Value::Boolean(true));
    assert_eq!(eval("`1.5` <= `2`", json!({})), Value::Boolean(true));
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval("`2` + `3`", json!({})), Value::Integer(5));
    assert_eq!(eval("`10` / `2`", json!({})), Value::Integer(5));
    assert_eq!(eval("`10` / `4`", json!({})), Value::Float(2.5));
    assert_eq!(eval("`7` % `2`", json!({})), Value::Integer(1));
}

#[test]
fn test_floor_division() {
    assert_eq!(eval("`7` // `2`", json!({})), Value::Integer(3));
    assert_eq!(eval("`-7` // `2`", json!({})), Value::Integer(-4));
}

#[test]
fn test_mixed_arithmetic_preserves_whole_integers() {
    assert_eq!(eval("`2` * `1.5`", json!({})), Value::Integer(3));
    assert_eq!(eval("`1` + `2.5`", json!({})), Value::Float(3.5));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(eval_err("`1` / `0`", json!({})), EvalError::DivisionByZero);
    assert_eq!(eval_err("`1` // `0`", json!({})), EvalError::DivisionByZero);
}

#[test]
fn test_arithmetic_type_errors() {
    // Arithmetic errors on non-numbers even though ordering degrades to null
    assert!(matches!(
        eval_err("`1` + 'a'", json!({})),
        EvalError::TypeError(_)
    ));
    assert!(matches!(
        eval_err("a + b", json!({"a": [1], "b": [2]})),
        EvalError::TypeError(_)
    ));
}

#[test]
fn test_unary_arithmetic() {
    assert_eq!(eval("-a", json!({"a": 5})), Value::Integer(-5));
    assert_eq!(eval("+a", json!({"a": 5})), Value::Integer(5));
    assert!(matches!(
        eval_err("-a", json!({"a": "x"})),
        EvalError::TypeError(_)
    ));
}

// ============================================================================
// Pipes and multi-selects
// ============================================================================

#[test]
fn test_pipe_rebinds_context() {
    assert_eq!(
        eval("a | b", json!({"a": {"b": 42}, "b": 1})),
        Value::Integer(42)
    );
}

#[test]
fn test_multi_select_list() {
    assert_eq!(
        eval("[a, b.c]", json!({"a": 1, "b": {"c": 2}})),
        doc(json!([1, 2]))
    );
}

#[test]
fn test_multi_select_hash() {
    assert_eq!(
        eval("{x: a, y: `true`}", json!({"a": 1})),
        doc(json!({"x": 1, "y": true}))
    );
}

#[test]
fn test_multi_select_short_circuits_on_null_context() {
    assert_eq!(eval("missing | [a, b]", json!({})), Value::Null);
    assert_eq!(eval("missing | {x: a}", json!({})), Value::Null);
}

// ============================================================================
// Variables and let
// ============================================================================

#[test]
fn test_let_binding() {
    assert_eq!(
        eval("let({x: a}, &$x)", json!({"a": 42})),
        Value::Integer(42)
    );
    assert_eq!(
        eval("let({x: a, y: b}, &$x + $y)", json!({"a": 1, "b": 2})),
        Value::Integer(3)
    );
}

#[test]
fn test_let_bindings_evaluate_against_outer_context() {
    // The body runs against the same context; bindings capture values first
    assert_eq!(
        eval("let({x: a}, &b[?@ == $x])", json!({"a": 2, "b": [1, 2, 3]})),
        doc(json!([2]))
    );
}

#[test]
fn test_unbound_variable_is_an_error() {
    assert_eq!(
        eval_err("$nope", json!({})),
        EvalError::UndefinedVariable("nope".to_string())
    );
}

#[test]
fn test_expression_ref_outside_function_is_an_error() {
    assert!(matches!(eval_err("&a", json!({})), EvalError::TypeError(_)));
}

// ============================================================================
// Root references
// ============================================================================

#[test]
fn test_root_reference_inside_filter() {
    let data = json!({"limit": 2, "items": [1, 2, 3]});
    assert_eq!(eval("items[?@ <= $.limit]", data), doc(json!([1, 2])));
}

#[test]
fn test_root_survives_pipe() {
    assert_eq!(
        eval("a | $.b", json!({"a": {"b": 1}, "b": 99})),
        Value::Integer(99)
    );
}
