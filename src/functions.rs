//! The named-function capability consumed by the evaluator and accessor.
//!
//! Functions are injected, not baked into the grammar: the evaluator hands
//! every `functionCall` node to a [`FunctionProvider`] along with the
//! evaluated arguments and a [`FunctionEnv`] that can re-enter the evaluator
//! for expression-reference arguments (higher-order functions such as
//! `sort_by`). [`Builtins`] is the default provider.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ast::Expr;
use crate::evaluator::{Bindings, EvalError, Evaluator};
use crate::value::Value;

/// One argument to a named function: either an evaluated value or an
/// unevaluated expression reference (`&expr`).
pub enum FunctionArg<'a> {
    Value(Value),
    Expression(&'a Expr),
}

impl FunctionArg<'_> {
    fn value(&self, function: &str) -> Result<&Value, EvalError> {
        match self {
            FunctionArg::Value(v) => Ok(v),
            FunctionArg::Expression(_) => Err(EvalError::InvalidArgument {
                function: function.to_string(),
                message: "expected a value, got an expression reference".to_string(),
            }),
        }
    }

    fn expression(&self, function: &str) -> Result<&Expr, EvalError> {
        match self {
            FunctionArg::Expression(e) => Ok(e),
            FunctionArg::Value(_) => Err(EvalError::InvalidArgument {
                function: function.to_string(),
                message: "expected an expression reference".to_string(),
            }),
        }
    }
}

/// Re-entry capability handed to function providers.
pub struct FunctionEnv<'e> {
    evaluator: &'e Evaluator<'e>,
    context: &'e Value,
    root: &'e Value,
    bindings: &'e Bindings,
}

impl<'e> FunctionEnv<'e> {
    pub(crate) fn new(
        evaluator: &'e Evaluator<'e>,
        context: &'e Value,
        root: &'e Value,
        bindings: &'e Bindings,
    ) -> Self {
        FunctionEnv {
            evaluator,
            context,
            root,
            bindings,
        }
    }

    /// Evaluate an expression reference against a value, in the scope of
    /// the enclosing call.
    pub fn apply(&self, expr: &Expr, value: &Value) -> Result<Value, EvalError> {
        self.evaluator
            .evaluate_with(expr, value, self.root, self.bindings)
    }

    /// The context the function call was evaluated in.
    pub fn context(&self) -> &Value {
        self.context
    }
}

/// A pluggable library of named functions.
pub trait FunctionProvider {
    fn call(
        &self,
        name: &str,
        args: &[FunctionArg<'_>],
        env: &FunctionEnv<'_>,
    ) -> Result<Value, EvalError>;
}

/// The standard function library.
#[derive(Default)]
pub struct Builtins;

impl Builtins {
    pub fn new() -> Self {
        Builtins
    }
}

impl FunctionProvider for Builtins {
    fn call(
        &self,
        name: &str,
        args: &[FunctionArg<'_>],
        env: &FunctionEnv<'_>,
    ) -> Result<Value, EvalError> {
        match name {
            "abs" => fn_abs(args),
            "avg" => fn_avg(args),
            "ceil" => fn_ceil(args),
            "contains" => fn_contains(args),
            "ends_with" => fn_ends_with(args),
            "floor" => fn_floor(args),
            "join" => fn_join(args),
            "keys" => fn_keys(args),
            "length" => fn_length(args),
            "map" => fn_map(args, env),
            "matches" => fn_matches(args),
            "max" => fn_max(args),
            "max_by" => fn_max_by(args, env),
            "merge" => fn_merge(args),
            "min" => fn_min(args),
            "min_by" => fn_min_by(args, env),
            "not_null" => fn_not_null(args),
            "reverse" => fn_reverse(args),
            "sort" => fn_sort(args),
            "sort_by" => fn_sort_by(args, env),
            "split" => fn_split(args),
            "starts_with" => fn_starts_with(args),
            "sum" => fn_sum(args),
            "to_array" => fn_to_array(args),
            "to_number" => fn_to_number(args),
            "to_string" => fn_to_string(args),
            "type" => fn_type(args),
            "values" => fn_values(args),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

fn exact_arity(function: &str, args: &[FunctionArg<'_>], n: usize) -> Result<(), EvalError> {
    if args.len() != n {
        return Err(EvalError::InvalidArity {
            function: function.to_string(),
            message: format!("expected {} argument(s), got {}", n, args.len()),
        });
    }
    Ok(())
}

fn array_arg<'a>(
    function: &str,
    args: &'a [FunctionArg<'_>],
    index: usize,
) -> Result<&'a Vec<Value>, EvalError> {
    match args[index].value(function)? {
        Value::Array(arr) => Ok(arr),
        other => Err(EvalError::InvalidArgument {
            function: function.to_string(),
            message: format!("expected an array, got {}", other.type_name()),
        }),
    }
}

fn string_arg<'a>(
    function: &str,
    args: &'a [FunctionArg<'_>],
    index: usize,
) -> Result<&'a str, EvalError> {
    match args[index].value(function)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::InvalidArgument {
            function: function.to_string(),
            message: format!("expected a string, got {}", other.type_name()),
        }),
    }
}

fn number_arg(function: &str, args: &[FunctionArg<'_>], index: usize) -> Result<Value, EvalError> {
    let value = args[index].value(function)?;
    if value.is_number() {
        Ok(value.clone())
    } else {
        Err(EvalError::InvalidArgument {
            function: function.to_string(),
            message: format!("expected a number, got {}", value.type_name()),
        })
    }
}

/// Ordering used by sort/min/max families: numbers before anything else,
/// then strings, then booleans; incomparable pairs rank equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Integer(a), Value::Float(b)) => {
            (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Value::Float(a), Value::Integer(b)) => {
            a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn fn_abs(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("abs", args, 1)?;
    match number_arg("abs", args, 0)? {
        Value::Integer(n) => Ok(Value::Integer(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        _ => unreachable!(),
    }
}

fn fn_ceil(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("ceil", args, 1)?;
    match number_arg("ceil", args, 0)? {
        Value::Integer(n) => Ok(Value::Integer(n)),
        Value::Float(n) => Ok(Value::Integer(n.ceil() as i64)),
        _ => unreachable!(),
    }
}

fn fn_floor(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("floor", args, 1)?;
    match number_arg("floor", args, 0)? {
        Value::Integer(n) => Ok(Value::Integer(n)),
        Value::Float(n) => Ok(Value::Integer(n.floor() as i64)),
        _ => unreachable!(),
    }
}

fn fn_length(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("length", args, 1)?;
    match args[0].value("length")? {
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(arr) => Ok(Value::Integer(arr.len() as i64)),
        Value::Object(obj) => Ok(Value::Integer(obj.len() as i64)),
        other => Err(EvalError::InvalidArgument {
            function: "length".to_string(),
            message: format!("expected a string, array, or object, got {}", other.type_name()),
        }),
    }
}

fn fn_keys(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("keys", args, 1)?;
    match args[0].value("keys")? {
        Value::Object(obj) => Ok(Value::Array(
            obj.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        other => Err(EvalError::InvalidArgument {
            function: "keys".to_string(),
            message: format!("expected an object, got {}", other.type_name()),
        }),
    }
}

fn fn_values(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("values", args, 1)?;
    match args[0].value("values")? {
        Value::Object(obj) => Ok(Value::Array(obj.values().cloned().collect())),
        other => Err(EvalError::InvalidArgument {
            function: "values".to_string(),
            message: format!("expected an object, got {}", other.type_name()),
        }),
    }
}

fn fn_contains(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("contains", args, 2)?;
    let needle = args[1].value("contains")?;
    match args[0].value("contains")? {
        Value::String(s) => match needle {
            Value::String(sub) => Ok(Value::Boolean(s.contains(sub))),
            other => Err(EvalError::InvalidArgument {
                function: "contains".to_string(),
                message: format!("cannot search a string for {}", other.type_name()),
            }),
        },
        Value::Array(arr) => Ok(Value::Boolean(arr.contains(needle))),
        other => Err(EvalError::InvalidArgument {
            function: "contains".to_string(),
            message: format!("expected a string or array, got {}", other.type_name()),
        }),
    }
}

fn fn_starts_with(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("starts_with", args, 2)?;
    let subject = string_arg("starts_with", args, 0)?;
    let prefix = string_arg("starts_with", args, 1)?;
    Ok(Value::Boolean(subject.starts_with(prefix)))
}

fn fn_ends_with(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("ends_with", args, 2)?;
    let subject = string_arg("ends_with", args, 0)?;
    let suffix = string_arg("ends_with", args, 1)?;
    Ok(Value::Boolean(subject.ends_with(suffix)))
}

fn fn_matches(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("matches", args, 2)?;
    let pattern = string_arg("matches", args, 1)?;
    let re = regex::Regex::new(pattern).map_err(|e| EvalError::InvalidArgument {
        function: "matches".to_string(),
        message: format!("invalid regex: {e}"),
    })?;
    match args[0].value("matches")? {
        Value::String(s) => Ok(Value::Boolean(re.is_match(s))),
        _ => Ok(Value::Boolean(false)),
    }
}

fn fn_split(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("split", args, 2)?;
    let subject = string_arg("split", args, 0)?;
    let delimiter = string_arg("split", args, 1)?;
    let parts: Vec<Value> = if delimiter.is_empty() {
        subject.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        subject
            .split(delimiter)
            .map(|p| Value::String(p.to_string()))
            .collect()
    };
    Ok(Value::Array(parts))
}

fn fn_join(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("join", args, 2)?;
    let glue = string_arg("join", args, 0)?;
    let parts = array_arg("join", args, 1)?;
    let mut strings = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Value::String(s) => strings.push(s.as_str()),
            other => {
                return Err(EvalError::InvalidArgument {
                    function: "join".to_string(),
                    message: format!("expected an array of strings, found {}", other.type_name()),
                });
            }
        }
    }
    Ok(Value::String(strings.join(glue)))
}

fn fn_sum(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("sum", args, 1)?;
    let arr = array_arg("sum", args, 0)?;

    let mut sum_int: i64 = 0;
    let mut sum_float: f64 = 0.0;
    let mut has_float = false;

    for item in arr {
        match item {
            Value::Integer(n) => {
                if has_float {
                    sum_float += *n as f64;
                } else {
                    sum_int += n;
                }
            }
            Value::Float(n) => {
                if !has_float {
                    sum_float = sum_int as f64;
                    has_float = true;
                }
                sum_float += n;
            }
            other => {
                return Err(EvalError::InvalidArgument {
                    function: "sum".to_string(),
                    message: format!("expected numbers, found {}", other.type_name()),
                });
            }
        }
    }

    if has_float {
        Ok(Value::Float(sum_float))
    } else {
        Ok(Value::Integer(sum_int))
    }
}

fn fn_avg(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("avg", args, 1)?;
    let arr = array_arg("avg", args, 0)?;
    if arr.is_empty() {
        return Ok(Value::Null);
    }

    let mut sum: f64 = 0.0;
    for item in arr {
        match item.as_float() {
            Some(n) => sum += n,
            None => {
                return Err(EvalError::InvalidArgument {
                    function: "avg".to_string(),
                    message: format!("expected numbers, found {}", item.type_name()),
                });
            }
        }
    }
    Ok(Value::Float(sum / arr.len() as f64))
}

fn min_max(function: &str, args: &[FunctionArg<'_>], want_max: bool) -> Result<Value, EvalError> {
    exact_arity(function, args, 1)?;
    let arr = array_arg(function, args, 0)?;
    if arr.is_empty() {
        return Ok(Value::Null);
    }
    let all_numbers = arr.iter().all(Value::is_number);
    let all_strings = arr.iter().all(|v| matches!(v, Value::String(_)));
    if !all_numbers && !all_strings {
        return Err(EvalError::InvalidArgument {
            function: function.to_string(),
            message: "expected an array of numbers or an array of strings".to_string(),
        });
    }

    let mut best = &arr[0];
    for item in &arr[1..] {
        let ordering = compare_values(item, best);
        if (want_max && ordering == Ordering::Greater) || (!want_max && ordering == Ordering::Less)
        {
            best = item;
        }
    }
    Ok(best.clone())
}

fn fn_min(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    min_max("min", args, false)
}

fn fn_max(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    min_max("max", args, true)
}

fn min_max_by(
    function: &str,
    args: &[FunctionArg<'_>],
    env: &FunctionEnv<'_>,
    want_max: bool,
) -> Result<Value, EvalError> {
    exact_arity(function, args, 2)?;
    let arr = array_arg(function, args, 0)?;
    let key_expr = args[1].expression(function)?;
    if arr.is_empty() {
        return Ok(Value::Null);
    }

    let mut best: Option<(&Value, Value)> = None;
    for item in arr {
        let key = env.apply(key_expr, item)?;
        if !key.is_number() && !matches!(key, Value::String(_)) {
            return Err(EvalError::InvalidArgument {
                function: function.to_string(),
                message: format!("key expression produced {}", key.type_name()),
            });
        }
        best = match best {
            None => Some((item, key)),
            Some((best_item, best_key)) => {
                let ordering = compare_values(&key, &best_key);
                if (want_max && ordering == Ordering::Greater)
                    || (!want_max && ordering == Ordering::Less)
                {
                    Some((item, key))
                } else {
                    Some((best_item, best_key))
                }
            }
        };
    }
    Ok(best.map(|(item, _)| item.clone()).unwrap_or(Value::Null))
}

fn fn_min_by(args: &[FunctionArg<'_>], env: &FunctionEnv<'_>) -> Result<Value, EvalError> {
    min_max_by("min_by", args, env, false)
}

fn fn_max_by(args: &[FunctionArg<'_>], env: &FunctionEnv<'_>) -> Result<Value, EvalError> {
    min_max_by("max_by", args, env, true)
}

fn fn_sort(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("sort", args, 1)?;
    let mut sorted = array_arg("sort", args, 0)?.clone();
    sorted.sort_by(compare_values);
    Ok(Value::Array(sorted))
}

fn fn_sort_by(args: &[FunctionArg<'_>], env: &FunctionEnv<'_>) -> Result<Value, EvalError> {
    exact_arity("sort_by", args, 2)?;
    let arr = array_arg("sort_by", args, 0)?;
    let key_expr = args[1].expression("sort_by")?;

    // Extract sort keys once, then sort the pairs
    let mut items_with_keys: Vec<(Value, Value)> = Vec::with_capacity(arr.len());
    for item in arr {
        let key = env.apply(key_expr, item)?;
        items_with_keys.push((item.clone(), key));
    }
    items_with_keys.sort_by(|(_, a), (_, b)| compare_values(a, b));

    Ok(Value::Array(
        items_with_keys.into_iter().map(|(v, _)| v).collect(),
    ))
}

fn fn_map(args: &[FunctionArg<'_>], env: &FunctionEnv<'_>) -> Result<Value, EvalError> {
    exact_arity("map", args, 2)?;
    let map_expr = args[0].expression("map")?;
    let arr = array_arg("map", args, 1)?;

    // Unlike a wildcard projection, map keeps null results.
    let mut result = Vec::with_capacity(arr.len());
    for item in arr {
        result.push(env.apply(map_expr, item)?);
    }
    Ok(Value::Array(result))
}

fn fn_merge(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::InvalidArity {
            function: "merge".to_string(),
            message: "expected at least one argument".to_string(),
        });
    }
    let mut merged: HashMap<String, Value> = HashMap::new();
    for arg in args {
        match arg.value("merge")? {
            Value::Object(obj) => {
                for (k, v) in obj {
                    merged.insert(k.clone(), v.clone());
                }
            }
            other => {
                return Err(EvalError::InvalidArgument {
                    function: "merge".to_string(),
                    message: format!("expected objects, got {}", other.type_name()),
                });
            }
        }
    }
    Ok(Value::Object(merged))
}

fn fn_not_null(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::InvalidArity {
            function: "not_null".to_string(),
            message: "expected at least one argument".to_string(),
        });
    }
    for arg in args {
        let value = arg.value("not_null")?;
        if *value != Value::Null {
            return Ok(value.clone());
        }
    }
    Ok(Value::Null)
}

fn fn_reverse(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("reverse", args, 1)?;
    match args[0].value("reverse")? {
        Value::Array(arr) => {
            let mut reversed = arr.clone();
            reversed.reverse();
            Ok(Value::Array(reversed))
        }
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        other => Err(EvalError::InvalidArgument {
            function: "reverse".to_string(),
            message: format!("expected an array or string, got {}", other.type_name()),
        }),
    }
}

fn fn_to_array(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("to_array", args, 1)?;
    match args[0].value("to_array")? {
        arr @ Value::Array(_) => Ok(arr.clone()),
        other => Ok(Value::Array(vec![other.clone()])),
    }
}

fn fn_to_number(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("to_number", args, 1)?;
    match args[0].value("to_number")? {
        n @ (Value::Integer(_) | Value::Float(_)) => Ok(n.clone()),
        Value::String(s) => {
            if let Ok(n) = s.parse::<i64>() {
                Ok(Value::Integer(n))
            } else if let Ok(n) = s.parse::<f64>() {
                Ok(Value::Float(n))
            } else {
                Ok(Value::Null)
            }
        }
        _ => Ok(Value::Null),
    }
}

fn fn_to_string(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("to_string", args, 1)?;
    match args[0].value("to_string")? {
        s @ Value::String(_) => Ok(s.clone()),
        other => Ok(Value::String(other.to_json().to_string())),
    }
}

fn fn_type(args: &[FunctionArg<'_>]) -> Result<Value, EvalError> {
    exact_arity("type", args, 1)?;
    Ok(Value::String(args[0].value("type")?.type_name().to_string()))
}
