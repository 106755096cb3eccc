use std::collections::HashMap;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    ast::{ArithmeticOp, CompareOp, Expr, UnaryOp},
    functions::{FunctionArg, FunctionEnv, FunctionProvider},
    value::Value,
};

/// Named lexical bindings in scope during evaluation (`$name`).
pub type Bindings = HashMap<String, Value>;

/// Errors that can occur while evaluating a selector.
///
/// Type mismatches on access and ordering comparisons do NOT produce errors
/// (they evaluate to null); arithmetic on non-numbers does. That asymmetry
/// is part of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Invalid operand type for an operation that requires one
    TypeError(String),

    /// Division or floor division by zero
    DivisionByZero,

    /// Slice step of zero
    ZeroSliceStep,

    /// Reference to a `$name` with no binding in scope
    UndefinedVariable(String),

    /// Call to a function the provider does not know
    UnknownFunction(String),

    /// Call with the wrong number of arguments
    InvalidArity { function: String, message: String },

    /// Call with arguments of the wrong type
    InvalidArgument { function: String, message: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::ZeroSliceStep => write!(f, "Slice step cannot be zero"),
            EvalError::UndefinedVariable(name) => {
                write!(f, "Undefined variable: ${} is not bound", name)
            }
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}()", name),
            EvalError::InvalidArity { function, message } => {
                write!(f, "Invalid arity for {}(): {}", function, message)
            }
            EvalError::InvalidArgument { function, message } => {
                write!(f, "Invalid argument to {}(): {}", function, message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluation scope threaded through recursive evaluation: the root document
/// (`$`) and the lexical bindings. Pipes rebind the context; `let` rebinds
/// the bindings; nothing else changes mid-walk.
struct Scope<'a> {
    root: &'a Value,
    bindings: &'a Bindings,
}

/// The read-only tree-walk interpreter.
///
/// Stateless apart from the injected function provider: one evaluator can
/// serve any number of documents, and evaluation never mutates the tree,
/// the document, or the scope it was given.
pub struct Evaluator<'a> {
    functions: &'a dyn FunctionProvider,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a dyn FunctionProvider) -> Self {
        Evaluator { functions }
    }

    /// Evaluates a selector against a document, with the document as both
    /// the current context and the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprig::{Builtins, Evaluator, Parser, Value};
    ///
    /// let expr = Parser::parse("items[0].price").unwrap();
    /// let doc = Value::from_json_str(r#"{"items": [{"price": 12}]}"#).unwrap();
    ///
    /// let builtins = Builtins::new();
    /// let evaluator = Evaluator::new(&builtins);
    /// assert_eq!(evaluator.evaluate(&expr, &doc).unwrap(), Value::Integer(12));
    /// ```
    pub fn evaluate(&self, expr: &Expr, document: &Value) -> Result<Value, EvalError> {
        let bindings = Bindings::new();
        self.evaluate_with(expr, document, document, &bindings)
    }

    /// Evaluates with an explicit current context, root, and binding scope.
    pub fn evaluate_with(
        &self,
        expr: &Expr,
        context: &Value,
        root: &Value,
        bindings: &Bindings,
    ) -> Result<Value, EvalError> {
        self.eval(expr, context, &Scope { root, bindings })
    }

    fn eval(&self, expr: &Expr, context: &Value, scope: &Scope<'_>) -> Result<Value, EvalError> {
        match expr {
            Expr::Current => Ok(context.clone()),
            Expr::Root => Ok(scope.root.clone()),
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Identifier(name) => Ok(field_of(context, name)),
            Expr::FieldAccess { object, field } => {
                let object = self.eval(object, context, scope)?;
                Ok(field_of(&object, field))
            }
            Expr::IndexAccess { object, index } => {
                let object = self.eval(object, context, scope)?;
                match object {
                    Value::Array(arr) => Ok(match resolve_index(*index, arr.len()) {
                        Some(i) => arr[i].clone(),
                        None => Value::Null,
                    }),
                    _ => Ok(Value::Null),
                }
            }
            Expr::IdAccess { object, id } => {
                let object = self.eval(object, context, scope)?;
                match object {
                    Value::Array(arr) => Ok(arr
                        .into_iter()
                        .find(|item| has_id(item, id))
                        .unwrap_or(Value::Null)),
                    _ => Ok(Value::Null),
                }
            }

            Expr::Project { object, projection } => {
                let base = self.eval(object, context, scope)?;
                match base {
                    Value::Array(items) => self.project(items, projection.as_deref(), scope),
                    _ => Ok(Value::Null),
                }
            }
            Expr::ObjectProject { object, projection } => {
                let base = self.eval(object, context, scope)?;
                match base {
                    Value::Object(map) => {
                        self.project(map.into_values().collect(), projection.as_deref(), scope)
                    }
                    _ => Ok(Value::Null),
                }
            }
            Expr::Filter { object, condition } => {
                let base = self.eval(object, context, scope)?;
                match base {
                    Value::Array(items) => {
                        let mut result = Vec::new();
                        for item in items {
                            let keep = self.eval(condition, &item, scope)?;
                            if !keep.is_false_or_empty() {
                                result.push(item);
                            }
                        }
                        Ok(Value::Array(result))
                    }
                    _ => Ok(Value::Null),
                }
            }
            Expr::Slice {
                object,
                start,
                end,
                step,
            } => {
                let base = self.eval(object, context, scope)?;
                match base {
                    Value::Array(items) => {
                        let indices = slice_indices(items.len(), *start, *end, *step)?;
                        Ok(Value::Array(
                            indices.into_iter().map(|i| items[i].clone()).collect(),
                        ))
                    }
                    _ => Ok(Value::Null),
                }
            }
            Expr::Flatten { object } => {
                let base = self.eval(object, context, scope)?;
                match base {
                    Value::Array(items) => Ok(Value::Array(flatten_once(items))),
                    _ => Ok(Value::Null),
                }
            }

            Expr::Not(operand) => {
                let value = self.eval(operand, context, scope)?;
                Ok(Value::Boolean(value.is_false_or_empty()))
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval(left, context, scope)?;
                let right = self.eval(right, context, scope)?;
                Ok(compare(*op, &left, &right))
            }
            Expr::Arithmetic { op, left, right } => {
                let left = self.eval(left, context, scope)?;
                let right = self.eval(right, context, scope)?;
                arithmetic(*op, &left, &right)
            }
            Expr::UnaryArithmetic { op, operand } => {
                let value = self.eval(operand, context, scope)?;
                match (op, value) {
                    (UnaryOp::Negate, Value::Integer(n)) => Ok(Value::Integer(-n)),
                    (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
                    (UnaryOp::Plus, v @ (Value::Integer(_) | Value::Float(_))) => Ok(v),
                    (op, v) => Err(EvalError::TypeError(format!(
                        "Cannot apply unary '{}' to {}",
                        op.as_str(),
                        v.type_name()
                    ))),
                }
            }
            Expr::And { left, right } => {
                let left = self.eval(left, context, scope)?;
                if left.is_false_or_empty() {
                    Ok(left)
                } else {
                    self.eval(right, context, scope)
                }
            }
            Expr::Or { left, right } => {
                let left = self.eval(left, context, scope)?;
                if left.is_false_or_empty() {
                    self.eval(right, context, scope)
                } else {
                    Ok(left)
                }
            }
            Expr::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                let condition = self.eval(condition, context, scope)?;
                if condition.is_false_or_empty() {
                    self.eval(alternate, context, scope)
                } else {
                    self.eval(consequent, context, scope)
                }
            }
            Expr::Pipe { left, right } => {
                let intermediate = self.eval(left, context, scope)?;
                self.eval(right, &intermediate, scope)
            }

            Expr::FunctionCall { name, args } => {
                let mut call_args = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        Expr::ExpressionRef(inner) => {
                            call_args.push(FunctionArg::Expression(inner));
                        }
                        other => {
                            call_args.push(FunctionArg::Value(self.eval(other, context, scope)?));
                        }
                    }
                }
                let env = FunctionEnv::new(self, context, scope.root, scope.bindings);
                self.functions.call(name, &call_args, &env)
            }
            Expr::ExpressionRef(_) => Err(EvalError::TypeError(
                "expression reference has no value outside a function call".to_string(),
            )),

            Expr::VariableRef(name) => scope
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Let { bindings, body } => {
                // All bindings see the outer scope; they enter together at
                // the body.
                let mut extended = scope.bindings.clone();
                for (name, value_expr) in bindings {
                    let value = self.eval(value_expr, context, scope)?;
                    extended.insert(name.clone(), value);
                }
                self.eval(
                    body,
                    context,
                    &Scope {
                        root: scope.root,
                        bindings: &extended,
                    },
                )
            }

            Expr::MultiSelectList(expressions) => {
                if *context == Value::Null {
                    return Ok(Value::Null);
                }
                let mut result = Vec::with_capacity(expressions.len());
                for e in expressions {
                    result.push(self.eval(e, context, scope)?);
                }
                Ok(Value::Array(result))
            }
            Expr::MultiSelectHash(entries) => {
                if *context == Value::Null {
                    return Ok(Value::Null);
                }
                let mut result = HashMap::with_capacity(entries.len());
                for (key, e) in entries {
                    result.insert(key.clone(), self.eval(e, context, scope)?);
                }
                Ok(Value::Object(result))
            }
        }
    }

    /// Wildcard projection core: apply the sub-expression to each element
    /// and drop null results.
    fn project(
        &self,
        items: Vec<Value>,
        projection: Option<&Expr>,
        scope: &Scope<'_>,
    ) -> Result<Value, EvalError> {
        let mut result = Vec::new();
        for item in items {
            let value = match projection {
                Some(p) => self.eval(p, &item, scope)?,
                None => item,
            };
            if value != Value::Null {
                result.push(value);
            }
        }
        Ok(Value::Array(result))
    }
}

/// Field lookup with the language's null-on-mismatch policy.
pub(crate) fn field_of(value: &Value, field: &str) -> Value {
    match value {
        Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Resolve a possibly-negative array index; `None` when out of range.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        Some(resolved as usize)
    } else {
        None
    }
}

/// Whether an array element's `id` property equals the given id.
pub(crate) fn has_id(item: &Value, id: &str) -> bool {
    match item {
        Value::Object(map) => map.get("id") == Some(&Value::String(id.to_string())),
        _ => false,
    }
}

/// One-level flatten: nested arrays are spliced in, everything else is kept.
pub(crate) fn flatten_once(items: Vec<Value>) -> Vec<Value> {
    let mut result = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => result.extend(inner),
            other => result.push(other),
        }
    }
    result
}

/// The element indices a slice selects, in traversal order.
///
/// Step defaults to 1 and must not be zero. Missing bounds default to the
/// natural traversal bound for the step's sign; out-of-range bounds clamp.
pub(crate) fn slice_indices(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::ZeroSliceStep);
    }
    let len = len as i64;

    let clamp = |bound: i64| -> i64 {
        let bound = if bound < 0 { bound + len } else { bound };
        if bound < 0 {
            if step > 0 { 0 } else { -1 }
        } else if bound >= len {
            if step > 0 { len } else { len - 1 }
        } else {
            bound
        }
    };

    let start = match start {
        Some(s) => clamp(s),
        None => {
            if step > 0 {
                0
            } else {
                len - 1
            }
        }
    };
    let end = match end {
        Some(e) => clamp(e),
        None => {
            if step > 0 {
                len
            } else {
                -1
            }
        }
    };

    let mut indices = Vec::new();
    let mut i = start;
    while if step > 0 { i < end } else { i > end } {
        indices.push(i as usize);
        i += step;
    }
    Ok(indices)
}

/// Comparison with the language's type policy: equality is deep and total,
/// ordering requires numbers and otherwise yields null.
pub(crate) fn compare(op: CompareOp, left: &Value, right: &Value) -> Value {
    match op {
        CompareOp::Equal => Value::Boolean(left == right),
        CompareOp::NotEqual => Value::Boolean(left != right),
        _ => {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Value::Null;
            };
            let result = match op {
                CompareOp::LessThan => a < b,
                CompareOp::LessEqual => a <= b,
                CompareOp::GreaterThan => a > b,
                CompareOp::GreaterEqual => a >= b,
                CompareOp::Equal | CompareOp::NotEqual => unreachable!(),
            };
            Value::Boolean(result)
        }
    }
}

/// Binary arithmetic. Mixed integer/float operands go through decimal
/// arithmetic so whole results stay integers.
pub(crate) fn arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if !left.is_number() || !right.is_number() {
        return Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.as_str(),
            left.type_name(),
            right.type_name()
        )));
    }

    if matches!(op, ArithmeticOp::Divide | ArithmeticOp::IntegerDivide | ArithmeticOp::Modulo)
        && right.as_float() == Some(0.0)
    {
        return Err(EvalError::DivisionByZero);
    }

    if op == ArithmeticOp::IntegerDivide {
        let (a, b) = (left.as_float().unwrap(), right.as_float().unwrap());
        return Ok(Value::Integer((a / b).floor() as i64));
    }

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(match op {
            ArithmeticOp::Add => Value::Integer(a + b),
            ArithmeticOp::Subtract => Value::Integer(a - b),
            ArithmeticOp::Multiply => Value::Integer(a * b),
            ArithmeticOp::Divide => {
                // Exact division stays an integer
                if a % b == 0 {
                    Value::Integer(a / b)
                } else {
                    Value::Float(*a as f64 / *b as f64)
                }
            }
            ArithmeticOp::Modulo => Value::Integer(a % b),
            ArithmeticOp::IntegerDivide => unreachable!(),
        }),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide => a / b,
            ArithmeticOp::Modulo => a % b,
            ArithmeticOp::IntegerDivide => unreachable!(),
        })),
        (a, b) => {
            // Mixed operands: decimal arithmetic preserves integer results
            // when they are mathematically whole.
            if let Some(ad) = decimal_of(a)
                && let Some(bd) = decimal_of(b)
            {
                let rd = match op {
                    ArithmeticOp::Add => ad + bd,
                    ArithmeticOp::Subtract => ad - bd,
                    ArithmeticOp::Multiply => ad * bd,
                    ArithmeticOp::Divide => ad / bd,
                    ArithmeticOp::Modulo => ad % bd,
                    ArithmeticOp::IntegerDivide => unreachable!(),
                };
                if rd.is_integer()
                    && let Some(n) = rd.to_i64()
                {
                    return Ok(Value::Integer(n));
                } else if let Some(n) = rd.to_f64() {
                    return Ok(Value::Float(n));
                }
            }
            let (a, b) = (a.as_float().unwrap(), b.as_float().unwrap());
            Ok(Value::Float(match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => a / b,
                ArithmeticOp::Modulo => a % b,
                ArithmeticOp::IntegerDivide => unreachable!(),
            }))
        }
    }
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}
