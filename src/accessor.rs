//! Compiled read/write/delete access to the location a selector names.
//!
//! This is a second, structurally distinct interpreter over the same AST as
//! the evaluator: instead of producing a value, it produces (and mutates) a
//! location inside a caller-supplied document. Not every node names a
//! location. Pure combinators are read-only; filters and slices become
//! writable through inversion, where the complement of the selected
//! elements is used to rebuild the underlying array.
//!
//! Every operation comes in two modes sharing one navigation core:
//! best-effort ([`Accessor::get`]/[`Accessor::set`]/[`Accessor::delete`])
//! silently no-ops on structural mismatch, strict (`*_strict`) raises an
//! [`AccessError`] naming the failing sub-path, the attempted operation,
//! and a reason code.

use std::collections::HashSet;

use crate::ast::Expr;
use crate::display::to_selector;
use crate::evaluator::{
    Bindings, EvalError, Evaluator, field_of, flatten_once, has_id, resolve_index, slice_indices,
};
use crate::functions::{Builtins, FunctionProvider};
use crate::value::Value;

static BUILTINS: Builtins = Builtins;

/// The operation an accessor error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Get,
    Set,
    Delete,
}

impl AccessOp {
    fn as_str(self) -> &'static str {
        match self {
            AccessOp::Get => "get",
            AccessOp::Set => "set",
            AccessOp::Delete => "delete",
        }
    }
}

/// Reason codes for strict-mode accessor failures, branchable without
/// parsing messages.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessErrorKind {
    /// The node kind does not name a writable location
    NotWritable,

    /// An intermediate step of the path resolved to nothing
    MissingParent,

    /// A step resolved to a value of the wrong type
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An array index outside the container
    IndexOutOfBounds { index: i64, len: usize },

    /// No array element carries the requested id
    MissingId(String),

    /// Evaluating a condition, bound, or piped sub-expression failed
    Eval(EvalError),
}

/// A strict-mode accessor failure: which sub-path, which operation, why.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessError {
    /// The offending sub-path, rendered as selector text
    pub path: String,
    pub operation: AccessOp,
    pub kind: AccessErrorKind,
}

impl std::fmt::Display for AccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} {}: ", self.operation.as_str(), self.path)?;
        match &self.kind {
            AccessErrorKind::NotWritable => write!(f, "not a writable location"),
            AccessErrorKind::MissingParent => write!(f, "parent path does not exist"),
            AccessErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            AccessErrorKind::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds (length {})", index, len)
            }
            AccessErrorKind::MissingId(id) => write!(f, "no element with id '{}'", id),
            AccessErrorKind::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AccessError {}

/// Error policy: strict surfaces structural failures, lenient turns them
/// into silent no-ops. One navigation core serves both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Lenient,
    Strict,
}

impl Mode {
    fn fail<T: Default>(self, err: AccessError) -> Result<T, AccessError> {
        match self {
            Mode::Strict => Err(err),
            Mode::Lenient => Ok(T::default()),
        }
    }
}

/// Shared state for one bound operation: the function provider wired into
/// an evaluator, plus a read-only root for `$` references and condition
/// evaluation during writes.
struct OpCtx<'c> {
    root: &'c Value,
    evaluator: &'c Evaluator<'c>,
    bindings: &'c Bindings,
}

impl OpCtx<'_> {
    fn eval(&self, expr: &Expr, context: &Value) -> Result<Value, EvalError> {
        self.evaluator
            .evaluate_with(expr, context, self.root, self.bindings)
    }
}

fn err(expr: &Expr, op: AccessOp, kind: AccessErrorKind) -> AccessError {
    AccessError {
        path: to_selector(expr),
        operation: op,
        kind,
    }
}

fn type_mismatch(expr: &Expr, op: AccessOp, expected: &'static str, found: &Value) -> AccessError {
    err(
        expr,
        op,
        AccessErrorKind::TypeMismatch {
            expected,
            found: found.type_name(),
        },
    )
}

/// A compiled accessor for one selector, bindable to any number of
/// documents. Borrows the AST; cloning the compiled form is never needed to
/// reuse it.
pub struct Accessor<'e> {
    selector: &'e Expr,
    functions: &'e dyn FunctionProvider,
}

impl<'e> Accessor<'e> {
    /// Compile an accessor using the standard function library.
    pub fn new(selector: &'e Expr) -> Self {
        Self::with_functions(selector, &BUILTINS)
    }

    pub fn with_functions(selector: &'e Expr, functions: &'e dyn FunctionProvider) -> Self {
        Accessor {
            selector,
            functions,
        }
    }

    pub fn selector(&self) -> &Expr {
        self.selector
    }

    /// Best-effort read: evaluates the selector, null on any failure.
    pub fn get(&self, document: &Value) -> Value {
        let evaluator = Evaluator::new(self.functions);
        evaluator
            .evaluate(self.selector, document)
            .unwrap_or(Value::Null)
    }

    /// Strict read: structural failures surface as [`AccessError`]s rather
    /// than nulls. A present-but-null value is still `Ok(Null)`.
    pub fn get_strict(&self, document: &Value) -> Result<Value, AccessError> {
        let evaluator = Evaluator::new(self.functions);
        let bindings = Bindings::new();
        let ctx = OpCtx {
            root: document,
            evaluator: &evaluator,
            bindings: &bindings,
        };
        self.read(self.selector, document, &ctx)
    }

    /// Whether the selector structurally applies to this document: true
    /// exactly when a strict read would not fail, independent of whether
    /// the value itself is null.
    pub fn is_valid_context(&self, document: &Value) -> bool {
        self.get_strict(document).is_ok()
    }

    /// Best-effort write: silently no-ops where the path does not apply.
    pub fn set(&self, document: &mut Value, value: Value) {
        // Lenient mode reports no errors, so the result is always Ok.
        let _ = self.write(document, value, Mode::Lenient);
    }

    /// Strict write.
    pub fn set_strict(&self, document: &mut Value, value: Value) -> Result<(), AccessError> {
        self.write(document, value, Mode::Strict)
    }

    /// Best-effort delete: deleting an absent path is a no-op.
    pub fn delete(&self, document: &mut Value) {
        let _ = self.remove(document, Mode::Lenient);
    }

    /// Strict delete.
    pub fn delete_strict(&self, document: &mut Value) -> Result<(), AccessError> {
        self.remove(document, Mode::Strict)
    }

    fn write(&self, document: &mut Value, value: Value, mode: Mode) -> Result<(), AccessError> {
        // The write path evaluates conditions and pipe left sides read-only
        // against a snapshot taken before any mutation.
        let snapshot = document.clone();
        let evaluator = Evaluator::new(self.functions);
        let bindings = Bindings::new();
        let ctx = OpCtx {
            root: &snapshot,
            evaluator: &evaluator,
            bindings: &bindings,
        };
        self.set_in(self.selector, document, value, &ctx, mode, true)
    }

    fn remove(&self, document: &mut Value, mode: Mode) -> Result<(), AccessError> {
        let snapshot = document.clone();
        let evaluator = Evaluator::new(self.functions);
        let bindings = Bindings::new();
        let ctx = OpCtx {
            root: &snapshot,
            evaluator: &evaluator,
            bindings: &bindings,
        };
        self.delete_in(self.selector, document, &ctx, mode, true)
    }

    // ------------------------------------------------------------------
    // Strict read path
    // ------------------------------------------------------------------

    fn read(&self, expr: &Expr, context: &Value, ctx: &OpCtx<'_>) -> Result<Value, AccessError> {
        const OP: AccessOp = AccessOp::Get;
        match expr {
            Expr::Current => Ok(context.clone()),
            Expr::Root => Ok(ctx.root.clone()),
            Expr::Identifier(name) => match context {
                Value::Object(_) => Ok(field_of(context, name)),
                other => Err(type_mismatch(expr, OP, "object", other)),
            },
            Expr::FieldAccess { object, field } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Object(_) => Ok(field_of(&parent, field)),
                    other => Err(type_mismatch(expr, OP, "object", &other)),
                }
            }
            Expr::IndexAccess { object, index } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(arr) => match resolve_index(*index, arr.len()) {
                        Some(i) => Ok(arr[i].clone()),
                        None => Err(err(
                            expr,
                            OP,
                            AccessErrorKind::IndexOutOfBounds {
                                index: *index,
                                len: arr.len(),
                            },
                        )),
                    },
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::IdAccess { object, id } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(arr) => arr
                        .into_iter()
                        .find(|item| has_id(item, id))
                        .ok_or_else(|| err(expr, OP, AccessErrorKind::MissingId(id.clone()))),
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::Filter { object, condition } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(arr) => {
                        let keep = self
                            .filter_selection(&arr, condition, ctx)
                            .map_err(|e| err(expr, OP, AccessErrorKind::Eval(e)))?;
                        Ok(Value::Array(
                            arr.into_iter()
                                .zip(keep)
                                .filter_map(|(item, keep)| keep.then_some(item))
                                .collect(),
                        ))
                    }
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::Slice {
                object,
                start,
                end,
                step,
            } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(arr) => {
                        let indices = slice_indices(arr.len(), *start, *end, *step)
                            .map_err(|e| err(expr, OP, AccessErrorKind::Eval(e)))?;
                        Ok(Value::Array(
                            indices.into_iter().map(|i| arr[i].clone()).collect(),
                        ))
                    }
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::Flatten { object } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(arr) => Ok(Value::Array(flatten_once(arr))),
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::Project { object, projection } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Array(items) => self.read_projection(expr, items, projection, ctx),
                    other => Err(type_mismatch(expr, OP, "array", &other)),
                }
            }
            Expr::ObjectProject { object, projection } => {
                let parent = self.read(object, context, ctx)?;
                match parent {
                    Value::Object(map) => {
                        self.read_projection(expr, map.into_values().collect(), projection, ctx)
                    }
                    other => Err(type_mismatch(expr, OP, "object", &other)),
                }
            }
            Expr::Pipe { left, right } => {
                let intermediate = self.read(left, context, ctx)?;
                self.read(right, &intermediate, ctx)
            }
            // Pure combinators delegate to the evaluator; they cannot fail
            // structurally, only at runtime.
            other @ (Expr::Literal(_)
            | Expr::Not(_)
            | Expr::Compare { .. }
            | Expr::Arithmetic { .. }
            | Expr::UnaryArithmetic { .. }
            | Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Ternary { .. }
            | Expr::FunctionCall { .. }
            | Expr::ExpressionRef(_)
            | Expr::VariableRef(_)
            | Expr::Let { .. }
            | Expr::MultiSelectList(_)
            | Expr::MultiSelectHash(_)) => ctx
                .eval(other, context)
                .map_err(|e| err(other, OP, AccessErrorKind::Eval(e))),
        }
    }

    fn read_projection(
        &self,
        expr: &Expr,
        items: Vec<Value>,
        projection: &Option<Box<Expr>>,
        ctx: &OpCtx<'_>,
    ) -> Result<Value, AccessError> {
        let mut result = Vec::new();
        for item in items {
            let value = match projection {
                Some(p) => ctx
                    .eval(p, &item)
                    .map_err(|e| err(expr, AccessOp::Get, AccessErrorKind::Eval(e)))?,
                None => item,
            };
            if value != Value::Null {
                result.push(value);
            }
        }
        Ok(Value::Array(result))
    }

    // ------------------------------------------------------------------
    // Mutable navigation core
    // ------------------------------------------------------------------

    /// Resolve the location a navigable expression names. `Ok(None)` means
    /// the path does not apply and the caller should no-op (lenient mode
    /// turns every structural failure into `None`).
    fn resolve_mut<'v>(
        &self,
        expr: &Expr,
        doc: &'v mut Value,
        ctx: &OpCtx<'_>,
        op: AccessOp,
        mode: Mode,
        root_is_context: bool,
    ) -> Result<Option<&'v mut Value>, AccessError> {
        match expr {
            Expr::Current => Ok(Some(doc)),
            Expr::Root => {
                if root_is_context {
                    Ok(Some(doc))
                } else {
                    // Inside a pipe's right side the true root is no longer
                    // reachable as a location.
                    mode.fail(err(expr, op, AccessErrorKind::NotWritable))
                }
            }
            Expr::Identifier(name) => match doc {
                Value::Object(map) => match map.get_mut(name) {
                    Some(child) => Ok(Some(child)),
                    None => mode.fail(err(expr, op, AccessErrorKind::MissingParent)),
                },
                other => {
                    let e = type_mismatch(expr, op, "object", other);
                    mode.fail(e)
                }
            },
            Expr::FieldAccess { object, field } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(None);
                };
                match parent {
                    Value::Object(map) => match map.get_mut(field) {
                        Some(child) => Ok(Some(child)),
                        None => mode.fail(err(expr, op, AccessErrorKind::MissingParent)),
                    },
                    other => {
                        let e = type_mismatch(expr, op, "object", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IndexAccess { object, index } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(None);
                };
                match parent {
                    Value::Array(arr) => {
                        let len = arr.len();
                        match resolve_index(*index, len) {
                            Some(i) => Ok(Some(&mut arr[i])),
                            None => mode.fail(err(
                                expr,
                                op,
                                AccessErrorKind::IndexOutOfBounds { index: *index, len },
                            )),
                        }
                    }
                    other => {
                        let e = type_mismatch(expr, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IdAccess { object, id } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(None);
                };
                match parent {
                    Value::Array(arr) => {
                        match arr.iter().position(|item| has_id(item, id)) {
                            Some(i) => Ok(Some(&mut arr[i])),
                            None => {
                                mode.fail(err(expr, op, AccessErrorKind::MissingId(id.clone())))
                            }
                        }
                    }
                    other => {
                        let e = type_mismatch(expr, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Pipe { left, right } => {
                let Some(intermediate) =
                    self.resolve_mut(left, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(None);
                };
                self.resolve_mut(right, intermediate, ctx, op, mode, false)
            }
            Expr::Literal(_)
            | Expr::Project { .. }
            | Expr::ObjectProject { .. }
            | Expr::Filter { .. }
            | Expr::Slice { .. }
            | Expr::Flatten { .. }
            | Expr::Not(_)
            | Expr::Compare { .. }
            | Expr::Arithmetic { .. }
            | Expr::UnaryArithmetic { .. }
            | Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Ternary { .. }
            | Expr::FunctionCall { .. }
            | Expr::ExpressionRef(_)
            | Expr::VariableRef(_)
            | Expr::Let { .. }
            | Expr::MultiSelectList(_)
            | Expr::MultiSelectHash(_) => {
                mode.fail(err(expr, op, AccessErrorKind::NotWritable))
            }
        }
    }

    /// The mutable elements a projection writes through: every element for
    /// a plain base, the selected elements for a filter or slice, and the
    /// one-level-flattened elements for a flatten.
    fn elements_mut<'v>(
        &self,
        object: &Expr,
        doc: &'v mut Value,
        ctx: &OpCtx<'_>,
        op: AccessOp,
        mode: Mode,
        root_is_context: bool,
    ) -> Result<Vec<&'v mut Value>, AccessError> {
        match object {
            Expr::Filter {
                object: source,
                condition,
            } => {
                let Some(parent) =
                    self.resolve_mut(source, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(Vec::new());
                };
                match parent {
                    Value::Array(arr) => {
                        let keep = match self.filter_selection(arr, condition, ctx) {
                            Ok(keep) => keep,
                            Err(e) => {
                                return mode
                                    .fail(err(object, op, AccessErrorKind::Eval(e)));
                            }
                        };
                        Ok(arr
                            .iter_mut()
                            .zip(keep)
                            .filter_map(|(item, keep)| keep.then_some(item))
                            .collect())
                    }
                    other => {
                        let e = type_mismatch(object, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Slice {
                object: source,
                start,
                end,
                step,
            } => {
                let Some(parent) =
                    self.resolve_mut(source, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(Vec::new());
                };
                match parent {
                    Value::Array(arr) => {
                        let indices = match slice_indices(arr.len(), *start, *end, *step) {
                            Ok(indices) => indices,
                            Err(e) => {
                                return mode
                                    .fail(err(object, op, AccessErrorKind::Eval(e)));
                            }
                        };
                        let wanted: HashSet<usize> = indices.into_iter().collect();
                        Ok(arr
                            .iter_mut()
                            .enumerate()
                            .filter_map(|(i, item)| wanted.contains(&i).then_some(item))
                            .collect())
                    }
                    other => {
                        let e = type_mismatch(object, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Flatten { object: source } => {
                let Some(parent) =
                    self.resolve_mut(source, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(Vec::new());
                };
                match parent {
                    Value::Array(arr) => {
                        let mut targets = Vec::new();
                        for item in arr.iter_mut() {
                            match item {
                                Value::Array(inner) => targets.extend(inner.iter_mut()),
                                other => targets.push(other),
                            }
                        }
                        Ok(targets)
                    }
                    other => {
                        let e = type_mismatch(object, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
            _ => {
                let Some(parent) =
                    self.resolve_mut(object, doc, ctx, op, mode, root_is_context)?
                else {
                    return Ok(Vec::new());
                };
                match parent {
                    Value::Array(arr) => Ok(arr.iter_mut().collect()),
                    other => {
                        let e = type_mismatch(object, op, "array", other);
                        mode.fail(e)
                    }
                }
            }
        }
    }

    /// Evaluate a filter condition over every element, read-only.
    fn filter_selection(
        &self,
        items: &[Value],
        condition: &Expr,
        ctx: &OpCtx<'_>,
    ) -> Result<Vec<bool>, EvalError> {
        let mut keep = Vec::with_capacity(items.len());
        for item in items {
            let value = ctx.eval(condition, item)?;
            keep.push(!value.is_false_or_empty());
        }
        Ok(keep)
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    fn set_in(
        &self,
        expr: &Expr,
        doc: &mut Value,
        value: Value,
        ctx: &OpCtx<'_>,
        mode: Mode,
        root_is_context: bool,
    ) -> Result<(), AccessError> {
        const OP: AccessOp = AccessOp::Set;
        match expr {
            Expr::Identifier(name) => match doc {
                Value::Object(map) => {
                    map.insert(name.clone(), value);
                    Ok(())
                }
                other => {
                    let e = type_mismatch(expr, OP, "object", other);
                    mode.fail(e)
                }
            },
            Expr::FieldAccess { object, field } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Object(map) => {
                        map.insert(field.clone(), value);
                        Ok(())
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "object", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IndexAccess { object, index } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Array(arr) => {
                        let len = arr.len();
                        match resolve_index(*index, len) {
                            Some(i) => {
                                arr[i] = value;
                                Ok(())
                            }
                            None => mode.fail(err(
                                expr,
                                OP,
                                AccessErrorKind::IndexOutOfBounds { index: *index, len },
                            )),
                        }
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IdAccess { object, id } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Array(arr) => match arr.iter().position(|item| has_id(item, id)) {
                        Some(i) => {
                            arr[i] = value;
                            Ok(())
                        }
                        None => mode.fail(err(expr, OP, AccessErrorKind::MissingId(id.clone()))),
                    },
                    other => {
                        let e = type_mismatch(expr, OP, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Flatten { object } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                if matches!(&*parent, Value::Array(_)) {
                    *parent = Value::Array(coerce_to_array(value));
                    Ok(())
                } else {
                    let e = type_mismatch(expr, OP, "array", parent);
                    mode.fail(e)
                }
            }
            Expr::Project { object, projection } => match projection {
                // A projection with a continuation pushes the write down to
                // every element it selects.
                Some(p) => {
                    let targets =
                        self.elements_mut(object, doc, ctx, OP, mode, root_is_context)?;
                    for target in targets {
                        self.set_in(p, target, value.clone(), ctx, mode, false)?;
                    }
                    Ok(())
                }
                None => match object.as_ref() {
                    // `Project` wrapping a filter/slice/flatten without a
                    // continuation only arises in hand-built trees; the
                    // write belongs to the inner node.
                    inner @ (Expr::Filter { .. } | Expr::Slice { .. } | Expr::Flatten { .. }) => {
                        self.set_in(inner, doc, value, ctx, mode, root_is_context)
                    }
                    _ => {
                        let Some(parent) =
                            self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                        else {
                            return Ok(());
                        };
                        if matches!(&*parent, Value::Array(_)) {
                            *parent = Value::Array(coerce_to_array(value));
                            Ok(())
                        } else {
                            let e = type_mismatch(expr, OP, "array", parent);
                            mode.fail(e)
                        }
                    }
                },
            },
            Expr::ObjectProject { object, projection } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Object(map) => {
                        match projection {
                            Some(p) => {
                                for target in map.values_mut() {
                                    self.set_in(p, target, value.clone(), ctx, mode, false)?;
                                }
                            }
                            None => {
                                for target in map.values_mut() {
                                    *target = value.clone();
                                }
                            }
                        }
                        Ok(())
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "object", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Filter { object, condition } => {
                self.invert(expr, object, Some(condition), None, doc, ctx, OP, mode, root_is_context, Some(value))
            }
            Expr::Slice {
                object,
                start,
                end,
                step,
            } => self.invert(
                expr,
                object,
                None,
                Some((*start, *end, *step)),
                doc,
                ctx,
                OP,
                mode,
                root_is_context,
                Some(value),
            ),
            Expr::Pipe { left, right } => {
                let Some(intermediate) =
                    self.resolve_mut(left, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                self.set_in(right, intermediate, value, ctx, mode, false)
            }
            Expr::Current
            | Expr::Root
            | Expr::Literal(_)
            | Expr::Not(_)
            | Expr::Compare { .. }
            | Expr::Arithmetic { .. }
            | Expr::UnaryArithmetic { .. }
            | Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Ternary { .. }
            | Expr::FunctionCall { .. }
            | Expr::ExpressionRef(_)
            | Expr::VariableRef(_)
            | Expr::Let { .. }
            | Expr::MultiSelectList(_)
            | Expr::MultiSelectHash(_) => {
                mode.fail(err(expr, OP, AccessErrorKind::NotWritable))
            }
        }
    }

    fn delete_in(
        &self,
        expr: &Expr,
        doc: &mut Value,
        ctx: &OpCtx<'_>,
        mode: Mode,
        root_is_context: bool,
    ) -> Result<(), AccessError> {
        const OP: AccessOp = AccessOp::Delete;
        match expr {
            Expr::Identifier(name) => match doc {
                Value::Object(map) => {
                    // Removing an absent property is a no-op in both modes.
                    map.remove(name);
                    Ok(())
                }
                other => {
                    let e = type_mismatch(expr, OP, "object", other);
                    mode.fail(e)
                }
            },
            Expr::FieldAccess { object, field } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Object(map) => {
                        map.remove(field);
                        Ok(())
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "object", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IndexAccess { object, index } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Array(arr) => {
                        let len = arr.len();
                        match resolve_index(*index, len) {
                            Some(i) => {
                                arr.remove(i);
                                Ok(())
                            }
                            None => mode.fail(err(
                                expr,
                                OP,
                                AccessErrorKind::IndexOutOfBounds { index: *index, len },
                            )),
                        }
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::IdAccess { object, id } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Array(arr) => match arr.iter().position(|item| has_id(item, id)) {
                        Some(i) => {
                            arr.remove(i);
                            Ok(())
                        }
                        None => mode.fail(err(expr, OP, AccessErrorKind::MissingId(id.clone()))),
                    },
                    other => {
                        let e = type_mismatch(expr, OP, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Flatten { object } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Array(arr) => {
                        arr.clear();
                        Ok(())
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "array", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Project { object, projection } => match projection {
                Some(p) => {
                    let targets =
                        self.elements_mut(object, doc, ctx, OP, mode, root_is_context)?;
                    for target in targets {
                        self.delete_in(p, target, ctx, mode, false)?;
                    }
                    Ok(())
                }
                None => match object.as_ref() {
                    inner @ (Expr::Filter { .. } | Expr::Slice { .. } | Expr::Flatten { .. }) => {
                        self.delete_in(inner, doc, ctx, mode, root_is_context)
                    }
                    _ => {
                        let Some(parent) =
                            self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                        else {
                            return Ok(());
                        };
                        match parent {
                            Value::Array(arr) => {
                                arr.clear();
                                Ok(())
                            }
                            other => {
                                let e = type_mismatch(expr, OP, "array", other);
                                mode.fail(e)
                            }
                        }
                    }
                },
            },
            Expr::ObjectProject { object, projection } => {
                let Some(parent) = self.resolve_mut(object, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                match parent {
                    Value::Object(map) => {
                        match projection {
                            Some(p) => {
                                for target in map.values_mut() {
                                    self.delete_in(p, target, ctx, mode, false)?;
                                }
                            }
                            None => map.clear(),
                        }
                        Ok(())
                    }
                    other => {
                        let e = type_mismatch(expr, OP, "object", other);
                        mode.fail(e)
                    }
                }
            }
            Expr::Filter { object, condition } => self.invert(
                expr,
                object,
                Some(condition),
                None,
                doc,
                ctx,
                OP,
                mode,
                root_is_context,
                None,
            ),
            Expr::Slice {
                object,
                start,
                end,
                step,
            } => self.invert(
                expr,
                object,
                None,
                Some((*start, *end, *step)),
                doc,
                ctx,
                OP,
                mode,
                root_is_context,
                None,
            ),
            Expr::Pipe { left, right } => {
                let Some(intermediate) =
                    self.resolve_mut(left, doc, ctx, OP, mode, root_is_context)?
                else {
                    return Ok(());
                };
                self.delete_in(right, intermediate, ctx, mode, false)
            }
            Expr::Current
            | Expr::Root
            | Expr::Literal(_)
            | Expr::Not(_)
            | Expr::Compare { .. }
            | Expr::Arithmetic { .. }
            | Expr::UnaryArithmetic { .. }
            | Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Ternary { .. }
            | Expr::FunctionCall { .. }
            | Expr::ExpressionRef(_)
            | Expr::VariableRef(_)
            | Expr::Let { .. }
            | Expr::MultiSelectList(_)
            | Expr::MultiSelectHash(_) => {
                mode.fail(err(expr, OP, AccessErrorKind::NotWritable))
            }
        }
    }

    /// Inversion: rebuild a filtered or sliced container from the
    /// complement of the elements the read path would select. `set`
    /// appends the new value(s) to the complement; `delete` keeps the
    /// complement alone. The selection logic is shared with the read path,
    /// so a get after a delete through the same selector is empty.
    #[allow(clippy::too_many_arguments)]
    fn invert(
        &self,
        expr: &Expr,
        object: &Expr,
        condition: Option<&Expr>,
        slice: Option<(Option<i64>, Option<i64>, Option<i64>)>,
        doc: &mut Value,
        ctx: &OpCtx<'_>,
        op: AccessOp,
        mode: Mode,
        root_is_context: bool,
        replacement: Option<Value>,
    ) -> Result<(), AccessError> {
        let Some(parent) = self.resolve_mut(object, doc, ctx, op, mode, root_is_context)? else {
            return Ok(());
        };
        let result = {
            let arr = match &*parent {
                Value::Array(arr) => arr,
                other => {
                    let e = type_mismatch(expr, op, "array", other);
                    return mode.fail(e);
                }
            };

            let selected: Vec<bool> = if let Some(condition) = condition {
                match self.filter_selection(arr, condition, ctx) {
                    Ok(keep) => keep,
                    Err(e) => return mode.fail(err(expr, op, AccessErrorKind::Eval(e))),
                }
            } else {
                let (start, end, step) = slice.expect("filter or slice selection");
                let indices = match slice_indices(arr.len(), start, end, step) {
                    Ok(indices) => indices,
                    Err(e) => return mode.fail(err(expr, op, AccessErrorKind::Eval(e))),
                };
                let wanted: HashSet<usize> = indices.into_iter().collect();
                (0..arr.len()).map(|i| wanted.contains(&i)).collect()
            };

            // Complement in original order, then the new values if any.
            let mut result: Vec<Value> = arr
                .iter()
                .zip(&selected)
                .filter_map(|(item, selected)| (!selected).then(|| item.clone()))
                .collect();
            if let Some(replacement) = replacement {
                result.extend(coerce_to_array(replacement));
            }
            result
        };
        *parent = Value::Array(result);
        Ok(())
    }
}

fn coerce_to_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}
