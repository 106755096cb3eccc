use crate::ast::{ArithmeticOp, CompareOp, UnaryOp};
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed selector expression.
///
/// The tree is acyclic and immutable after parsing: each variant holds only
/// child nodes and literal parameters. The parser owns and returns the tree;
/// the evaluator and the accessor compiler borrow it and never mutate it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Current context (`@`), explicit or implicit
    Current,

    /// Root document reference (`$`)
    Root,

    /// Constant value, from a backtick JSON literal, raw string, or keyword
    Literal(Value),

    /// Bare field name looked up on the current context
    Identifier(String),

    /// Field access on a sub-expression
    ///
    /// # Examples
    /// ```text
    /// foo.bar
    /// @.name
    /// ```
    FieldAccess {
        object: Box<Expr>,
        field: String,
    },

    /// Array index access (`[n]`, negative counts from the end)
    IndexAccess {
        object: Box<Expr>,
        index: i64,
    },

    /// Find-by-id access (`['abc']`)
    ///
    /// Scans an array for the element whose `id` property equals the given
    /// string.
    IdAccess {
        object: Box<Expr>,
        id: String,
    },

    /// Array wildcard projection (`[*]`)
    ///
    /// Applies the optional sub-expression to each element and drops null
    /// results. Also wraps filters, slices, and flattens when a continuation
    /// follows them.
    Project {
        object: Box<Expr>,
        projection: Option<Box<Expr>>,
    },

    /// Object value wildcard projection (`.*`)
    ObjectProject {
        object: Box<Expr>,
        projection: Option<Box<Expr>>,
    },

    /// Filter (`[?condition]`)
    ///
    /// Keeps array elements whose condition is not false-or-empty.
    Filter {
        object: Box<Expr>,
        condition: Box<Expr>,
    },

    /// Python-style slice (`[start:end:step]`)
    Slice {
        object: Box<Expr>,
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },

    /// One-level array flatten (`[]`)
    Flatten {
        object: Box<Expr>,
    },

    /// Logical NOT (`!expr`)
    Not(Box<Expr>),

    /// Comparison (`==`, `!=`, `<`, `<=`, `>`, `>=`)
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Binary arithmetic (`+`, `-`, `*`, `/`, `//`, `%`)
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary arithmetic (`-expr`, `+expr`)
    UnaryArithmetic {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Logical AND (`&&`) - short-circuits and returns an operand value
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Logical OR (`||`) - short-circuits and returns an operand value
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Ternary conditional (`cond ? then : else`), right-associative
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// Pipe (`left | right`)
    ///
    /// Evaluates the right side with the left side's result as the new
    /// context, terminating any open projection.
    Pipe {
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Named function invocation
    ///
    /// # Examples
    /// ```text
    /// length(@)
    /// sort_by(people, &age)
    /// ```
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    /// Unevaluated expression (`&expr`) passed to higher-order functions
    ExpressionRef(Box<Expr>),

    /// Lexically-scoped variable reference (`$name`)
    VariableRef(String),

    /// Lexical binding (`let $a = expr, $b = expr in body`)
    ///
    /// Bindings are evaluated against the current context before the body
    /// enters scope.
    Let {
        bindings: Vec<(String, Expr)>,
        body: Box<Expr>,
    },

    /// Multi-select list (`[a, b]`)
    MultiSelectList(Vec<Expr>),

    /// Multi-select hash (`{name: a, count: b}`)
    MultiSelectHash(Vec<(String, Expr)>),
}
