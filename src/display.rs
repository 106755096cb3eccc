//! Rendering parsed selectors back to selector text.
//!
//! Every tree the parser produces renders to text that re-parses to a
//! structurally identical tree. The renderer is also what accessor errors
//! use to name the sub-path they failed on.

use crate::ast::{Expr, UnaryOp};
use crate::value::Value;
use std::fmt;

/// Render an expression as selector text.
pub fn to_selector(expr: &Expr) -> String {
    expr.to_string()
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

/// Rendering precedence, aligned with the parser's binding powers. Postfix
/// chains and primaries never need parentheses.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Pipe { .. } => 1,
        Expr::Ternary { .. } => 2,
        Expr::Or { .. } => 3,
        Expr::And { .. } => 4,
        Expr::Compare { .. } => 7,
        Expr::Arithmetic { op, .. } => {
            if matches!(
                op,
                crate::ast::ArithmeticOp::Add | crate::ast::ArithmeticOp::Subtract
            ) {
                8
            } else {
                20
            }
        }
        Expr::Not(_) | Expr::UnaryArithmetic { .. } => 45,
        Expr::ExpressionRef(_) => 1,
        _ => 100,
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr, min_bp: u8) -> fmt::Result {
    if precedence(expr) < min_bp {
        write!(f, "(")?;
        write_expr(f, expr, 0)?;
        return write!(f, ")");
    }

    match expr {
        Expr::Current => write!(f, "@"),
        Expr::Root => write!(f, "$"),
        Expr::Literal(value) => write_literal(f, value),
        Expr::Identifier(name) => write_identifier(f, name),
        Expr::VariableRef(name) => write!(f, "${}", name),
        Expr::FieldAccess { object, field } => {
            write_expr(f, object, 100)?;
            write!(f, ".")?;
            write_identifier(f, field)
        }
        Expr::IndexAccess { object, index } => {
            write_expr(f, object, 100)?;
            write!(f, "[{}]", index)
        }
        Expr::IdAccess { object, id } => {
            write_expr(f, object, 100)?;
            write!(f, "['{}']", escape_raw(id))
        }
        Expr::Slice {
            object,
            start,
            end,
            step,
        } => {
            write_expr(f, object, 100)?;
            write_slice(f, start, end, step)
        }
        Expr::Flatten { object } => {
            write_expr(f, object, 100)?;
            write!(f, "[]")
        }
        Expr::Filter { object, condition } => {
            write_expr(f, object, 100)?;
            write!(f, "[?")?;
            write_expr(f, condition, 0)?;
            write!(f, "]")
        }
        Expr::Project { object, projection } => {
            // A filter, slice, or flatten inside a projection node is the
            // projection's own bracket; everything else gets `[*]`.
            match object.as_ref() {
                Expr::Filter { .. } | Expr::Slice { .. } | Expr::Flatten { .. } => {
                    write_expr(f, object, 100)?;
                }
                _ => {
                    write_expr(f, object, 100)?;
                    write!(f, "[*]")?;
                }
            }
            write_projection(f, projection)
        }
        Expr::ObjectProject { object, projection } => {
            write_expr(f, object, 100)?;
            write!(f, ".*")?;
            write_projection(f, projection)
        }
        Expr::Not(operand) => {
            write!(f, "!")?;
            write_expr(f, operand, 45)
        }
        Expr::UnaryArithmetic { op, operand } => {
            match op {
                UnaryOp::Negate => write!(f, "-")?,
                UnaryOp::Plus => write!(f, "+")?,
            }
            write_expr(f, operand, 45)
        }
        Expr::Compare { op, left, right } => {
            write_expr(f, left, 7)?;
            write!(f, " {} ", op.as_str())?;
            write_expr(f, right, 8)
        }
        Expr::Arithmetic { op, left, right } => {
            let bp = precedence(expr);
            write_expr(f, left, bp)?;
            write!(f, " {} ", op.as_str())?;
            write_expr(f, right, bp + 1)
        }
        Expr::And { left, right } => {
            write_expr(f, left, 4)?;
            write!(f, " && ")?;
            write_expr(f, right, 5)
        }
        Expr::Or { left, right } => {
            write_expr(f, left, 3)?;
            write!(f, " || ")?;
            write_expr(f, right, 4)
        }
        Expr::Ternary {
            condition,
            consequent,
            alternate,
        } => {
            write_expr(f, condition, 3)?;
            write!(f, " ? ")?;
            write_expr(f, consequent, 0)?;
            write!(f, " : ")?;
            write_expr(f, alternate, 2)
        }
        Expr::Pipe { left, right } => {
            write_expr(f, left, 1)?;
            write!(f, " | ")?;
            write_expr(f, right, 2)
        }
        Expr::FunctionCall { name, args } => {
            write!(f, "{}(", name)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(f, arg, 0)?;
            }
            write!(f, ")")
        }
        Expr::ExpressionRef(inner) => {
            write!(f, "&")?;
            write_expr(f, inner, 0)
        }
        Expr::Let { bindings, body } => {
            write!(f, "let({{")?;
            for (i, (name, value)) in bindings.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_identifier(f, name)?;
                write!(f, ": ")?;
                write_expr(f, value, 0)?;
            }
            write!(f, "}}, &")?;
            write_expr(f, body, 0)?;
            write!(f, ")")
        }
        Expr::MultiSelectList(expressions) => {
            write!(f, "[")?;
            for (i, e) in expressions.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(f, e, 0)?;
            }
            write!(f, "]")
        }
        Expr::MultiSelectHash(entries) => {
            write!(f, "{{")?;
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_identifier(f, key)?;
                write!(f, ": ")?;
                write_expr(f, value, 0)?;
            }
            write!(f, "}}")
        }
    }
}

/// A projection's continuation is a chain rooted at the implicit current
/// element; it renders as a bare suffix with the current node elided.
fn write_projection(f: &mut fmt::Formatter<'_>, projection: &Option<Box<Expr>>) -> fmt::Result {
    match projection {
        Some(expr) => write_suffix(f, expr),
        None => Ok(()),
    }
}

fn write_suffix(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Current => Ok(()),
        Expr::FieldAccess { object, field } => {
            write_suffix(f, object)?;
            write!(f, ".")?;
            write_identifier(f, field)
        }
        Expr::IndexAccess { object, index } => {
            write_suffix(f, object)?;
            write!(f, "[{}]", index)
        }
        Expr::IdAccess { object, id } => {
            write_suffix(f, object)?;
            write!(f, "['{}']", escape_raw(id))
        }
        Expr::Slice {
            object,
            start,
            end,
            step,
        } => {
            write_suffix(f, object)?;
            write_slice(f, start, end, step)
        }
        Expr::Flatten { object } => {
            write_suffix(f, object)?;
            write!(f, "[]")
        }
        Expr::Filter { object, condition } => {
            write_suffix(f, object)?;
            write!(f, "[?")?;
            write_expr(f, condition, 0)?;
            write!(f, "]")
        }
        Expr::Project { object, projection } => {
            match object.as_ref() {
                Expr::Filter { .. } | Expr::Slice { .. } | Expr::Flatten { .. } => {
                    write_suffix(f, object)?;
                }
                _ => {
                    write_suffix(f, object)?;
                    write!(f, "[*]")?;
                }
            }
            write_projection(f, projection)
        }
        Expr::ObjectProject { object, projection } => {
            write_suffix(f, object)?;
            write!(f, ".*")?;
            write_projection(f, projection)
        }
        Expr::MultiSelectList(_) | Expr::MultiSelectHash(_) => {
            write!(f, ".")?;
            write_expr(f, expr, 0)
        }
        // Hand-built trees can park anything here; the parser never does.
        other => {
            write!(f, " | ")?;
            write_expr(f, other, 2)
        }
    }
}

fn write_slice(
    f: &mut fmt::Formatter<'_>,
    start: &Option<i64>,
    end: &Option<i64>,
    step: &Option<i64>,
) -> fmt::Result {
    write!(f, "[")?;
    if let Some(start) = start {
        write!(f, "{}", start)?;
    }
    write!(f, ":")?;
    if let Some(end) = end {
        write!(f, "{}", end)?;
    }
    if let Some(step) = step {
        write!(f, ":{}", step)?;
    }
    write!(f, "]")
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", escape_raw(s)),
        other => write!(f, "`{}`", other.to_json()),
    }
}

fn write_identifier(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_identifier(name) {
        write!(f, "{}", name)
    } else {
        write!(f, "\"{}\"", escape_quoted(name))
    }
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(name, "true" | "false" | "null")
}

fn escape_raw(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn escape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}
